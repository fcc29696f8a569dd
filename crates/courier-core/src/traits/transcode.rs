// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External transcoder interface.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::CourierError;

/// Converts media files into helpdesk-friendly formats via an external
/// encoder process. Best effort: callers fall back to uploading the original
/// file when transcoding fails.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, input: &Path) -> Result<PathBuf, CourierError>;
}
