// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock external transcoder.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use courier_core::{CourierError, Transcoder};

/// Fake encoder: "converts" by rewriting the input next to itself with an
/// `.mp3` extension and a recognizable prefix.
pub struct MockTranscoder {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockTranscoder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    async fn transcode(&self, input: &Path) -> Result<PathBuf, CourierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CourierError::Media("injected transcode failure".into()));
        }

        let data = tokio::fs::read(input)
            .await
            .map_err(|e| CourierError::Media(format!("failed to read input: {e}")))?;
        let output = input.with_extension("mp3");
        let mut converted = b"transcoded:".to_vec();
        converted.extend_from_slice(&data);
        tokio::fs::write(&output, converted)
            .await
            .map_err(|e| CourierError::Media(format!("failed to write output: {e}")))?;
        Ok(output)
    }
}
