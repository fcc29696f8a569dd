// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging platform client interface.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::{MediaRef, RemoteAttachment};

#[async_trait]
pub trait MessengerClient: Send + Sync {
    /// URL of the contact's current profile picture, if one is set.
    async fn profile_picture_url(
        &self,
        identifier: &str,
    ) -> Result<Option<String>, CourierError>;

    /// Download and decrypt the media behind a descriptor.
    async fn download_media(&self, media: &MediaRef) -> Result<Vec<u8>, CourierError>;

    /// Display name of a group chat, if resolvable.
    async fn group_name(&self, group_id: &str) -> Result<Option<String>, CourierError>;

    /// Send a plain text message to a chat or phone destination.
    async fn send_text(&self, destination: &str, text: &str) -> Result<(), CourierError>;

    /// Send a helpdesk attachment (referenced by URL) into the platform.
    async fn send_attachment(
        &self,
        destination: &str,
        attachment: &RemoteAttachment,
        caption: &str,
    ) -> Result<(), CourierError>;
}
