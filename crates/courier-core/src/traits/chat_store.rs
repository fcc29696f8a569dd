// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local message store interface.
//!
//! Chats and messages are read-only to the engine; the only state it mutates
//! here is its own export bookkeeping (watermarks and exported-message
//! records).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CourierError;
use crate::types::{Chat, IdempotencyKey, MessageFilter, StoredMessage};

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// All chats known for the account.
    async fn list_chats(&self, account_id: &str) -> Result<Vec<Chat>, CourierError>;

    /// Messages matching the filter, ascending by timestamp.
    async fn list_messages(
        &self,
        filter: &MessageFilter,
    ) -> Result<Vec<StoredMessage>, CourierError>;

    /// Timestamp of the latest message confirmed exported for this chat.
    async fn export_watermark(
        &self,
        account_id: &str,
        chat_id: &str,
    ) -> Result<Option<DateTime<Utc>>, CourierError>;

    /// Advance the watermark. Only called after the message at `exported_at`
    /// was durably confirmed on the remote side.
    async fn set_export_watermark(
        &self,
        account_id: &str,
        chat_id: &str,
        exported_at: DateTime<Utc>,
    ) -> Result<(), CourierError>;

    /// Has a message with this idempotency key already been exported?
    async fn is_key_exported(
        &self,
        account_id: &str,
        chat_id: &str,
        key: &IdempotencyKey,
    ) -> Result<bool, CourierError>;

    /// Record key -> remote message id. Insert-if-absent: concurrent callers
    /// racing on the same key must both succeed, with the store keeping the
    /// first row.
    async fn mark_key_exported(
        &self,
        account_id: &str,
        chat_id: &str,
        key: &IdempotencyKey,
        remote_message_id: i64,
    ) -> Result<(), CourierError>;

    /// Reverse index: was this remote message created by us? Authoritative
    /// half of echo suppression; survives restarts.
    async fn is_remote_message_ours(&self, remote_message_id: i64)
    -> Result<bool, CourierError>;
}
