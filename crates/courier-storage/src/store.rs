// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ChatStore trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use courier_config::StorageConfig;
use courier_core::types::{Chat, IdempotencyKey, MessageFilter, StoredMessage};
use courier_core::{ChatStore, CourierError};

use crate::database::Database;
use crate::queries;

/// SQLite-backed chat store.
///
/// Implements the read-only [`ChatStore`] interface the sync engine consumes.
/// Ingestion helpers ([`SqliteChatStore::upsert_chat`],
/// [`SqliteChatStore::insert_message`]) are inherent methods for the platform
/// event handler and tests; the engine never writes chats or messages.
pub struct SqliteChatStore {
    db: Database,
}

impl SqliteChatStore {
    /// Open the store at the configured path, running migrations as needed.
    pub async fn open(config: &StorageConfig) -> Result<Self, CourierError> {
        let db = Database::open(&config.database_path).await?;
        debug!(path = %config.database_path, "chat store opened");
        Ok(Self { db })
    }

    /// Open an ephemeral store at an explicit path. Test convenience.
    pub async fn open_at(path: &str) -> Result<Self, CourierError> {
        let db = Database::open(path).await?;
        Ok(Self { db })
    }

    /// Checkpoint and release the database.
    pub async fn close(&self) -> Result<(), CourierError> {
        self.db.close().await
    }

    /// Insert or refresh a chat (ingestion path).
    pub async fn upsert_chat(&self, chat: &Chat) -> Result<(), CourierError> {
        queries::chats::upsert_chat(&self.db, chat).await
    }

    /// Insert a message (ingestion path).
    pub async fn insert_message(&self, message: &StoredMessage) -> Result<(), CourierError> {
        queries::messages::insert_message(&self.db, message).await
    }
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn list_chats(&self, account_id: &str) -> Result<Vec<Chat>, CourierError> {
        queries::chats::list_chats(&self.db, account_id).await
    }

    async fn list_messages(
        &self,
        filter: &MessageFilter,
    ) -> Result<Vec<StoredMessage>, CourierError> {
        queries::messages::list_messages(&self.db, filter).await
    }

    async fn export_watermark(
        &self,
        account_id: &str,
        chat_id: &str,
    ) -> Result<Option<DateTime<Utc>>, CourierError> {
        queries::export::get_watermark(&self.db, account_id, chat_id).await
    }

    async fn set_export_watermark(
        &self,
        account_id: &str,
        chat_id: &str,
        exported_at: DateTime<Utc>,
    ) -> Result<(), CourierError> {
        queries::export::set_watermark(&self.db, account_id, chat_id, exported_at).await
    }

    async fn is_key_exported(
        &self,
        account_id: &str,
        chat_id: &str,
        key: &IdempotencyKey,
    ) -> Result<bool, CourierError> {
        queries::export::is_key_exported(&self.db, account_id, chat_id, key).await
    }

    async fn mark_key_exported(
        &self,
        account_id: &str,
        chat_id: &str,
        key: &IdempotencyKey,
        remote_message_id: i64,
    ) -> Result<(), CourierError> {
        queries::export::mark_key_exported(&self.db, account_id, chat_id, key, remote_message_id)
            .await
    }

    async fn is_remote_message_ours(
        &self,
        remote_message_id: i64,
    ) -> Result<bool, CourierError> {
        queries::export::is_remote_message_ours(&self.db, remote_message_id).await
    }
}
