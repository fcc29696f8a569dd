// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory chat store with failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use courier_core::types::{Chat, IdempotencyKey, MessageFilter, StoredMessage};
use courier_core::{ChatStore, CourierError};

/// In-memory [`ChatStore`].
///
/// Chats and messages are seeded through `add_chat`/`add_message`; export
/// bookkeeping behaves like the SQLite store, including insert-if-absent on
/// exported keys. `fail_export_lookups` makes the dedup lookups return
/// storage errors, for exercising the fail-open paths.
pub struct MemoryChatStore {
    chats: Mutex<Vec<Chat>>,
    messages: Mutex<Vec<StoredMessage>>,
    watermarks: Mutex<HashMap<(String, String), DateTime<Utc>>>,
    exported: Mutex<HashMap<(String, String, String), i64>>,
    fail_export_lookups: AtomicBool,
    fail_chat_listing: AtomicBool,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self {
            chats: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            watermarks: Mutex::new(HashMap::new()),
            exported: Mutex::new(HashMap::new()),
            fail_export_lookups: AtomicBool::new(false),
            fail_chat_listing: AtomicBool::new(false),
        }
    }

    pub async fn add_chat(&self, chat: Chat) {
        self.chats.lock().await.push(chat);
    }

    pub async fn add_message(&self, message: StoredMessage) {
        self.messages.lock().await.push(message);
    }

    pub async fn remove_message(&self, message_id: &str) {
        self.messages.lock().await.retain(|m| m.id != message_id);
    }

    /// Number of recorded exported-message rows.
    pub async fn exported_count(&self) -> usize {
        self.exported.lock().await.len()
    }

    /// Make `is_key_exported` / `is_remote_message_ours` fail with storage
    /// errors.
    pub fn fail_export_lookups(&self, fail: bool) {
        self.fail_export_lookups.store(fail, Ordering::SeqCst);
    }

    /// Make `list_chats` fail with a storage error.
    pub fn fail_chat_listing(&self, fail: bool) {
        self.fail_chat_listing.store(fail, Ordering::SeqCst);
    }

    fn lookup_error() -> CourierError {
        CourierError::storage(std::io::Error::other("injected storage failure"))
    }
}

impl Default for MemoryChatStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn list_chats(&self, account_id: &str) -> Result<Vec<Chat>, CourierError> {
        if self.fail_chat_listing.load(Ordering::SeqCst) {
            return Err(Self::lookup_error());
        }
        Ok(self
            .chats
            .lock()
            .await
            .iter()
            .filter(|c| c.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn list_messages(
        &self,
        filter: &MessageFilter,
    ) -> Result<Vec<StoredMessage>, CourierError> {
        let mut matching: Vec<StoredMessage> = self
            .messages
            .lock()
            .await
            .iter()
            .filter(|m| m.account_id == filter.account_id && m.chat_id == filter.chat_id)
            .filter(|m| filter.since.is_none_or(|since| m.timestamp > since))
            .filter(|m| filter.until.is_none_or(|until| m.timestamp <= until))
            .cloned()
            .collect();
        matching.sort_by_key(|m| m.timestamp);
        if let Some(limit) = filter.limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }

    async fn export_watermark(
        &self,
        account_id: &str,
        chat_id: &str,
    ) -> Result<Option<DateTime<Utc>>, CourierError> {
        Ok(self
            .watermarks
            .lock()
            .await
            .get(&(account_id.to_string(), chat_id.to_string()))
            .copied())
    }

    async fn set_export_watermark(
        &self,
        account_id: &str,
        chat_id: &str,
        exported_at: DateTime<Utc>,
    ) -> Result<(), CourierError> {
        self.watermarks
            .lock()
            .await
            .insert((account_id.to_string(), chat_id.to_string()), exported_at);
        Ok(())
    }

    async fn is_key_exported(
        &self,
        account_id: &str,
        chat_id: &str,
        key: &IdempotencyKey,
    ) -> Result<bool, CourierError> {
        if self.fail_export_lookups.load(Ordering::SeqCst) {
            return Err(Self::lookup_error());
        }
        Ok(self.exported.lock().await.contains_key(&(
            account_id.to_string(),
            chat_id.to_string(),
            key.as_str().to_string(),
        )))
    }

    async fn mark_key_exported(
        &self,
        account_id: &str,
        chat_id: &str,
        key: &IdempotencyKey,
        remote_message_id: i64,
    ) -> Result<(), CourierError> {
        // Insert-if-absent: the first mapping wins, as with the SQLite
        // uniqueness constraint.
        self.exported
            .lock()
            .await
            .entry((
                account_id.to_string(),
                chat_id.to_string(),
                key.as_str().to_string(),
            ))
            .or_insert(remote_message_id);
        Ok(())
    }

    async fn is_remote_message_ours(
        &self,
        remote_message_id: i64,
    ) -> Result<bool, CourierError> {
        if self.fail_export_lookups.load(Ordering::SeqCst) {
            return Err(Self::lookup_error());
        }
        Ok(self
            .exported
            .lock()
            .await
            .values()
            .any(|id| *id == remote_message_id))
    }
}
