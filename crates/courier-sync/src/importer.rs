// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Time-windowed, resumable bulk export of past messages.
//!
//! A run walks every chat of an account, exporting messages newer than
//! `max(now - days_limit, stored watermark)` in ascending timestamp order.
//! Per-chat and per-message failures are counted and skipped; only
//! whole-job failures (cannot enumerate chats, cancellation) abort the run.
//! The watermark advances to the last *successfully* exported message, so a
//! retry re-attempts failures without re-sending successes.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use courier_config::SyncConfig;
use courier_core::identity::{is_group_id, phone_from_id};
use courier_core::types::{
    Chat, IdempotencyKey, MessageDirection, MessageFilter, OutboundRemoteMessage, StoredMessage,
};
use courier_core::CourierError;

use crate::keys::message_key;
use crate::progress::ProgressHandle;
use crate::{SyncEngine, SyncError, SyncProgress};

/// Per-run options for a history sync.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub days_limit: i64,
    pub include_media: bool,
    pub include_groups: bool,
    pub max_messages_per_chat: usize,
    pub batch_size: usize,
    pub batch_delay: std::time::Duration,
}

impl SyncOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            days_limit: config.days_limit,
            include_media: config.include_media,
            include_groups: config.include_groups,
            max_messages_per_chat: config.max_messages_per_chat,
            batch_size: config.batch_size,
            batch_delay: std::time::Duration::from_millis(config.batch_delay_ms),
        }
    }
}

/// Render a stored message as the helpdesk text body: `[YYYY-MM-DD HH:MM]`
/// prefix, a sender label for group messages from others, and a media-kind
/// placeholder when there is no text.
pub(crate) fn export_content(msg: &StoredMessage, is_group: bool) -> String {
    let mut content = msg.content.clone();
    if content.is_empty()
        && let Some(media) = &msg.media
    {
        content = format!("[{}]", media.kind);
    }

    let time_prefix = msg.timestamp.format("%Y-%m-%d %H:%M");
    if is_group && !msg.is_from_me && !msg.sender.is_empty() {
        let sender = phone_from_id(&msg.sender);
        format!("[{time_prefix}] {sender}: {content}")
    } else {
        format!("[{time_prefix}] {content}")
    }
}

impl SyncEngine {
    /// Run a full history sync for an account.
    ///
    /// Exactly one run per account may be active; a second start fails with
    /// [`SyncError::AlreadyRunning`] carrying the live run's snapshot. The
    /// cancellation token is observed before each chat and each message.
    pub async fn sync_history(
        &self,
        account_id: &str,
        opts: SyncOptions,
        cancel: CancellationToken,
    ) -> Result<SyncProgress, SyncError> {
        if !self.helpdesk.is_configured() {
            return Err(CourierError::Config("helpdesk is not configured".into()).into());
        }

        let handle = self
            .progress
            .begin(account_id)
            .await
            .map_err(SyncError::AlreadyRunning)?;

        info!(
            account_id,
            days = opts.days_limit,
            media = opts.include_media,
            groups = opts.include_groups,
            "starting history sync"
        );

        let chats = match self.store.list_chats(account_id).await {
            Ok(chats) => chats,
            Err(e) => {
                handle.fail(&e.to_string()).await;
                return Err(e.into());
            }
        };
        handle.set_total_chats(chats.len()).await;
        info!(count = chats.len(), "found chats to sync");

        let since = Utc::now() - chrono::Duration::days(opts.days_limit);

        for chat in &chats {
            if cancel.is_cancelled() {
                let err = CourierError::Cancelled("history sync cancelled".into());
                handle.fail(&err.to_string()).await;
                return Err(err.into());
            }

            handle.set_current_chat(&chat.id).await;

            match self
                .sync_chat(account_id, chat, since, &opts, &handle, &cancel)
                .await
            {
                Ok(()) => handle.incr_synced_chats().await,
                Err(CourierError::Cancelled(reason)) => {
                    let err = CourierError::Cancelled(reason);
                    handle.fail(&err.to_string()).await;
                    return Err(err.into());
                }
                Err(e) => {
                    error!(chat_id = chat.id.as_str(), error = %e, "failed to sync chat");
                    handle.incr_failed_chats().await;
                }
            }
        }

        handle.complete().await;
        let progress = handle.snapshot().await;
        info!(
            account_id,
            synced_chats = progress.synced_chats,
            failed_chats = progress.failed_chats,
            synced_messages = progress.synced_messages,
            failed_messages = progress.failed_messages,
            "history sync completed"
        );
        Ok(progress)
    }

    /// Sync a single chat's messages.
    async fn sync_chat(
        &self,
        account_id: &str,
        chat: &Chat,
        since: DateTime<Utc>,
        opts: &SyncOptions,
        handle: &ProgressHandle,
        cancel: &CancellationToken,
    ) -> Result<(), CourierError> {
        let is_group = is_group_id(&chat.id);
        if is_group && !opts.include_groups {
            return Ok(());
        }

        let contact_name = if chat.name.is_empty() {
            phone_from_id(&chat.id)
        } else {
            chat.name.clone()
        };

        let (_contact, conversation) = self
            .resolve_thread(&contact_name, &chat.id, is_group)
            .await?;

        let mut start = since;
        if let Some(watermark) = self.store.export_watermark(account_id, &chat.id).await?
            && watermark > start
        {
            start = watermark;
        }

        let mut messages = self
            .store
            .list_messages(&MessageFilter {
                account_id: account_id.to_string(),
                chat_id: chat.id.clone(),
                since: Some(start),
                until: None,
                limit: Some(opts.max_messages_per_chat),
            })
            .await?;
        if messages.is_empty() {
            return Ok(());
        }

        handle.add_total_messages(messages.len()).await;
        messages.sort_by_key(|m| m.timestamp);

        let mut last_exported: Option<DateTime<Utc>> = None;
        for (i, msg) in messages.iter().enumerate() {
            if cancel.is_cancelled() {
                // Watermark for this chat is not advanced; the exported-message
                // records already protect completed messages on resume.
                self.persist_watermark(account_id, &chat.id, last_exported)
                    .await;
                return Err(CourierError::Cancelled("history sync cancelled".into()));
            }

            let key = message_key(account_id, &chat.id, msg);

            let exported = match self.store.is_key_exported(account_id, &chat.id, &key).await {
                Ok(exported) => exported,
                Err(e) => {
                    warn!(message_id = msg.id.as_str(), error = %e, "export check failed");
                    handle.incr_failed_messages().await;
                    continue;
                }
            };
            if exported {
                debug!(message_id = msg.id.as_str(), "already exported, skipping");
                continue;
            }

            match self
                .export_message(conversation.id, msg, is_group, &key, opts.include_media)
                .await
            {
                Ok(remote_id) => {
                    if let Err(e) = self
                        .store
                        .mark_key_exported(account_id, &chat.id, &key, remote_id)
                        .await
                    {
                        warn!(error = %e, "failed to record exported message");
                    }
                    handle.incr_synced_messages().await;
                    last_exported = Some(msg.timestamp);
                }
                Err(e) => {
                    warn!(message_id = msg.id.as_str(), error = %e, "failed to export message");
                    handle.incr_failed_messages().await;
                }
            }

            if i > 0 && opts.batch_size > 0 && i % opts.batch_size == 0 {
                tokio::time::sleep(opts.batch_delay).await;
            }
        }

        self.persist_watermark(account_id, &chat.id, last_exported)
            .await;

        // Refresh the contact's avatar off the sync path.
        self.spawn_avatar_sync(chat.id.clone(), contact_name).await;

        Ok(())
    }

    async fn persist_watermark(
        &self,
        account_id: &str,
        chat_id: &str,
        last_exported: Option<DateTime<Utc>>,
    ) {
        if let Some(at) = last_exported
            && let Err(e) = self.store.set_export_watermark(account_id, chat_id, at).await
        {
            warn!(chat_id, error = %e, "failed to persist export watermark");
        }
    }

    /// Export one message: build the text body, attach media best-effort,
    /// create the remote message tagged with the idempotency key, and mark
    /// the echo guard.
    pub(crate) async fn export_message(
        &self,
        conversation_id: i64,
        msg: &StoredMessage,
        is_group: bool,
        key: &IdempotencyKey,
        include_media: bool,
    ) -> Result<i64, CourierError> {
        let direction = if msg.is_from_me {
            MessageDirection::Outgoing
        } else {
            MessageDirection::Incoming
        };

        let mut content = export_content(msg, is_group);

        let mut attachments = Vec::new();
        if include_media
            && let Some(media) = &msg.media
        {
            match self.prepare_attachment(media).await {
                Ok(attachment) => attachments.push(attachment),
                Err(e) => {
                    debug!(message_id = msg.id.as_str(), error = %e,
                        "media unavailable, degrading to text");
                    content.push_str(" [media unavailable]");
                }
            }
        }

        let remote_id = self
            .helpdesk
            .create_message(&OutboundRemoteMessage {
                conversation_id,
                content,
                direction,
                attachments,
                external_ref: Some(key.clone()),
            })
            .await?;

        self.echo.mark_sent(remote_id).await;
        Ok(remote_id)
    }
}
