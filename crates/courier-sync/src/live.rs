// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time bidirectional mirroring with echo suppression.
//!
//! [`LiveBridge::forward_local_message`] pushes platform events into the
//! helpdesk thread; [`LiveBridge::handle_remote_message`] pushes agent
//! replies back into the platform. Both directions reuse the engine's
//! key-resolution and idempotency primitives, so live traffic, bulk import,
//! and reconciliation share one dedup namespace.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use courier_core::identity::{is_group_id, phone_from_id};
use courier_core::types::{
    LocalEventKind, LocalMessageEvent, MessageDirection, RemoteEvent,
};
use courier_core::CourierError;

use crate::keys::message_key;
use crate::SyncEngine;

/// Outcome of pushing one event through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    Forwarded,
    Skipped(SkipReason),
}

/// Why an event was not forwarded. Skips are normal operation, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Seen this platform message id within the dedup window.
    Duplicate,
    /// Event type never reaches a human-facing thread (reaction, poll
    /// update, protocol chatter, ephemeral).
    Unsupported,
    /// The idempotency key is already recorded as exported.
    AlreadyExported,
    /// Not a freshly created, agent-authored, public message.
    NotAMessage,
    /// Created by this engine; forwarding it back would loop.
    Echo,
    /// No destination could be derived from the remote contact.
    NoDestination,
    /// Nothing to send (no text, no attachments).
    Empty,
}

/// Bridges live events between the messaging platform and the helpdesk.
pub struct LiveBridge {
    engine: SyncEngine,
    /// Recently forwarded platform message ids, for immediate-loop dedup.
    recent: Mutex<HashMap<String, Instant>>,
    recent_ttl: Duration,
    /// Cached group display names.
    group_names: Mutex<HashMap<String, (String, Instant)>>,
    group_ttl: Duration,
}

impl LiveBridge {
    pub fn new(engine: SyncEngine) -> Self {
        let recent_ttl = Duration::from_secs(engine.config.forward_dedup_ttl_secs);
        let group_ttl = Duration::from_secs(engine.config.group_cache_ttl_secs);
        Self {
            engine,
            recent: Mutex::new(HashMap::new()),
            recent_ttl,
            group_names: Mutex::new(HashMap::new()),
            group_ttl,
        }
    }

    /// Forward a local platform message into its helpdesk conversation.
    pub async fn forward_local_message(
        &self,
        event: &LocalMessageEvent,
    ) -> Result<ForwardOutcome, CourierError> {
        if !self.engine.helpdesk.is_configured() {
            return Err(CourierError::Config("helpdesk is not configured".into()));
        }

        let msg = &event.message;

        if self.is_duplicate_forward(&msg.id).await {
            debug!(message_id = msg.id.as_str(), "duplicate forward, skipping");
            return Ok(ForwardOutcome::Skipped(SkipReason::Duplicate));
        }

        if matches!(
            event.kind,
            LocalEventKind::Reaction
                | LocalEventKind::PollUpdate
                | LocalEventKind::Protocol
                | LocalEventKind::Ephemeral
        ) {
            debug!(kind = %event.kind, "unsupported event kind, skipping");
            return Ok(ForwardOutcome::Skipped(SkipReason::Unsupported));
        }

        let is_group = is_group_id(&msg.chat_id);

        let mut content = msg.content.clone();
        if content.is_empty()
            && let Some(media) = &msg.media
        {
            content = format!("[{}]", media.kind);
        }
        if content.is_empty() && msg.media.is_none() {
            return Ok(ForwardOutcome::Skipped(SkipReason::Empty));
        }
        if event.edited {
            content = format!("\u{270f}\u{fe0f} Edited: {content}");
        }
        if is_group && !msg.is_from_me && !event.sender_name.is_empty() {
            content = format!("{}: {content}", event.sender_name);
        }

        let contact_name = if is_group {
            self.group_display_name(&msg.chat_id).await
        } else if msg.is_from_me {
            phone_from_id(&msg.chat_id)
        } else if !event.sender_name.is_empty() {
            event.sender_name.clone()
        } else {
            phone_from_id(&msg.sender)
        };

        let (_contact, conversation) = self
            .engine
            .resolve_thread(&contact_name, &msg.chat_id, is_group)
            .await?;

        let key = message_key(&msg.account_id, &msg.chat_id, msg);
        match self
            .engine
            .store
            .is_key_exported(&msg.account_id, &msg.chat_id, &key)
            .await
        {
            Ok(true) => {
                debug!(message_id = msg.id.as_str(), "already exported, skipping");
                return Ok(ForwardOutcome::Skipped(SkipReason::AlreadyExported));
            }
            Ok(false) => {}
            // Fail open: a lost duplicate beats a lost message.
            Err(e) => warn!(error = %e, "export check failed, forwarding anyway"),
        }

        let mut attachments = Vec::new();
        if self.engine.config.include_media
            && let Some(media) = &msg.media
        {
            match self.engine.prepare_attachment(media).await {
                Ok(attachment) => attachments.push(attachment),
                Err(e) => {
                    debug!(error = %e, "media unavailable, degrading to text");
                    content.push_str(" [media unavailable]");
                }
            }
        }

        let direction = if msg.is_from_me {
            MessageDirection::Outgoing
        } else {
            MessageDirection::Incoming
        };

        let remote_id = self
            .engine
            .helpdesk
            .create_message(&courier_core::types::OutboundRemoteMessage {
                conversation_id: conversation.id,
                content,
                direction,
                attachments,
                external_ref: Some(key.clone()),
            })
            .await?;

        self.engine.echo.mark_sent(remote_id).await;
        if let Err(e) = self
            .engine
            .store
            .mark_key_exported(&msg.account_id, &msg.chat_id, &key, remote_id)
            .await
        {
            warn!(error = %e, "failed to record forwarded message");
        }

        // Keep the sender's avatar fresh, off the hot path.
        if !msg.is_from_me && !is_group && !msg.sender.is_empty() {
            self.engine
                .spawn_avatar_sync(msg.sender.clone(), event.sender_name.clone())
                .await;
        }

        info!(
            message_id = msg.id.as_str(),
            remote_id, "message forwarded to helpdesk"
        );
        Ok(ForwardOutcome::Forwarded)
    }

    /// Push a helpdesk-originated event back into the messaging platform.
    ///
    /// Only freshly created, agent-authored, public messages are mirrored.
    /// The echo check is two-stage: the in-memory guard first, then the
    /// persisted exported-message record. A failed persisted lookup fails
    /// open and forwards.
    pub async fn handle_remote_message(
        &self,
        event: &RemoteEvent,
    ) -> Result<ForwardOutcome, CourierError> {
        if event.event != "message_created" {
            return Ok(ForwardOutcome::Skipped(SkipReason::NotAMessage));
        }
        if event.direction != Some(MessageDirection::Outgoing) {
            return Ok(ForwardOutcome::Skipped(SkipReason::NotAMessage));
        }
        if event.private {
            return Ok(ForwardOutcome::Skipped(SkipReason::NotAMessage));
        }

        if event.message_id != 0 {
            if self.engine.echo.was_sent_by_us(event.message_id).await {
                debug!(
                    remote_id = event.message_id,
                    "echo suppressed (memory guard)"
                );
                return Ok(ForwardOutcome::Skipped(SkipReason::Echo));
            }
            match self
                .engine
                .store
                .is_remote_message_ours(event.message_id)
                .await
            {
                Ok(true) => {
                    debug!(
                        remote_id = event.message_id,
                        "echo suppressed (persisted record)"
                    );
                    return Ok(ForwardOutcome::Skipped(SkipReason::Echo));
                }
                Ok(false) => {}
                // Fail open: a duplicate delivery beats silently dropping an
                // agent's reply.
                Err(e) => warn!(error = %e, "echo lookup failed, forwarding anyway"),
            }
        }

        let contact = &event.contact;
        let raw_destination = contact
            .attributes
            .chat_id
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| contact.identifier.clone().filter(|s| !s.is_empty()))
            .or_else(|| contact.phone_number.clone().filter(|s| !s.is_empty()));

        let Some(raw_destination) = raw_destination else {
            warn!(contact_id = contact.id, "no destination for remote message");
            return Ok(ForwardOutcome::Skipped(SkipReason::NoDestination));
        };

        let is_group = is_group_id(&raw_destination);
        let destination = if is_group {
            raw_destination.clone()
        } else {
            phone_from_id(&raw_destination)
        };

        // Agent replied; refresh the contact's avatar in the background.
        if raw_destination.contains('@') {
            self.engine
                .spawn_avatar_sync(raw_destination.clone(), contact.name.clone())
                .await;
        }

        if !event.attachments.is_empty() {
            let mut sent = 0usize;
            for attachment in &event.attachments {
                match self
                    .engine
                    .messenger
                    .send_attachment(&destination, attachment, &event.content)
                    .await
                {
                    Ok(()) => sent += 1,
                    Err(e) => {
                        error!(attachment_id = attachment.id, error = %e,
                            "failed to deliver attachment");
                    }
                }
            }
            if sent == 0 {
                return Err(CourierError::messenger(
                    "all attachments failed to deliver",
                ));
            }
            info!(destination = destination.as_str(), sent, "attachments delivered");
            return Ok(ForwardOutcome::Forwarded);
        }

        if event.content.is_empty() {
            return Ok(ForwardOutcome::Skipped(SkipReason::Empty));
        }

        let text = sanitize_text(&event.content);
        self.engine.messenger.send_text(&destination, &text).await?;
        info!(destination = destination.as_str(), "reply delivered");
        Ok(ForwardOutcome::Forwarded)
    }

    /// Check-and-record the platform message id. Entries older than the TTL
    /// are evicted on each call.
    async fn is_duplicate_forward(&self, message_id: &str) -> bool {
        if message_id.is_empty() {
            return false;
        }
        let now = Instant::now();
        let mut recent = self.recent.lock().await;
        recent.retain(|_, seen_at| now.duration_since(*seen_at) <= self.recent_ttl);

        if recent.contains_key(message_id) {
            return true;
        }
        recent.insert(message_id.to_string(), now);
        false
    }

    async fn group_display_name(&self, group_id: &str) -> String {
        {
            let cache = self.group_names.lock().await;
            if let Some((name, cached_at)) = cache.get(group_id)
                && cached_at.elapsed() <= self.group_ttl
            {
                return name.clone();
            }
        }

        match self.engine.messenger.group_name(group_id).await {
            Ok(Some(name)) if !name.is_empty() => {
                self.group_names
                    .lock()
                    .await
                    .insert(group_id.to_string(), (name.clone(), Instant::now()));
                name
            }
            Ok(_) => format!("Group: {}", phone_from_id(group_id)),
            Err(e) => {
                warn!(group_id, error = %e, "failed to fetch group name");
                format!("Group: {}", phone_from_id(group_id))
            }
        }
    }
}

static MANY_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline regex"));

/// Normalize agent-authored text for the platform: CRLF to LF, trimmed,
/// runs of blank lines collapsed.
pub(crate) fn sanitize_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = text.trim();
    MANY_NEWLINES.replace_all(text, "\n\n").into_owned()
}
