// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diff-based repair between the local message set and a remote thread.
//!
//! Three-way diff: local candidates since a bound become the **want** set
//! (keyed by idempotency key), remote messages carrying an external
//! reference become the **existing** set. Orphans (existing but not wanted)
//! are deleted remotely; missing entries (wanted but not existing) are
//! created. Running twice with no intervening local changes issues no remote
//! mutations the second time.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use courier_core::identity::{is_group_id, phone_from_id};
use courier_core::types::{IdempotencyKey, MessageFilter, StoredMessage};
use courier_core::CourierError;

use crate::keys::message_key;
use crate::SyncEngine;

/// Cap on local candidates considered per reconcile pass.
const RECONCILE_MESSAGE_LIMIT: usize = 5000;

impl SyncEngine {
    /// Reconcile one chat's remote thread against the local store.
    pub async fn reconcile(
        &self,
        account_id: &str,
        chat_id: &str,
        since: DateTime<Utc>,
    ) -> Result<(), CourierError> {
        if !self.helpdesk.is_configured() {
            return Err(CourierError::Config("helpdesk is not configured".into()));
        }

        let is_group = is_group_id(chat_id);
        let contact_name = phone_from_id(chat_id);

        let (_contact, conversation) = self
            .resolve_thread(&contact_name, chat_id, is_group)
            .await?;

        // Local candidates -> want set.
        let local = self
            .store
            .list_messages(&MessageFilter {
                account_id: account_id.to_string(),
                chat_id: chat_id.to_string(),
                since: Some(since),
                until: None,
                limit: Some(RECONCILE_MESSAGE_LIMIT),
            })
            .await?;

        let mut want: HashMap<String, &StoredMessage> = HashMap::with_capacity(local.len());
        for msg in &local {
            let key = message_key(account_id, chat_id, msg);
            want.insert(key.0, msg);
        }

        // Remote tagged messages -> existing set.
        let remote = self.helpdesk.list_messages(conversation.id).await?;
        let mut existing: HashMap<String, i64> = HashMap::new();
        for message in remote {
            if let Some(reference) = message.external_ref {
                existing.insert(reference, message.id);
            }
        }

        // Orphans: on the remote side but no longer wanted locally.
        let mut deleted = 0usize;
        for (reference, remote_id) in &existing {
            if want.contains_key(reference) {
                continue;
            }
            match self.helpdesk.delete_message(conversation.id, *remote_id).await {
                Ok(()) => {
                    deleted += 1;
                    info!(remote_id, "deleted orphaned remote message");
                }
                Err(e) => {
                    warn!(remote_id, error = %e, "failed to delete orphaned message");
                }
            }
        }

        // Missing: wanted locally but absent remotely. Creation is gated on
        // the existing set, never re-derived mid-pass.
        let mut created = 0usize;
        for (reference, msg) in &want {
            if existing.contains_key(reference) {
                continue;
            }
            let key = IdempotencyKey(reference.clone());
            match self
                .export_message(conversation.id, msg, is_group, &key, true)
                .await
            {
                Ok(remote_id) => {
                    created += 1;
                    if let Err(e) = self
                        .store
                        .mark_key_exported(account_id, chat_id, &key, remote_id)
                        .await
                    {
                        warn!(error = %e, "failed to record reconciled message");
                    }
                }
                Err(e) => {
                    warn!(message_id = msg.id.as_str(), error = %e,
                        "failed to create missing remote message");
                }
            }
        }

        info!(
            account_id,
            chat_id,
            wanted = want.len(),
            existing = existing.len(),
            created,
            deleted,
            "reconcile pass complete"
        );
        Ok(())
    }
}
