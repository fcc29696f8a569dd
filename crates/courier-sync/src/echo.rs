// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory echo-suppression guard.
//!
//! Remembers the remote ids of messages this process created so the webhook
//! path can tell its own effects apart from agent-authored messages. This is
//! the fast path only: the persisted exported-message record is authoritative
//! and survives restarts. The TTL bounds memory, not correctness.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Default lifetime of guard entries.
pub const DEFAULT_ECHO_TTL: Duration = Duration::from_secs(300);

pub struct EchoGuard {
    ttl: Duration,
    entries: Mutex<HashMap<i64, Instant>>,
}

impl EchoGuard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record a remote message id we just created. Zero ids (the platform's
    /// "no id" sentinel) are ignored.
    pub async fn mark_sent(&self, remote_message_id: i64) {
        if remote_message_id == 0 {
            return;
        }
        self.entries
            .lock()
            .await
            .insert(remote_message_id, Instant::now());
    }

    /// Fast-path echo check. Expired entries are evicted lazily here.
    pub async fn was_sent_by_us(&self, remote_message_id: i64) -> bool {
        if remote_message_id == 0 {
            return false;
        }
        let mut entries = self.entries.lock().await;
        match entries.get(&remote_message_id) {
            Some(stored_at) if stored_at.elapsed() <= self.ttl => true,
            Some(_) => {
                entries.remove(&remote_message_id);
                false
            }
            None => false,
        }
    }

    /// Remove all expired entries, returning how many were dropped.
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, stored_at| stored_at.elapsed() <= self.ttl);
        before - entries.len()
    }

    /// Current entry count (includes not-yet-swept expired entries).
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Start the background eviction sweep, running until the token cancels.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let guard = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let dropped = guard.sweep().await;
                        if dropped > 0 {
                            debug!(dropped, "echo guard sweep evicted entries");
                        } else {
                            trace!("echo guard sweep found nothing to evict");
                        }
                    }
                    _ = cancel.cancelled() => {
                        debug!("echo guard sweeper stopping");
                        break;
                    }
                }
            }
        })
    }
}
