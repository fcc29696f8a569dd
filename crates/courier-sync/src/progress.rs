// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-account sync progress tracking.
//!
//! The tracker owns the only globally shared mutable map in the engine. The
//! map lock covers map access only; per-account cells carry their own mutex
//! so counter updates during a run never hold the map lock. Reads hand out
//! deep copies, never live references.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumString};
use tokio::sync::{Mutex, RwLock};

/// Lifecycle state of a history sync run.
///
/// Idle is represented by the absence of an entry. Transitions are monotonic
/// within a run: Running -> Completed or Running -> Failed. Terminal states
/// may be replaced by a fresh Running entry on the next start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Running,
    Completed,
    Failed,
}

/// Snapshot of a sync run's progress. Always a deep copy; mutating it does
/// not affect the tracked state.
#[derive(Debug, Clone, Serialize)]
pub struct SyncProgress {
    pub account_id: String,
    pub state: SyncState,
    pub total_chats: usize,
    pub synced_chats: usize,
    pub failed_chats: usize,
    pub total_messages: usize,
    pub synced_messages: usize,
    pub failed_messages: usize,
    pub current_chat: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl SyncProgress {
    fn new(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            state: SyncState::Running,
            total_chats: 0,
            synced_chats: 0,
            failed_chats: 0,
            total_messages: 0,
            synced_messages: 0,
            failed_messages: 0,
            current_chat: None,
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == SyncState::Running
    }
}

/// Tracker of account -> progress. Injected service, one per engine; tests
/// instantiate independent instances.
pub struct ProgressTracker {
    inner: RwLock<HashMap<String, Arc<Mutex<SyncProgress>>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Atomic check-and-set start. Fails with a snapshot of the existing run
    /// when one is still Running; terminal entries are replaced.
    pub async fn begin(&self, account_id: &str) -> Result<ProgressHandle, Box<SyncProgress>> {
        let mut map = self.inner.write().await;
        if let Some(cell) = map.get(account_id) {
            let existing = cell.lock().await;
            if existing.is_running() {
                return Err(Box::new(existing.clone()));
            }
        }
        let cell = Arc::new(Mutex::new(SyncProgress::new(account_id)));
        map.insert(account_id.to_string(), Arc::clone(&cell));
        Ok(ProgressHandle { cell })
    }

    /// Deep-copied snapshot of the account's progress, if any run was started.
    pub async fn get(&self, account_id: &str) -> Option<SyncProgress> {
        let cell = self.inner.read().await.get(account_id).cloned();
        match cell {
            Some(cell) => Some(cell.lock().await.clone()),
            None => None,
        }
    }

    pub async fn is_running(&self, account_id: &str) -> bool {
        self.get(account_id)
            .await
            .map(|p| p.is_running())
            .unwrap_or(false)
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer handle for the run that owns the progress cell.
#[derive(Debug)]
pub struct ProgressHandle {
    cell: Arc<Mutex<SyncProgress>>,
}

impl ProgressHandle {
    pub async fn snapshot(&self) -> SyncProgress {
        self.cell.lock().await.clone()
    }

    pub async fn set_total_chats(&self, total: usize) {
        self.cell.lock().await.total_chats = total;
    }

    pub async fn set_current_chat(&self, chat_id: &str) {
        self.cell.lock().await.current_chat = Some(chat_id.to_string());
    }

    pub async fn add_total_messages(&self, count: usize) {
        self.cell.lock().await.total_messages += count;
    }

    pub async fn incr_synced_chats(&self) {
        self.cell.lock().await.synced_chats += 1;
    }

    pub async fn incr_failed_chats(&self) {
        self.cell.lock().await.failed_chats += 1;
    }

    pub async fn incr_synced_messages(&self) {
        self.cell.lock().await.synced_messages += 1;
    }

    pub async fn incr_failed_messages(&self) {
        self.cell.lock().await.failed_messages += 1;
    }

    pub async fn complete(&self) {
        let mut progress = self.cell.lock().await;
        progress.state = SyncState::Completed;
        progress.current_chat = None;
        progress.finished_at = Some(Utc::now());
    }

    pub async fn fail(&self, error: &str) {
        let mut progress = self.cell.lock().await;
        progress.state = SyncState::Failed;
        progress.error = Some(error.to_string());
        progress.finished_at = Some(Utc::now());
    }
}
