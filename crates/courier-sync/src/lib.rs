// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronization & reconciliation engine for the Courier bridge.
//!
//! The [`SyncEngine`] keeps a helpdesk platform's conversation threads
//! eventually consistent with a local message store:
//! - bulk historical import with resumable watermarks ([`importer`])
//! - diff-based repair of divergence ([`reconciler`])
//! - hash-gated profile picture propagation ([`avatar`])
//! - real-time bidirectional mirroring with echo suppression ([`live`])
//!
//! Dedup is layered: a deterministic idempotency key per message ([`keys`]),
//! an in-memory TTL echo guard ([`echo`]), and the store's insert-if-absent
//! exported-message table as the durable backstop. Contact and conversation
//! resolution is serialized per identifier through [`locks`].

pub mod avatar;
pub mod echo;
pub mod importer;
pub mod keys;
pub mod live;
pub mod locks;
pub mod media;
pub mod progress;
pub mod reconciler;
pub mod tasks;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use courier_config::SyncConfig;
use courier_core::types::{Contact, Conversation};
use courier_core::{ChatStore, CourierError, HelpdeskClient, MessengerClient, Transcoder};

pub use echo::EchoGuard;
pub use importer::SyncOptions;
pub use keys::message_key;
pub use live::{ForwardOutcome, LiveBridge, SkipReason};
pub use locks::KeyLocks;
pub use progress::{ProgressTracker, SyncProgress, SyncState};
pub use tasks::TaskPool;

/// Errors surfaced by engine entry points.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A history sync is already running for the account. Carries a snapshot
    /// of the run in progress.
    #[error("history sync already running for account {}", .0.account_id)]
    AlreadyRunning(Box<SyncProgress>),

    #[error(transparent)]
    Engine(#[from] CourierError),
}

/// The synchronization engine. Cheap to clone: all state is shared behind
/// `Arc`s, so clones observe the same progress table, locks, echo guard, and
/// task pool.
#[derive(Clone)]
pub struct SyncEngine {
    pub(crate) store: Arc<dyn ChatStore>,
    pub(crate) helpdesk: Arc<dyn HelpdeskClient>,
    pub(crate) messenger: Arc<dyn MessengerClient>,
    pub(crate) transcoder: Option<Arc<dyn Transcoder>>,
    pub(crate) locks: Arc<KeyLocks>,
    pub(crate) echo: Arc<EchoGuard>,
    pub(crate) progress: Arc<ProgressTracker>,
    pub(crate) tasks: Arc<TaskPool>,
    pub(crate) http: reqwest::Client,
    pub(crate) config: SyncConfig,
}

impl SyncEngine {
    /// Wire up an engine over its collaborators.
    pub fn new(
        store: Arc<dyn ChatStore>,
        helpdesk: Arc<dyn HelpdeskClient>,
        messenger: Arc<dyn MessengerClient>,
        config: SyncConfig,
    ) -> Result<Self, CourierError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CourierError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            store,
            helpdesk,
            messenger,
            transcoder: None,
            locks: Arc::new(KeyLocks::new()),
            echo: Arc::new(EchoGuard::new(Duration::from_secs(config.echo_ttl_secs))),
            progress: Arc::new(ProgressTracker::new()),
            tasks: Arc::new(TaskPool::new(config.max_background_tasks)),
            http,
            config,
        })
    }

    /// Attach an external transcoder for audio attachments.
    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    /// Default per-run options derived from configuration.
    pub fn default_options(&self) -> SyncOptions {
        SyncOptions::from_config(&self.config)
    }

    /// The in-memory echo guard (shared with the live bridge).
    pub fn echo_guard(&self) -> &Arc<EchoGuard> {
        &self.echo
    }

    /// Deep-copied progress snapshot for an account, if a run was started.
    pub async fn progress(&self, account_id: &str) -> Option<SyncProgress> {
        self.progress.get(account_id).await
    }

    /// Whether a history sync is currently running for the account.
    pub async fn is_running(&self, account_id: &str) -> bool {
        self.progress.is_running(account_id).await
    }

    /// Start the background echo-guard eviction sweep. Runs until the token
    /// cancels; the interval matches the configured TTL.
    pub fn start_echo_sweeper(&self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        self.echo
            .spawn_sweeper(Duration::from_secs(self.config.echo_ttl_secs.max(1)), cancel)
    }

    /// Drain in-flight background work before shutdown.
    pub async fn shutdown(&self) {
        debug!("draining background tasks");
        self.tasks.drain().await;
    }

    /// Resolve (or create) the remote contact and conversation for a chat,
    /// serialized per identifier. The lock is held across both network calls
    /// so concurrent events for one identifier cannot create duplicates;
    /// other identifiers are unaffected.
    pub(crate) async fn resolve_thread(
        &self,
        name: &str,
        identifier: &str,
        is_group: bool,
    ) -> Result<(Contact, Conversation), CourierError> {
        let _guard = self.locks.lock(identifier).await;
        let contact = self
            .helpdesk
            .find_or_create_contact(name, identifier, is_group)
            .await?;
        let conversation = self.helpdesk.find_or_create_conversation(contact.id).await?;
        Ok((contact, conversation))
    }

    /// Queue a background avatar refresh; failures and timeouts are logged,
    /// never propagated.
    pub(crate) async fn spawn_avatar_sync(&self, identifier: String, name_hint: String) {
        let engine = self.clone();
        self.tasks
            .submit(async move {
                let result = tokio::time::timeout(
                    Duration::from_secs(15),
                    engine.sync_contact_avatar(&identifier, &name_hint),
                )
                .await;
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        debug!(identifier = identifier.as_str(), error = %e, "avatar sync failed");
                    }
                    Err(_) => {
                        debug!(identifier = identifier.as_str(), "avatar sync timed out");
                    }
                }
            })
            .await;
    }
}
