// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Courier bridge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Courier configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// Helpdesk platform connection settings.
    #[serde(default)]
    pub helpdesk: HelpdeskConfig,

    /// Sync engine settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Local chat store settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Helpdesk platform connection configuration.
///
/// An empty `base_url` disables the integration; engine jobs refuse to start
/// until all four fields are set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HelpdeskConfig {
    /// Base URL of the helpdesk installation, without a trailing slash.
    #[serde(default)]
    pub base_url: String,

    /// API access token.
    #[serde(default)]
    pub api_token: String,

    /// Numeric account id on the platform.
    #[serde(default)]
    pub account_id: i64,

    /// Inbox all bridged conversations are filed under.
    #[serde(default)]
    pub inbox_id: i64,
}

impl HelpdeskConfig {
    /// Whether every field required to reach the platform is present.
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
            && !self.api_token.is_empty()
            && self.account_id != 0
            && self.inbox_id != 0
    }
}

/// Sync engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// How many days of history a bulk import covers by default.
    #[serde(default = "default_days_limit")]
    pub days_limit: i64,

    /// Attach downloaded media to exported messages.
    #[serde(default = "default_true")]
    pub include_media: bool,

    /// Include group chats in bulk imports.
    #[serde(default = "default_true")]
    pub include_groups: bool,

    /// Per-chat cap on candidate messages per import run.
    #[serde(default = "default_max_messages_per_chat")]
    pub max_messages_per_chat: usize,

    /// Messages exported between throttle pauses.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches, respecting the helpdesk API's rate limits.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Lifetime of in-memory echo guard entries.
    #[serde(default = "default_echo_ttl_secs")]
    pub echo_ttl_secs: u64,

    /// Lifetime of the live bridge's recent-event dedup entries.
    #[serde(default = "default_forward_dedup_ttl_secs")]
    pub forward_dedup_ttl_secs: u64,

    /// Lifetime of cached group display names.
    #[serde(default = "default_group_cache_ttl_secs")]
    pub group_cache_ttl_secs: u64,

    /// Cap on concurrently running background tasks (avatar syncs etc.).
    #[serde(default = "default_max_background_tasks")]
    pub max_background_tasks: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            days_limit: default_days_limit(),
            include_media: true,
            include_groups: true,
            max_messages_per_chat: default_max_messages_per_chat(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            echo_ttl_secs: default_echo_ttl_secs(),
            forward_dedup_ttl_secs: default_forward_dedup_ttl_secs(),
            group_cache_ttl_secs: default_group_cache_ttl_secs(),
            max_background_tasks: default_max_background_tasks(),
        }
    }
}

fn default_days_limit() -> i64 {
    7
}

fn default_true() -> bool {
    true
}

fn default_max_messages_per_chat() -> usize {
    1000
}

fn default_batch_size() -> usize {
    20
}

fn default_batch_delay_ms() -> u64 {
    500
}

fn default_echo_ttl_secs() -> u64 {
    300
}

fn default_forward_dedup_ttl_secs() -> u64 {
    120
}

fn default_group_cache_ttl_secs() -> u64 {
    300
}

fn default_max_background_tasks() -> usize {
    8
}

/// Local chat store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("courier").join("courier.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("courier.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}
