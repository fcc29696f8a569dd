// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Courier bridge.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and the export bookkeeping tables
//! (watermarks, exported-message records) the sync engine depends on.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread: `Database` wraps one connection, query modules accept `&Database`,
//! and that eliminates SQLITE_BUSY errors under concurrent access.

pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::SqliteChatStore;
