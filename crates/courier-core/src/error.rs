// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Courier bridge.

use thiserror::Error;

/// The primary error type used across all Courier collaborator traits and
/// engine operations.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Configuration errors (helpdesk not configured, invalid TOML, missing
    /// required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Local chat store errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Helpdesk platform errors (API failure, rejected payload, decode failure).
    #[error("helpdesk error: {message}")]
    Helpdesk {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Messaging platform errors (media download, send failure).
    #[error("messenger error: {message}")]
    Messenger {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Media handling errors (unsupported kind, staging failure). Callers on
    /// the export paths degrade these to text placeholders.
    #[error("media error: {0}")]
    Media(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The surrounding job was cancelled before this operation could run.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Wrap an arbitrary error as a storage failure.
    pub fn storage<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        CourierError::Storage {
            source: source.into(),
        }
    }

    /// Build a helpdesk error from a message alone.
    pub fn helpdesk(message: impl Into<String>) -> Self {
        CourierError::Helpdesk {
            message: message.into(),
            source: None,
        }
    }

    /// Build a messenger error from a message alone.
    pub fn messenger(message: impl Into<String>) -> Self {
        CourierError::Messenger {
            message: message.into(),
            source: None,
        }
    }
}
