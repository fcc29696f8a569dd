// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier bridge.
//!
//! This crate provides the foundational trait definitions, error type, and
//! common types used throughout the Courier workspace. The collaborators the
//! sync engine talks to (local chat store, helpdesk platform, messaging
//! platform, transcoder) are all defined here as traits.

pub mod error;
pub mod identity;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CourierError;
pub use types::{
    Attachment, Chat, Contact, ContactAttributes, Conversation, IdempotencyKey,
    LocalEventKind, LocalMessageEvent, MediaKind, MediaRef, MessageDirection, MessageFilter,
    OutboundRemoteMessage, RemoteAttachment, RemoteEvent, RemoteMessageRef, StoredMessage,
};

pub use traits::{ChatStore, HelpdeskClient, MessengerClient, Transcoder};
