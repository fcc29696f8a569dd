// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the sync engine.

pub mod chat_store;
pub mod helpdesk;
pub mod messenger;
pub mod transcode;

pub use chat_store::ChatStore;
pub use helpdesk::HelpdeskClient;
pub use messenger::MessengerClient;
pub use transcode::Transcoder;
