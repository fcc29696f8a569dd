// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock collaborators for deterministic engine tests.
//!
//! Each mock implements the corresponding `courier-core` trait with
//! injectable state, captured calls for assertions, and failure toggles.

pub mod mock_helpdesk;
pub mod mock_messenger;
pub mod mock_store;
pub mod mock_transcoder;

pub use mock_helpdesk::{CreatedRemoteMessage, MockHelpdesk};
pub use mock_messenger::MockMessenger;
pub use mock_store::MemoryChatStore;
pub use mock_transcoder::MockTranscoder;
