// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use courier_config::SyncConfig;
use courier_core::types::{Chat, MediaKind, MediaRef, StoredMessage};
use courier_sync::SyncEngine;
use courier_test_utils::{MemoryChatStore, MockHelpdesk, MockMessenger};

pub const ACCOUNT: &str = "acct-1";

pub struct Fixture {
    pub engine: SyncEngine,
    pub store: Arc<MemoryChatStore>,
    pub helpdesk: Arc<MockHelpdesk>,
    pub messenger: Arc<MockMessenger>,
}

pub fn fixture() -> Fixture {
    fixture_with_config(fast_config())
}

pub fn fixture_with_config(config: SyncConfig) -> Fixture {
    let store = Arc::new(MemoryChatStore::new());
    let helpdesk = Arc::new(MockHelpdesk::new());
    let messenger = Arc::new(MockMessenger::new());
    let engine = SyncEngine::new(
        store.clone(),
        helpdesk.clone(),
        messenger.clone(),
        config,
    )
    .expect("engine construction");
    Fixture {
        engine,
        store,
        helpdesk,
        messenger,
    }
}

/// Config with throttling disabled so tests don't sleep.
pub fn fast_config() -> SyncConfig {
    SyncConfig {
        batch_delay_ms: 0,
        ..SyncConfig::default()
    }
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

pub fn make_chat(id: &str, name: &str) -> Chat {
    Chat {
        account_id: ACCOUNT.to_string(),
        id: id.to_string(),
        name: name.to_string(),
        last_message_at: Some(Utc::now()),
    }
}

pub fn make_msg(id: &str, chat_id: &str, content: &str, at: DateTime<Utc>) -> StoredMessage {
    StoredMessage {
        id: id.to_string(),
        account_id: ACCOUNT.to_string(),
        chat_id: chat_id.to_string(),
        sender: "15551230001@host".to_string(),
        content: content.to_string(),
        timestamp: at,
        is_from_me: false,
        media: None,
    }
}

#[allow(dead_code)]
pub fn make_media_msg(
    id: &str,
    chat_id: &str,
    content: &str,
    at: DateTime<Utc>,
    url: &str,
    kind: MediaKind,
) -> StoredMessage {
    let mut msg = make_msg(id, chat_id, content, at);
    msg.media = Some(MediaRef {
        kind,
        url: url.to_string(),
        file_name: None,
        media_key: vec![1, 2, 3],
        file_sha256: vec![],
        file_enc_sha256: vec![],
        file_length: 3,
    });
    msg
}
