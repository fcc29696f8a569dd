// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live bridge integration tests: both mirroring directions plus echo
//! suppression.

mod common;

use courier_core::types::{
    Contact, ContactAttributes, LocalEventKind, LocalMessageEvent, MediaKind, MessageDirection,
    RemoteAttachment, RemoteEvent, StoredMessage,
};
use courier_core::ChatStore;
use courier_sync::{ForwardOutcome, LiveBridge, SkipReason};
use common::{days_ago, fixture, make_media_msg, make_msg, Fixture, ACCOUNT};

const CHAT: &str = "15551230001@host";

fn local_event(msg: StoredMessage) -> LocalMessageEvent {
    LocalMessageEvent {
        message: msg,
        kind: LocalEventKind::Text,
        sender_name: "Alice".to_string(),
        edited: false,
    }
}

fn remote_event(message_id: i64, content: &str, destination: Option<&str>) -> RemoteEvent {
    RemoteEvent {
        event: "message_created".to_string(),
        message_id,
        direction: Some(MessageDirection::Outgoing),
        private: false,
        content: content.to_string(),
        attachments: vec![],
        contact: Contact {
            id: 7,
            name: "Alice".to_string(),
            identifier: None,
            phone_number: None,
            attributes: ContactAttributes {
                chat_id: destination.map(String::from),
                ..Default::default()
            },
        },
    }
}

fn bridge(f: &Fixture) -> LiveBridge {
    LiveBridge::new(f.engine.clone())
}

#[tokio::test]
async fn local_message_forwards_with_key_and_echo_mark() {
    let f = fixture();
    let bridge = bridge(&f);

    let msg = make_msg("evt-1", CHAT, "hello there", days_ago(0));
    let outcome = bridge.forward_local_message(&local_event(msg)).await.unwrap();
    assert_eq!(outcome, ForwardOutcome::Forwarded);

    let created = f.helpdesk.created_messages().await;
    assert_eq!(created.len(), 1);
    let key = created[0].external_ref.as_deref().expect("key tag");

    // Both dedup layers saw the new remote message.
    assert!(f.engine.echo_guard().was_sent_by_us(created[0].id).await);
    assert!(f
        .store
        .is_key_exported(
            ACCOUNT,
            CHAT,
            &courier_core::IdempotencyKey(key.to_string())
        )
        .await
        .unwrap());
}

#[tokio::test]
async fn repeated_event_id_is_deduplicated_in_memory() {
    let f = fixture();
    let bridge = bridge(&f);

    let event = local_event(make_msg("evt-1", CHAT, "hello", days_ago(0)));
    assert_eq!(
        bridge.forward_local_message(&event).await.unwrap(),
        ForwardOutcome::Forwarded
    );
    assert_eq!(
        bridge.forward_local_message(&event).await.unwrap(),
        ForwardOutcome::Skipped(SkipReason::Duplicate)
    );
    assert_eq!(f.helpdesk.created_count().await, 1);
}

#[tokio::test]
async fn reingested_message_is_deduplicated_by_key() {
    let f = fixture();
    let bridge = bridge(&f);

    let msg = make_msg("evt-1", CHAT, "hello", days_ago(0));
    bridge
        .forward_local_message(&local_event(msg.clone()))
        .await
        .unwrap();

    // Same logical message re-read under a fresh platform id.
    let mut reread = msg;
    reread.id = "evt-1-replay".to_string();
    let outcome = bridge
        .forward_local_message(&local_event(reread))
        .await
        .unwrap();
    assert_eq!(outcome, ForwardOutcome::Skipped(SkipReason::AlreadyExported));
    assert_eq!(f.helpdesk.created_count().await, 1);
}

#[tokio::test]
async fn non_forwardable_kinds_are_skipped() {
    let f = fixture();
    let bridge = bridge(&f);

    for kind in [
        LocalEventKind::Reaction,
        LocalEventKind::PollUpdate,
        LocalEventKind::Protocol,
        LocalEventKind::Ephemeral,
    ] {
        let mut event = local_event(make_msg(
            &format!("evt-{kind}"),
            CHAT,
            "payload",
            days_ago(0),
        ));
        event.kind = kind;
        assert_eq!(
            bridge.forward_local_message(&event).await.unwrap(),
            ForwardOutcome::Skipped(SkipReason::Unsupported),
            "kind {kind} must not forward"
        );
    }
    assert_eq!(f.helpdesk.created_count().await, 0);
}

#[tokio::test]
async fn group_names_are_cached() {
    let f = fixture();
    let bridge = bridge(&f);
    f.messenger.set_group_name("g1@group", "Project Team").await;

    for i in 0..3 {
        let mut msg = make_msg(&format!("evt-{i}"), "g1@group", "hi", days_ago(0));
        msg.timestamp += chrono::Duration::seconds(i);
        bridge
            .forward_local_message(&local_event(msg))
            .await
            .unwrap();
    }

    assert_eq!(f.messenger.group_name_calls(), 1, "name must come from cache");
    let contact = f.helpdesk.contact_by_identifier("g1@group").await.unwrap();
    assert_eq!(contact.name, "Project Team");
}

#[tokio::test]
async fn media_failure_degrades_to_text_placeholder() {
    let f = fixture();
    let bridge = bridge(&f);
    f.messenger.fail_media_download(true);

    let msg = make_media_msg(
        "evt-1",
        CHAT,
        "see photo",
        days_ago(0),
        "https://cdn/p1",
        MediaKind::Image,
    );
    let outcome = bridge.forward_local_message(&local_event(msg)).await.unwrap();
    assert_eq!(outcome, ForwardOutcome::Forwarded);

    let created = f.helpdesk.created_messages().await;
    assert_eq!(created[0].attachment_count, 0);
    assert!(created[0].content.ends_with("[media unavailable]"));
}

#[tokio::test]
async fn media_attaches_when_downloadable() {
    let f = fixture();
    let bridge = bridge(&f);
    f.messenger.set_media("https://cdn/p1", vec![1, 2, 3, 4]).await;

    let msg = make_media_msg(
        "evt-1",
        CHAT,
        "see photo",
        days_ago(0),
        "https://cdn/p1",
        MediaKind::Image,
    );
    bridge.forward_local_message(&local_event(msg)).await.unwrap();

    let created = f.helpdesk.created_messages().await;
    assert_eq!(created[0].attachment_count, 1);
    assert!(!created[0].content.contains("[media unavailable]"));
}

#[tokio::test]
async fn agent_reply_is_delivered_and_sanitized() {
    let f = fixture();
    let bridge = bridge(&f);

    let event = remote_event(900, "Hello!\r\n\n\n\nRegards", Some(CHAT));
    let outcome = bridge.handle_remote_message(&event).await.unwrap();
    assert_eq!(outcome, ForwardOutcome::Forwarded);

    let sent = f.messenger.sent_texts().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "15551230001", "phone extracted from chat id");
    assert_eq!(sent[0].1, "Hello!\n\nRegards");
}

#[tokio::test]
async fn non_message_events_are_ignored() {
    let f = fixture();
    let bridge = bridge(&f);

    let mut event = remote_event(900, "x", Some(CHAT));
    event.event = "conversation_updated".to_string();
    assert_eq!(
        bridge.handle_remote_message(&event).await.unwrap(),
        ForwardOutcome::Skipped(SkipReason::NotAMessage)
    );

    let mut event = remote_event(901, "x", Some(CHAT));
    event.direction = Some(MessageDirection::Incoming);
    assert_eq!(
        bridge.handle_remote_message(&event).await.unwrap(),
        ForwardOutcome::Skipped(SkipReason::NotAMessage)
    );

    let mut event = remote_event(902, "x", Some(CHAT));
    event.private = true;
    assert_eq!(
        bridge.handle_remote_message(&event).await.unwrap(),
        ForwardOutcome::Skipped(SkipReason::NotAMessage)
    );

    assert!(f.messenger.sent_texts().await.is_empty());
}

#[tokio::test]
async fn own_messages_are_suppressed_by_memory_guard() {
    let f = fixture();
    let bridge = bridge(&f);

    // Forward a local message; the helpdesk will echo it back as a webhook.
    let msg = make_msg("evt-1", CHAT, "hello", days_ago(0));
    bridge.forward_local_message(&local_event(msg)).await.unwrap();
    let created = f.helpdesk.created_messages().await;

    let echo = remote_event(created[0].id, "hello", Some(CHAT));
    assert_eq!(
        bridge.handle_remote_message(&echo).await.unwrap(),
        ForwardOutcome::Skipped(SkipReason::Echo)
    );
    assert!(f.messenger.sent_texts().await.is_empty());
}

#[tokio::test]
async fn own_messages_are_suppressed_by_persisted_record_after_restart() {
    let f = fixture();
    let bridge = bridge(&f);

    // Simulate a pre-restart export: only the store remembers it.
    f.store
        .mark_key_exported(ACCOUNT, CHAT, &courier_core::IdempotencyKey("k".into()), 950)
        .await
        .unwrap();
    assert!(!f.engine.echo_guard().was_sent_by_us(950).await);

    let echo = remote_event(950, "hello", Some(CHAT));
    assert_eq!(
        bridge.handle_remote_message(&echo).await.unwrap(),
        ForwardOutcome::Skipped(SkipReason::Echo)
    );
    assert!(f.messenger.sent_texts().await.is_empty());
}

#[tokio::test]
async fn persisted_lookup_failure_fails_open() {
    let f = fixture();
    let bridge = bridge(&f);
    f.store.fail_export_lookups(true);

    let event = remote_event(960, "legit agent reply", Some(CHAT));
    assert_eq!(
        bridge.handle_remote_message(&event).await.unwrap(),
        ForwardOutcome::Forwarded,
        "a broken dedup store must not drop agent replies"
    );
    assert_eq!(f.messenger.sent_texts().await.len(), 1);
}

#[tokio::test]
async fn missing_destination_is_skipped() {
    let f = fixture();
    let bridge = bridge(&f);

    let event = remote_event(970, "hello", None);
    assert_eq!(
        bridge.handle_remote_message(&event).await.unwrap(),
        ForwardOutcome::Skipped(SkipReason::NoDestination)
    );
}

#[tokio::test]
async fn destination_falls_back_to_phone_number() {
    let f = fixture();
    let bridge = bridge(&f);

    let mut event = remote_event(971, "hello", None);
    event.contact.phone_number = Some("+15551230001".to_string());
    assert_eq!(
        bridge.handle_remote_message(&event).await.unwrap(),
        ForwardOutcome::Forwarded
    );
    let sent = f.messenger.sent_texts().await;
    assert_eq!(sent[0].0, "15551230001");
}

#[tokio::test]
async fn attachments_fan_out_with_caption() {
    let f = fixture();
    let bridge = bridge(&f);

    let mut event = remote_event(980, "the files", Some(CHAT));
    event.attachments = vec![
        RemoteAttachment {
            id: 1,
            file_type: "image".to_string(),
            data_url: "https://desk/img.png".to_string(),
        },
        RemoteAttachment {
            id: 2,
            file_type: "audio".to_string(),
            data_url: "https://desk/note.ogg".to_string(),
        },
    ];

    assert_eq!(
        bridge.handle_remote_message(&event).await.unwrap(),
        ForwardOutcome::Forwarded
    );

    let sent = f.messenger.sent_attachments().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].2, "the files");
    // Attachment delivery replaces a separate text send.
    assert!(f.messenger.sent_texts().await.is_empty());
}

#[tokio::test]
async fn group_replies_keep_the_group_destination() {
    let f = fixture();
    let bridge = bridge(&f);

    let event = remote_event(990, "hello group", Some("g1@group"));
    bridge.handle_remote_message(&event).await.unwrap();

    let sent = f.messenger.sent_texts().await;
    assert_eq!(sent[0].0, "g1@group", "group ids are not phone-stripped");
}
