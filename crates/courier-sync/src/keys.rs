// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotency key engine.
//!
//! A message's key is a SHA-256 digest over its identity fields, separated by
//! `|`: account, chat, timestamp (RFC 3339 with nanosecond precision, UTC),
//! sender, text content, media kind, media URL. Any field change, including a
//! caption edit, produces a different key; edits are modeled as new exports.

use chrono::SecondsFormat;
use sha2::{Digest, Sha256};

use courier_core::types::{IdempotencyKey, StoredMessage};

/// Compute the idempotency key for a message. Pure and deterministic: stable
/// across process restarts and independent of memory layout or map order.
pub fn message_key(account_id: &str, chat_id: &str, msg: &StoredMessage) -> IdempotencyKey {
    let mut hasher = Sha256::new();
    hasher.update(account_id.as_bytes());
    hasher.update(b"|");
    hasher.update(chat_id.as_bytes());
    hasher.update(b"|");
    hasher.update(
        msg.timestamp
            .to_rfc3339_opts(SecondsFormat::Nanos, true)
            .as_bytes(),
    );
    hasher.update(b"|");
    hasher.update(msg.sender.as_bytes());
    hasher.update(b"|");
    hasher.update(msg.content.as_bytes());
    hasher.update(b"|");
    match &msg.media {
        Some(media) => {
            hasher.update(media.kind.to_string().as_bytes());
            hasher.update(b"|");
            hasher.update(media.url.as_bytes());
        }
        None => {
            hasher.update(b"|");
        }
    }
    IdempotencyKey(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use courier_core::types::{MediaKind, MediaRef};
    use proptest::prelude::*;

    fn make_msg(content: &str, ts_nanos: i64) -> StoredMessage {
        StoredMessage {
            id: "m1".into(),
            account_id: "acct".into(),
            chat_id: "c1@host".into(),
            sender: "15551234567@host".into(),
            content: content.into(),
            timestamp: Utc.timestamp_nanos(ts_nanos),
            is_from_me: false,
            media: None,
        }
    }

    #[test]
    fn same_input_same_key() {
        let msg = make_msg("hello", 1_700_000_000_123_456_789);
        let a = message_key("acct", "c1@host", &msg);
        let b = message_key("acct", "c1@host", &msg);
        assert_eq!(a, b);
    }

    #[test]
    fn key_is_fixed_width_hex() {
        let key = message_key("acct", "c1@host", &make_msg("hello", 0));
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn content_change_changes_key() {
        let a = message_key("acct", "c1@host", &make_msg("hello", 0));
        let b = message_key("acct", "c1@host", &make_msg("hello!", 0));
        assert_ne!(a, b);
    }

    #[test]
    fn nanosecond_timestamp_change_changes_key() {
        let a = message_key("acct", "c1@host", &make_msg("hello", 1_700_000_000_000_000_000));
        let b = message_key("acct", "c1@host", &make_msg("hello", 1_700_000_000_000_000_001));
        assert_ne!(a, b);
    }

    #[test]
    fn media_fields_participate() {
        let plain = make_msg("", 0);
        let mut with_media = plain.clone();
        with_media.media = Some(MediaRef {
            kind: MediaKind::Image,
            url: "https://cdn/a".into(),
            file_name: None,
            media_key: vec![],
            file_sha256: vec![],
            file_enc_sha256: vec![],
            file_length: 0,
        });
        let a = message_key("acct", "c1@host", &plain);
        let b = message_key("acct", "c1@host", &with_media);
        assert_ne!(a, b);

        let mut other_url = with_media.clone();
        if let Some(m) = other_url.media.as_mut() {
            m.url = "https://cdn/b".into();
        }
        let c = message_key("acct", "c1@host", &other_url);
        assert_ne!(b, c);
    }

    #[test]
    fn chat_scoping_changes_key() {
        let msg = make_msg("hello", 0);
        let a = message_key("acct", "c1@host", &msg);
        let b = message_key("acct", "c2@host", &msg);
        let c = message_key("acct2", "c1@host", &msg);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    proptest! {
        #[test]
        fn distinct_contents_yield_distinct_keys(
            a in "[ -~]{0,64}",
            b in "[ -~]{0,64}",
        ) {
            prop_assume!(a != b);
            let ka = message_key("acct", "c1@host", &make_msg(&a, 0));
            let kb = message_key("acct", "c1@host", &make_msg(&b, 0));
            prop_assert_ne!(ka, kb);
        }

        #[test]
        fn key_is_deterministic_for_any_content(content in "[ -~]{0,128}") {
            let msg = make_msg(&content, 42);
            let ka = message_key("acct", "c1@host", &msg);
            let kb = message_key("acct", "c1@host", &msg);
            prop_assert_eq!(ka, kb);
        }
    }
}
