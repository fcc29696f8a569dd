// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared between the sync engine and its collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Deterministic fingerprint of a message, used to prevent duplicate export
/// and stored on the remote message as its external reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(pub String);

impl IdempotencyKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Media classification carried on a stored message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    /// Voice note recorded in the messaging app. Uploaded to the helpdesk
    /// marked as recorded audio so it renders with a player.
    Voice,
    Document,
    Sticker,
}

/// Direction of a message relative to the helpdesk conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Incoming,
    Outgoing,
}

/// A chat thread in the local message store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub account_id: String,
    pub id: String,
    pub name: String,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Descriptor for downloadable media attached to a stored message. Opaque to
/// the engine; the messenger client knows how to turn it into bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub url: String,
    pub file_name: Option<String>,
    pub media_key: Vec<u8>,
    pub file_sha256: Vec<u8>,
    pub file_enc_sha256: Vec<u8>,
    pub file_length: u64,
}

/// A message row from the local store. Its natural identity is the field
/// values themselves; the platform-assigned `id` is not trusted for dedup
/// because re-ingestion may re-read the same logical message under a new id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub account_id: String,
    pub chat_id: String,
    pub sender: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_from_me: bool,
    pub media: Option<MediaRef>,
}

/// Query filter for [`ChatStore::list_messages`](crate::traits::ChatStore::list_messages).
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub account_id: String,
    pub chat_id: String,
    /// Only messages strictly after this instant.
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Typed view of the custom attributes Courier stores on a remote contact.
///
/// The named fields are the ones the engine reads; anything else the helpdesk
/// account has attached survives round-trips through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactAttributes {
    /// Local chat identifier, used for reverse lookup when a helpdesk agent
    /// replies.
    #[serde(rename = "courier_chat_id", skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,

    /// Content hash of the last avatar uploaded for this contact.
    #[serde(
        rename = "courier_avatar_hash",
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar_hash: Option<String>,

    /// When the avatar was last checked against the messaging platform.
    #[serde(
        rename = "courier_avatar_checked_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar_checked_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContactAttributes {
    pub fn is_empty(&self) -> bool {
        self.chat_id.is_none()
            && self.avatar_hash.is_none()
            && self.avatar_checked_at.is_none()
            && self.extra.is_empty()
    }
}

/// A contact handle owned by the helpdesk platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default, rename = "custom_attributes")]
    pub attributes: ContactAttributes,
}

/// A conversation handle owned by the helpdesk platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    #[serde(default)]
    pub contact_id: i64,
    #[serde(default)]
    pub inbox_id: i64,
    #[serde(default)]
    pub status: String,
}

/// Minimal view of a remote message used by the reconciler: its remote id and
/// the external reference tag it carries, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMessageRef {
    pub id: i64,
    pub external_ref: Option<String>,
}

/// An attachment payload ready for upload to the helpdesk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// A message to be created on the helpdesk side.
#[derive(Debug, Clone)]
pub struct OutboundRemoteMessage {
    pub conversation_id: i64,
    pub content: String,
    pub direction: MessageDirection,
    pub attachments: Vec<Attachment>,
    pub external_ref: Option<IdempotencyKey>,
}

/// An attachment carried on a helpdesk-originated message, referenced by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAttachment {
    pub id: i64,
    pub file_type: String,
    pub data_url: String,
}

/// A helpdesk-originated event delivered to the live bridge by the webhook
/// transport.
#[derive(Debug, Clone)]
pub struct RemoteEvent {
    /// Event name as reported by the platform, e.g. `message_created`.
    pub event: String,
    pub message_id: i64,
    pub direction: Option<MessageDirection>,
    pub private: bool,
    pub content: String,
    pub attachments: Vec<RemoteAttachment>,
    pub contact: Contact,
}

/// Classification of a local platform event, used by the live bridge to skip
/// event types that should never reach a human-facing thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum LocalEventKind {
    Text,
    Media,
    Sticker,
    Reaction,
    PollUpdate,
    Protocol,
    Ephemeral,
    Other,
}

/// A local message event flowing through the live bridge.
#[derive(Debug, Clone)]
pub struct LocalMessageEvent {
    pub message: StoredMessage,
    pub kind: LocalEventKind,
    /// Display name of the sender as pushed by the platform, if any.
    pub sender_name: String,
    pub edited: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn media_kind_round_trips_through_strings() {
        for kind in [
            MediaKind::Image,
            MediaKind::Video,
            MediaKind::Audio,
            MediaKind::Voice,
            MediaKind::Document,
            MediaKind::Sticker,
        ] {
            let s = kind.to_string();
            assert_eq!(MediaKind::from_str(&s).unwrap(), kind);
        }
        assert_eq!(MediaKind::Image.to_string(), "image");
    }

    #[test]
    fn direction_wire_values() {
        assert_eq!(MessageDirection::Incoming.to_string(), "incoming");
        assert_eq!(MessageDirection::Outgoing.to_string(), "outgoing");
        let json = serde_json::to_string(&MessageDirection::Outgoing).unwrap();
        assert_eq!(json, "\"outgoing\"");
    }

    #[test]
    fn contact_attributes_use_wire_keys() {
        let attrs = ContactAttributes {
            chat_id: Some("123@group".into()),
            avatar_hash: Some("abc".into()),
            avatar_checked_at: None,
            extra: serde_json::Map::new(),
        };
        let json = serde_json::to_value(&attrs).unwrap();
        assert_eq!(json["courier_chat_id"], "123@group");
        assert_eq!(json["courier_avatar_hash"], "abc");
        assert!(json.get("courier_avatar_checked_at").is_none());
    }

    #[test]
    fn contact_attributes_preserve_unknown_keys() {
        let json = serde_json::json!({
            "courier_chat_id": "555@host",
            "crm_tier": "gold"
        });
        let attrs: ContactAttributes = serde_json::from_value(json).unwrap();
        assert_eq!(attrs.chat_id.as_deref(), Some("555@host"));
        assert_eq!(attrs.extra["crm_tier"], "gold");

        let back = serde_json::to_value(&attrs).unwrap();
        assert_eq!(back["crm_tier"], "gold");
    }

    #[test]
    fn contact_decodes_with_missing_optional_fields() {
        let contact: Contact = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(contact.id, 42);
        assert!(contact.attributes.is_empty());
    }
}
