// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the helpdesk platform's REST API and webhooks.

use serde::{Deserialize, Serialize};

use courier_core::types::{
    Contact, ContactAttributes, MessageDirection, RemoteAttachment, RemoteEvent,
};

#[derive(Debug, Clone, Serialize)]
pub struct CreateContactRequest {
    pub inbox_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub custom_attributes: ContactAttributes,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateConversationRequest {
    pub inbox_id: i64,
    pub contact_id: i64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest {
    pub content: String,
    pub message_type: String,
    pub private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactSearchResponse {
    #[serde(default)]
    pub payload: Vec<Contact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationListEntry {
    pub id: i64,
    #[serde(default)]
    pub inbox_id: i64,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationListResponse {
    #[serde(default)]
    pub payload: Vec<ConversationListEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageListEntry {
    pub id: i64,
    #[serde(default)]
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageListResponse {
    #[serde(default)]
    pub payload: Vec<MessageListEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedMessageResponse {
    #[serde(default)]
    pub id: i64,
}

/// Webhook payload delivered by the platform on conversation events.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<WebhookAttachment>,
    #[serde(default)]
    pub conversation: WebhookConversation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookAttachment {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub data_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookConversation {
    #[serde(default)]
    pub meta: WebhookConversationMeta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookConversationMeta {
    #[serde(default)]
    pub sender: Option<Contact>,
}

impl WebhookPayload {
    /// Flatten the webhook envelope into the engine's [`RemoteEvent`].
    pub fn into_remote_event(self) -> RemoteEvent {
        let direction = match self.message_type.as_deref() {
            Some("incoming") => Some(MessageDirection::Incoming),
            Some("outgoing") => Some(MessageDirection::Outgoing),
            _ => None,
        };
        let contact = self.conversation.meta.sender.unwrap_or(Contact {
            id: 0,
            name: String::new(),
            identifier: None,
            phone_number: None,
            attributes: ContactAttributes::default(),
        });
        RemoteEvent {
            event: self.event,
            message_id: self.id,
            direction,
            private: self.private,
            content: self.content.unwrap_or_default(),
            attachments: self
                .attachments
                .into_iter()
                .map(|a| RemoteAttachment {
                    id: a.id,
                    file_type: a.file_type,
                    data_url: a.data_url,
                })
                .collect(),
            contact,
        }
    }
}
