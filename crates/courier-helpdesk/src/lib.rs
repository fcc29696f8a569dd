// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST client for the helpdesk platform.
//!
//! Implements [`HelpdeskClient`] against a Chatwoot-compatible HTTP API:
//! token-header auth, contact search with identifier/phone disambiguation,
//! conversation reuse, message CRUD with external references, and multipart
//! attachment/avatar uploads.

pub mod attachments;
pub mod types;

pub use types::WebhookPayload;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use courier_config::HelpdeskConfig;
use courier_core::identity::normalize_phone_e164;
use courier_core::types::{
    Contact, ContactAttributes, Conversation, OutboundRemoteMessage, RemoteMessageRef,
};
use courier_core::{CourierError, HelpdeskClient};

use crate::types::{
    ContactSearchResponse, ConversationListResponse, CreateContactRequest,
    CreateConversationRequest, CreateMessageRequest, CreatedMessageResponse,
    MessageListResponse,
};

/// HTTP client for the helpdesk platform's REST API.
#[derive(Debug, Clone)]
pub struct HelpdeskApi {
    client: reqwest::Client,
    base_url: String,
    account_id: i64,
    inbox_id: i64,
    configured: bool,
}

impl HelpdeskApi {
    /// Build a client from configuration. The API token becomes a default
    /// header on every request.
    pub fn new(config: &HelpdeskConfig) -> Result<Self, CourierError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "api_access_token",
            HeaderValue::from_str(&config.api_token)
                .map_err(|e| CourierError::Config(format!("invalid API token value: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CourierError::Helpdesk {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_id: config.account_id,
            inbox_id: config.inbox_id,
            configured: config.is_configured(),
        })
    }

    fn account_url(&self, suffix: &str) -> String {
        format!(
            "{}/api/v1/accounts/{}/{suffix}",
            self.base_url, self.account_id
        )
    }

    async fn find_contact(
        &self,
        identifier: &str,
        is_group: bool,
    ) -> Result<Option<Contact>, CourierError> {
        let search_term = if is_group {
            identifier.to_string()
        } else {
            normalize_phone_e164(identifier)
        };

        let url = self.account_url("contacts/search");
        debug!(identifier, is_group, "searching helpdesk contact");

        let response = self
            .client
            .get(&url)
            .query(&[("q", search_term.as_str())])
            .send()
            .await
            .map_err(|e| send_error("contact search", e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(status_error("contact search", status, &body));
        }

        let result: ContactSearchResponse =
            serde_json::from_str(&body).map_err(|e| decode_error("contact search", e))?;

        for contact in result.payload {
            if is_group {
                if contact.identifier.as_deref() == Some(identifier)
                    || contact.attributes.chat_id.as_deref() == Some(identifier)
                {
                    return Ok(Some(contact));
                }
                continue;
            }

            if contact.phone_number.as_deref() == Some(search_term.as_str())
                || contact.attributes.chat_id.as_deref() == Some(identifier)
            {
                return Ok(Some(contact));
            }
        }

        Ok(None)
    }

    async fn create_contact(
        &self,
        name: &str,
        identifier: &str,
        is_group: bool,
    ) -> Result<Contact, CourierError> {
        let (phone_number, contact_identifier) = if is_group {
            (None, Some(identifier.to_string()))
        } else {
            (Some(normalize_phone_e164(identifier)), None)
        };

        let payload = CreateContactRequest {
            inbox_id: self.inbox_id,
            name: name.to_string(),
            phone_number,
            identifier: contact_identifier,
            custom_attributes: ContactAttributes {
                chat_id: Some(identifier.to_string()),
                ..Default::default()
            },
        };

        let response = self
            .client
            .post(self.account_url("contacts"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| send_error("contact create", e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, "contact create response");

        if !status.is_success() {
            // Another worker may have won the race; the caller refinds.
            return Err(status_error("contact create", status, &body));
        }

        decode_contact(&body).ok_or_else(|| {
            CourierError::helpdesk(format!(
                "failed to decode contact response (no valid id found): {body}"
            ))
        })
    }

    async fn find_conversation(
        &self,
        contact_id: i64,
    ) -> Result<Option<Conversation>, CourierError> {
        let url = self.account_url(&format!("contacts/{contact_id}/conversations"));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| send_error("conversation list", e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(status_error("conversation list", status, &body));
        }

        let result: ConversationListResponse =
            serde_json::from_str(&body).map_err(|e| decode_error("conversation list", e))?;

        for conv in result.payload {
            if conv.inbox_id == self.inbox_id && conv.status != "resolved" {
                return Ok(Some(Conversation {
                    id: conv.id,
                    contact_id,
                    inbox_id: conv.inbox_id,
                    status: conv.status,
                }));
            }
        }
        Ok(None)
    }

    async fn create_conversation(&self, contact_id: i64) -> Result<Conversation, CourierError> {
        let payload = CreateConversationRequest {
            inbox_id: self.inbox_id,
            contact_id,
            status: "open".to_string(),
        };

        let response = self
            .client
            .post(self.account_url("conversations"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| send_error("conversation create", e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(status_error("conversation create", status, &body));
        }

        decode_conversation(&body, contact_id).ok_or_else(|| {
            CourierError::helpdesk(format!(
                "failed to decode conversation response (no valid id found): {body}"
            ))
        })
    }

    async fn create_message_with_attachments(
        &self,
        url: String,
        message: &OutboundRemoteMessage,
    ) -> Result<i64, CourierError> {
        let mut form = Form::new()
            .text("content", message.content.clone())
            .text("message_type", message.direction.to_string())
            .text("private", "false");

        if let Some(ref key) = message.external_ref {
            form = form.text("source_id", key.as_str().to_string());
        }

        let mut recorded_audio_names: Vec<String> = Vec::new();
        for attachment in &message.attachments {
            let mime =
                attachments::normalize_attachment_mime(&attachment.file_name, &attachment.mime_type);
            if attachments::is_recorded_audio(&attachment.file_name, &mime)
                && !recorded_audio_names.contains(&attachment.file_name)
            {
                recorded_audio_names.push(attachment.file_name.clone());
            }

            debug!(
                file_name = attachment.file_name.as_str(),
                mime = mime.as_str(),
                "attachment prepared"
            );

            let part = Part::bytes(attachment.data.clone())
                .file_name(attachment.file_name.clone())
                .mime_str(&mime)
                .map_err(|e| CourierError::Helpdesk {
                    message: format!("invalid attachment MIME {mime}: {e}"),
                    source: Some(Box::new(e)),
                })?;
            form = form.part("attachments[]", part);
        }

        if !recorded_audio_names.is_empty() {
            debug!(names = ?recorded_audio_names, "marking audio attachments as recorded audio");
            let raw = serde_json::to_string(&recorded_audio_names)
                .map_err(|e| decode_error("recorded audio names", e))?;
            form = form.text("is_recorded_audio", raw);
        }

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| send_error("message create", e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(status_error("message create", status, &body));
        }

        let created: CreatedMessageResponse =
            serde_json::from_str(&body).map_err(|e| decode_error("message create", e))?;
        Ok(created.id)
    }
}

#[async_trait]
impl HelpdeskClient for HelpdeskApi {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn find_or_create_contact(
        &self,
        name: &str,
        identifier: &str,
        is_group: bool,
    ) -> Result<Contact, CourierError> {
        if let Some(mut contact) = self.find_contact(identifier, is_group).await? {
            if !name.is_empty() && contact.name != name {
                debug!(
                    old = contact.name.as_str(),
                    new = name,
                    "refreshing contact name"
                );
                match self.update_contact_name(contact.id, name).await {
                    Ok(()) => contact.name = name.to_string(),
                    Err(e) => warn!(error = %e, "failed to update contact name"),
                }
            }

            if contact.attributes.chat_id.is_none() {
                let attrs = ContactAttributes {
                    chat_id: Some(identifier.to_string()),
                    ..Default::default()
                };
                let platform_identifier = is_group.then_some(identifier);
                if let Err(e) = self
                    .update_contact_attributes(contact.id, platform_identifier, &attrs)
                    .await
                {
                    warn!(error = %e, "failed to backfill contact chat id");
                }
            }

            return Ok(contact);
        }

        match self.create_contact(name, identifier, is_group).await {
            Ok(contact) => Ok(contact),
            Err(e) => {
                // Lost a create race: the contact may exist now.
                if let Ok(Some(existing)) = self.find_contact(identifier, is_group).await {
                    return Ok(existing);
                }
                Err(e)
            }
        }
    }

    async fn update_contact_name(
        &self,
        contact_id: i64,
        name: &str,
    ) -> Result<(), CourierError> {
        let url = self.account_url(&format!("contacts/{contact_id}"));
        let response = self
            .client
            .put(&url)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .map_err(|e| send_error("contact update", e))?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("contact update", status, &body));
        }
        Ok(())
    }

    async fn update_contact_attributes(
        &self,
        contact_id: i64,
        identifier: Option<&str>,
        attributes: &ContactAttributes,
    ) -> Result<(), CourierError> {
        let mut payload = serde_json::Map::new();
        if let Some(identifier) = identifier {
            payload.insert("identifier".into(), identifier.into());
        }
        payload.insert(
            "custom_attributes".into(),
            serde_json::to_value(attributes).map_err(|e| decode_error("contact attributes", e))?,
        );

        let url = self.account_url(&format!("contacts/{contact_id}"));
        let response = self
            .client
            .put(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| send_error("contact attributes update", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("contact attributes update", status, &body));
        }
        Ok(())
    }

    async fn upload_contact_avatar(
        &self,
        contact_id: i64,
        image: &[u8],
    ) -> Result<(), CourierError> {
        let (mime, ext) = attachments::sniff_image(image);
        let part = Part::bytes(image.to_vec())
            .file_name(format!("profile{ext}"))
            .mime_str(mime)
            .map_err(|e| CourierError::Helpdesk {
                message: format!("invalid avatar MIME {mime}: {e}"),
                source: Some(Box::new(e)),
            })?;
        let form = Form::new().part("avatar", part);

        let url = self.account_url(&format!("contacts/{contact_id}"));
        let response = self
            .client
            .patch(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| send_error("avatar upload", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("avatar upload", status, &body));
        }
        Ok(())
    }

    async fn find_or_create_conversation(
        &self,
        contact_id: i64,
    ) -> Result<Conversation, CourierError> {
        match self.find_conversation(contact_id).await {
            Ok(Some(conv)) => return Ok(conv),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "conversation lookup failed, creating fresh"),
        }
        self.create_conversation(contact_id).await
    }

    async fn create_message(
        &self,
        message: &OutboundRemoteMessage,
    ) -> Result<i64, CourierError> {
        let url = self.account_url(&format!(
            "conversations/{}/messages",
            message.conversation_id
        ));

        if !message.attachments.is_empty() {
            return self.create_message_with_attachments(url, message).await;
        }

        let payload = CreateMessageRequest {
            content: message.content.clone(),
            message_type: message.direction.to_string(),
            private: false,
            source_id: message
                .external_ref
                .as_ref()
                .map(|k| k.as_str().to_string()),
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| send_error("message create", e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(status_error("message create", status, &body));
        }

        let created: CreatedMessageResponse =
            serde_json::from_str(&body).map_err(|e| decode_error("message create", e))?;
        Ok(created.id)
    }

    async fn delete_message(
        &self,
        conversation_id: i64,
        message_id: i64,
    ) -> Result<(), CourierError> {
        let url =
            self.account_url(&format!("conversations/{conversation_id}/messages/{message_id}"));
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| send_error("message delete", e))?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("message delete", status, &body));
        }
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: i64,
    ) -> Result<Vec<RemoteMessageRef>, CourierError> {
        let url = self.account_url(&format!("conversations/{conversation_id}/messages"));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| send_error("message list", e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(status_error("message list", status, &body));
        }

        let result: MessageListResponse =
            serde_json::from_str(&body).map_err(|e| decode_error("message list", e))?;
        Ok(result
            .payload
            .into_iter()
            .map(|m| RemoteMessageRef {
                id: m.id,
                external_ref: m.source_id.filter(|s| !s.is_empty()),
            })
            .collect())
    }
}

fn send_error(context: &str, e: reqwest::Error) -> CourierError {
    CourierError::Helpdesk {
        message: format!("{context} request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

fn status_error(context: &str, status: StatusCode, body: &str) -> CourierError {
    CourierError::helpdesk(format!("{context} failed: status {status} body {body}"))
}

fn decode_error(context: &str, e: serde_json::Error) -> CourierError {
    CourierError::Helpdesk {
        message: format!("failed to decode {context} response: {e}"),
        source: Some(Box::new(e)),
    }
}

/// The platform's contact responses come in three shapes depending on
/// endpoint and version: nested `payload.contact`, flat `payload`, or a bare
/// object. Accept the first one carrying a non-zero id.
fn decode_contact(body: &str) -> Option<Contact> {
    #[derive(serde::Deserialize)]
    struct Nested {
        payload: NestedInner,
    }
    #[derive(serde::Deserialize)]
    struct NestedInner {
        contact: Contact,
    }
    #[derive(serde::Deserialize)]
    struct Flat {
        payload: Contact,
    }

    if let Ok(nested) = serde_json::from_str::<Nested>(body)
        && nested.payload.contact.id != 0
    {
        return Some(nested.payload.contact);
    }
    if let Ok(flat) = serde_json::from_str::<Flat>(body)
        && flat.payload.id != 0
    {
        return Some(flat.payload);
    }
    if let Ok(contact) = serde_json::from_str::<Contact>(body)
        && contact.id != 0
    {
        return Some(contact);
    }
    None
}

fn decode_conversation(body: &str, contact_id: i64) -> Option<Conversation> {
    #[derive(serde::Deserialize)]
    struct Enveloped {
        payload: Conversation,
    }

    if let Ok(enveloped) = serde_json::from_str::<Enveloped>(body)
        && enveloped.payload.id != 0
    {
        let mut conv = enveloped.payload;
        conv.contact_id = contact_id;
        return Some(conv);
    }
    if let Ok(conv) = serde_json::from_str::<Conversation>(body)
        && conv.id != 0
    {
        let mut conv = conv;
        conv.contact_id = contact_id;
        return Some(conv);
    }
    None
}
