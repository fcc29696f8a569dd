// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpdesk platform client interface (contact/conversation/message CRUD).

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::{
    Contact, ContactAttributes, Conversation, OutboundRemoteMessage, RemoteMessageRef,
};

#[async_trait]
pub trait HelpdeskClient: Send + Sync {
    /// Whether the client has everything it needs to talk to the platform.
    /// Engine jobs fail fast with a configuration error when this is false.
    fn is_configured(&self) -> bool;

    /// Find a contact by identifier, creating it if absent. Idempotent from
    /// the caller's perspective; the engine serializes calls per identifier.
    async fn find_or_create_contact(
        &self,
        name: &str,
        identifier: &str,
        is_group: bool,
    ) -> Result<Contact, CourierError>;

    async fn update_contact_name(&self, contact_id: i64, name: &str)
    -> Result<(), CourierError>;

    /// Merge custom attributes onto the contact. When `identifier` is set the
    /// platform-level identifier field is updated as well (group and
    /// identifier-addressed contacts only).
    async fn update_contact_attributes(
        &self,
        contact_id: i64,
        identifier: Option<&str>,
        attributes: &ContactAttributes,
    ) -> Result<(), CourierError>;

    async fn upload_contact_avatar(
        &self,
        contact_id: i64,
        image: &[u8],
    ) -> Result<(), CourierError>;

    /// Reuse any unresolved conversation for the contact in the configured
    /// inbox, creating one if none exists.
    async fn find_or_create_conversation(
        &self,
        contact_id: i64,
    ) -> Result<Conversation, CourierError>;

    /// Create a message in a conversation, returning the remote message id.
    async fn create_message(
        &self,
        message: &OutboundRemoteMessage,
    ) -> Result<i64, CourierError>;

    async fn delete_message(
        &self,
        conversation_id: i64,
        message_id: i64,
    ) -> Result<(), CourierError>;

    /// All messages currently in the conversation, with their external
    /// reference tags.
    async fn list_messages(
        &self,
        conversation_id: i64,
    ) -> Result<Vec<RemoteMessageRef>, CourierError>;
}
