// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock helpdesk platform with call recording.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::types::{
    Contact, ContactAttributes, Conversation, MessageDirection, OutboundRemoteMessage,
    RemoteMessageRef,
};
use courier_core::{CourierError, HelpdeskClient};

/// A message the mock accepted, captured for assertions.
#[derive(Debug, Clone)]
pub struct CreatedRemoteMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub content: String,
    pub direction: MessageDirection,
    pub attachment_count: usize,
    pub external_ref: Option<String>,
}

/// In-memory [`HelpdeskClient`].
///
/// Contacts and conversations are created on demand and deduplicated by
/// identifier, like the real platform with its uniqueness constraints.
/// Created/deleted messages, avatar uploads, and attribute updates are all
/// captured.
pub struct MockHelpdesk {
    configured: AtomicBool,
    next_id: AtomicI64,
    contacts: Mutex<Vec<Contact>>,
    conversations: Mutex<Vec<Conversation>>,
    /// Current remote thread content: seeded refs plus created messages.
    thread: Mutex<Vec<(i64, RemoteMessageRef)>>,
    created: Mutex<Vec<CreatedRemoteMessage>>,
    deleted: Mutex<Vec<(i64, i64)>>,
    avatar_uploads: Mutex<Vec<(i64, Vec<u8>)>>,
    attribute_updates: Mutex<Vec<(i64, ContactAttributes)>>,
    fail_message_create: AtomicBool,
    fail_avatar_upload: AtomicBool,
}

impl MockHelpdesk {
    pub fn new() -> Self {
        Self {
            configured: AtomicBool::new(true),
            next_id: AtomicI64::new(1),
            contacts: Mutex::new(Vec::new()),
            conversations: Mutex::new(Vec::new()),
            thread: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            avatar_uploads: Mutex::new(Vec::new()),
            attribute_updates: Mutex::new(Vec::new()),
            fail_message_create: AtomicBool::new(false),
            fail_avatar_upload: AtomicBool::new(false),
        }
    }

    pub fn set_configured(&self, configured: bool) {
        self.configured.store(configured, Ordering::SeqCst);
    }

    pub fn fail_message_create(&self, fail: bool) {
        self.fail_message_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_avatar_upload(&self, fail: bool) {
        self.fail_avatar_upload.store(fail, Ordering::SeqCst);
    }

    fn alloc_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Seed a contact as if it already existed on the platform.
    pub async fn seed_contact(&self, contact: Contact) {
        self.contacts.lock().await.push(contact);
    }

    /// Seed a message into a conversation's thread, as if created earlier.
    pub async fn seed_remote_message(
        &self,
        conversation_id: i64,
        message_id: i64,
        external_ref: Option<&str>,
    ) {
        self.thread.lock().await.push((
            conversation_id,
            RemoteMessageRef {
                id: message_id,
                external_ref: external_ref.map(String::from),
            },
        ));
    }

    pub async fn contact_count(&self) -> usize {
        self.contacts.lock().await.len()
    }

    pub async fn contact_by_identifier(&self, identifier: &str) -> Option<Contact> {
        self.contacts
            .lock()
            .await
            .iter()
            .find(|c| c.attributes.chat_id.as_deref() == Some(identifier))
            .cloned()
    }

    pub async fn created_messages(&self) -> Vec<CreatedRemoteMessage> {
        self.created.lock().await.clone()
    }

    pub async fn created_count(&self) -> usize {
        self.created.lock().await.len()
    }

    pub async fn clear_created(&self) {
        self.created.lock().await.clear();
    }

    pub async fn deleted_messages(&self) -> Vec<(i64, i64)> {
        self.deleted.lock().await.clone()
    }

    pub async fn avatar_uploads(&self) -> Vec<(i64, Vec<u8>)> {
        self.avatar_uploads.lock().await.clone()
    }

    pub async fn attribute_updates(&self) -> Vec<(i64, ContactAttributes)> {
        self.attribute_updates.lock().await.clone()
    }
}

impl Default for MockHelpdesk {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HelpdeskClient for MockHelpdesk {
    fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }

    async fn find_or_create_contact(
        &self,
        name: &str,
        identifier: &str,
        is_group: bool,
    ) -> Result<Contact, CourierError> {
        let mut contacts = self.contacts.lock().await;
        if let Some(contact) = contacts
            .iter_mut()
            .find(|c| c.attributes.chat_id.as_deref() == Some(identifier))
        {
            if !name.is_empty() && contact.name != name {
                contact.name = name.to_string();
            }
            return Ok(contact.clone());
        }

        let contact = Contact {
            id: self.alloc_id(),
            name: name.to_string(),
            identifier: is_group.then(|| identifier.to_string()),
            phone_number: (!is_group).then(|| identifier.to_string()),
            attributes: ContactAttributes {
                chat_id: Some(identifier.to_string()),
                ..Default::default()
            },
        };
        contacts.push(contact.clone());
        Ok(contact)
    }

    async fn update_contact_name(
        &self,
        contact_id: i64,
        name: &str,
    ) -> Result<(), CourierError> {
        let mut contacts = self.contacts.lock().await;
        if let Some(contact) = contacts.iter_mut().find(|c| c.id == contact_id) {
            contact.name = name.to_string();
        }
        Ok(())
    }

    async fn update_contact_attributes(
        &self,
        contact_id: i64,
        _identifier: Option<&str>,
        attributes: &ContactAttributes,
    ) -> Result<(), CourierError> {
        self.attribute_updates
            .lock()
            .await
            .push((contact_id, attributes.clone()));

        let mut contacts = self.contacts.lock().await;
        if let Some(contact) = contacts.iter_mut().find(|c| c.id == contact_id) {
            if attributes.chat_id.is_some() {
                contact.attributes.chat_id = attributes.chat_id.clone();
            }
            if attributes.avatar_hash.is_some() {
                contact.attributes.avatar_hash = attributes.avatar_hash.clone();
            }
            if attributes.avatar_checked_at.is_some() {
                contact.attributes.avatar_checked_at = attributes.avatar_checked_at;
            }
        }
        Ok(())
    }

    async fn upload_contact_avatar(
        &self,
        contact_id: i64,
        image: &[u8],
    ) -> Result<(), CourierError> {
        if self.fail_avatar_upload.load(Ordering::SeqCst) {
            return Err(CourierError::helpdesk("injected avatar upload failure"));
        }
        self.avatar_uploads
            .lock()
            .await
            .push((contact_id, image.to_vec()));
        Ok(())
    }

    async fn find_or_create_conversation(
        &self,
        contact_id: i64,
    ) -> Result<Conversation, CourierError> {
        let mut conversations = self.conversations.lock().await;
        if let Some(conv) = conversations
            .iter()
            .find(|c| c.contact_id == contact_id && c.status != "resolved")
        {
            return Ok(conv.clone());
        }
        let conv = Conversation {
            id: self.alloc_id(),
            contact_id,
            inbox_id: 1,
            status: "open".to_string(),
        };
        conversations.push(conv.clone());
        Ok(conv)
    }

    async fn create_message(
        &self,
        message: &OutboundRemoteMessage,
    ) -> Result<i64, CourierError> {
        if self.fail_message_create.load(Ordering::SeqCst) {
            return Err(CourierError::helpdesk("injected message create failure"));
        }
        let id = self.alloc_id();
        self.created.lock().await.push(CreatedRemoteMessage {
            id,
            conversation_id: message.conversation_id,
            content: message.content.clone(),
            direction: message.direction,
            attachment_count: message.attachments.len(),
            external_ref: message.external_ref.as_ref().map(|k| k.as_str().to_string()),
        });
        self.thread.lock().await.push((
            message.conversation_id,
            RemoteMessageRef {
                id,
                external_ref: message.external_ref.as_ref().map(|k| k.as_str().to_string()),
            },
        ));
        Ok(id)
    }

    async fn delete_message(
        &self,
        conversation_id: i64,
        message_id: i64,
    ) -> Result<(), CourierError> {
        self.deleted
            .lock()
            .await
            .push((conversation_id, message_id));
        self.thread
            .lock()
            .await
            .retain(|(conv, m)| !(*conv == conversation_id && m.id == message_id));
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: i64,
    ) -> Result<Vec<RemoteMessageRef>, CourierError> {
        Ok(self
            .thread
            .lock()
            .await
            .iter()
            .filter(|(conv, _)| *conv == conversation_id)
            .map(|(_, m)| m.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn contacts_dedupe_by_identifier() {
        let helpdesk = MockHelpdesk::new();
        let a = helpdesk
            .find_or_create_contact("Alice", "a@host", false)
            .await
            .unwrap();
        let b = helpdesk
            .find_or_create_contact("Alice", "a@host", false)
            .await
            .unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(helpdesk.contact_count().await, 1);
    }

    #[tokio::test]
    async fn created_messages_join_the_thread() {
        let helpdesk = MockHelpdesk::new();
        let contact = helpdesk
            .find_or_create_contact("Alice", "a@host", false)
            .await
            .unwrap();
        let conv = helpdesk.find_or_create_conversation(contact.id).await.unwrap();

        let id = helpdesk
            .create_message(&OutboundRemoteMessage {
                conversation_id: conv.id,
                content: "hi".into(),
                direction: MessageDirection::Incoming,
                attachments: vec![],
                external_ref: Some(courier_core::IdempotencyKey("k1".into())),
            })
            .await
            .unwrap();

        let thread = helpdesk.list_messages(conv.id).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].id, id);
        assert_eq!(thread[0].external_ref.as_deref(), Some("k1"));

        helpdesk.delete_message(conv.id, id).await.unwrap();
        assert!(helpdesk.list_messages(conv.id).await.unwrap().is_empty());
    }
}
