// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging platform client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::types::{MediaRef, RemoteAttachment};
use courier_core::{CourierError, MessengerClient};

/// In-memory [`MessengerClient`].
///
/// Media bytes are served by URL; outbound sends are captured for
/// assertions. Failure toggles cover the download and send paths.
pub struct MockMessenger {
    profile_urls: Mutex<HashMap<String, String>>,
    media: Mutex<HashMap<String, Vec<u8>>>,
    group_names: Mutex<HashMap<String, String>>,
    group_name_calls: AtomicUsize,
    sent_texts: Mutex<Vec<(String, String)>>,
    sent_attachments: Mutex<Vec<(String, RemoteAttachment, String)>>,
    fail_media_download: AtomicBool,
    fail_send: AtomicBool,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self {
            profile_urls: Mutex::new(HashMap::new()),
            media: Mutex::new(HashMap::new()),
            group_names: Mutex::new(HashMap::new()),
            group_name_calls: AtomicUsize::new(0),
            sent_texts: Mutex::new(Vec::new()),
            sent_attachments: Mutex::new(Vec::new()),
            fail_media_download: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
        }
    }

    pub async fn set_profile_url(&self, identifier: &str, url: &str) {
        self.profile_urls
            .lock()
            .await
            .insert(identifier.to_string(), url.to_string());
    }

    pub async fn set_media(&self, url: &str, bytes: Vec<u8>) {
        self.media.lock().await.insert(url.to_string(), bytes);
    }

    pub async fn set_group_name(&self, group_id: &str, name: &str) {
        self.group_names
            .lock()
            .await
            .insert(group_id.to_string(), name.to_string());
    }

    pub fn fail_media_download(&self, fail: bool) {
        self.fail_media_download.store(fail, Ordering::SeqCst);
    }

    pub fn fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    pub fn group_name_calls(&self) -> usize {
        self.group_name_calls.load(Ordering::SeqCst)
    }

    pub async fn sent_texts(&self) -> Vec<(String, String)> {
        self.sent_texts.lock().await.clone()
    }

    pub async fn sent_attachments(&self) -> Vec<(String, RemoteAttachment, String)> {
        self.sent_attachments.lock().await.clone()
    }
}

impl Default for MockMessenger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessengerClient for MockMessenger {
    async fn profile_picture_url(
        &self,
        identifier: &str,
    ) -> Result<Option<String>, CourierError> {
        Ok(self.profile_urls.lock().await.get(identifier).cloned())
    }

    async fn download_media(&self, media: &MediaRef) -> Result<Vec<u8>, CourierError> {
        if self.fail_media_download.load(Ordering::SeqCst) {
            return Err(CourierError::messenger("injected media download failure"));
        }
        self.media
            .lock()
            .await
            .get(&media.url)
            .cloned()
            .ok_or_else(|| CourierError::messenger(format!("no media at {}", media.url)))
    }

    async fn group_name(&self, group_id: &str) -> Result<Option<String>, CourierError> {
        self.group_name_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.group_names.lock().await.get(group_id).cloned())
    }

    async fn send_text(&self, destination: &str, text: &str) -> Result<(), CourierError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(CourierError::messenger("injected send failure"));
        }
        self.sent_texts
            .lock()
            .await
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_attachment(
        &self,
        destination: &str,
        attachment: &RemoteAttachment,
        caption: &str,
    ) -> Result<(), CourierError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(CourierError::messenger("injected send failure"));
        }
        self.sent_attachments.lock().await.push((
            destination.to_string(),
            attachment.clone(),
            caption.to_string(),
        ));
        Ok(())
    }
}
