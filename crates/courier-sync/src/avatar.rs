// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conditional, hash-gated profile picture propagation.
//!
//! The content hash of the last uploaded avatar lives on the remote contact
//! as a custom attribute. A new hash is stamped only after a successful
//! upload, never before, so a failed upload can't leave the contact looking
//! permanently up to date.

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use courier_core::identity::{is_group_id, phone_from_id};
use courier_core::types::{Contact, ContactAttributes};
use courier_core::CourierError;

use crate::SyncEngine;

impl SyncEngine {
    /// Bring the remote contact's avatar in line with the messaging
    /// platform's current profile picture.
    ///
    /// No picture (or a failed picture lookup) is a successful no-op: the
    /// last-checked stamp still advances. Download and upload failures
    /// propagate; callers run this in the background and log.
    pub async fn sync_contact_avatar(
        &self,
        identifier: &str,
        name_hint: &str,
    ) -> Result<(), CourierError> {
        let is_group = is_group_id(identifier);
        let name = if name_hint.is_empty() {
            phone_from_id(identifier)
        } else {
            name_hint.to_string()
        };

        // Shares the identifier shard with contact resolution so a racing
        // thread resolution can't create a duplicate contact underneath us.
        let _guard = self.locks.lock(identifier).await;

        let contact = self
            .helpdesk
            .find_or_create_contact(&name, identifier, is_group)
            .await?;

        let picture_url = match self.messenger.profile_picture_url(identifier).await {
            Ok(Some(url)) if !url.is_empty() => url,
            Ok(_) => {
                debug!(identifier, "no profile picture set");
                self.stamp_avatar_checked(&contact, identifier, None).await;
                return Ok(());
            }
            Err(e) => {
                debug!(identifier, error = %e, "profile picture lookup failed");
                self.stamp_avatar_checked(&contact, identifier, None).await;
                return Ok(());
            }
        };

        let image = self.download_avatar(&picture_url).await?;
        if image.is_empty() {
            self.stamp_avatar_checked(&contact, identifier, None).await;
            return Ok(());
        }

        let new_hash = hex::encode(Sha256::digest(&image));
        if contact.attributes.avatar_hash.as_deref() == Some(new_hash.as_str()) {
            debug!(identifier, "avatar unchanged");
            self.stamp_avatar_checked(&contact, identifier, None).await;
            return Ok(());
        }

        self.helpdesk
            .upload_contact_avatar(contact.id, &image)
            .await?;

        // Upload confirmed; now the hash and the checked stamp land together.
        self.stamp_avatar_checked(&contact, identifier, Some(new_hash))
            .await;

        info!(identifier, contact_id = contact.id, "avatar updated");
        Ok(())
    }

    /// Stamp `avatar_checked_at` (and optionally a fresh hash) on the remote
    /// contact. Attribute write failures are logged, not propagated: the
    /// worst case is a redundant re-check next time.
    async fn stamp_avatar_checked(
        &self,
        contact: &Contact,
        identifier: &str,
        new_hash: Option<String>,
    ) {
        let attributes = ContactAttributes {
            chat_id: Some(identifier.to_string()),
            avatar_hash: new_hash.or_else(|| contact.attributes.avatar_hash.clone()),
            avatar_checked_at: Some(Utc::now()),
            extra: Default::default(),
        };
        let platform_identifier = is_group_id(identifier).then_some(identifier);

        if let Err(e) = self
            .helpdesk
            .update_contact_attributes(contact.id, platform_identifier, &attributes)
            .await
        {
            warn!(identifier, error = %e, "failed to stamp avatar attributes");
        }
    }

    async fn download_avatar(&self, url: &str) -> Result<Vec<u8>, CourierError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| CourierError::Messenger {
                message: format!("failed to download profile picture: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CourierError::messenger(format!(
                "failed to download profile picture: status {status}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CourierError::Messenger {
                message: format!("failed to read profile picture data: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(bytes.to_vec())
    }
}
