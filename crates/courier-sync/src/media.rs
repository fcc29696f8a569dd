// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment preparation: media download, staging, and best-effort
//! transcoding.
//!
//! Failure anywhere in this path degrades the message to a text placeholder
//! on the caller's side; it never aborts an export.

use std::path::Path;

use tracing::{debug, warn};

use courier_core::types::{Attachment, MediaKind, MediaRef};
use courier_core::CourierError;

use crate::SyncEngine;

/// Audio formats the helpdesk accepts as-is; everything else goes through the
/// transcoder.
const PASSTHROUGH_AUDIO_EXTENSIONS: &[&str] = &[".aac", ".m4a", ".mp3", ".wav"];

/// File extension for a media payload: the original file's extension when
/// known, a kind-based fallback otherwise.
pub fn extension_for_kind(kind: MediaKind, file_name: Option<&str>) -> String {
    if let Some(name) = file_name
        && let Some(ext) = Path::new(name).extension()
    {
        return format!(".{}", ext.to_string_lossy().to_ascii_lowercase());
    }
    match kind {
        MediaKind::Image => ".jpg",
        MediaKind::Video => ".mp4",
        MediaKind::Audio | MediaKind::Voice => ".ogg",
        MediaKind::Document => ".bin",
        MediaKind::Sticker => ".webp",
    }
    .to_string()
}

/// MIME type for an extension produced by [`extension_for_kind`].
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.trim_start_matches('.') {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "wav" => "audio/wav",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

pub(crate) fn is_passthrough_audio(ext: &str) -> bool {
    PASSTHROUGH_AUDIO_EXTENSIONS.contains(&ext)
}

impl SyncEngine {
    /// Download a message's media and package it for upload.
    ///
    /// Audio outside the passthrough formats is transcoded when a transcoder
    /// is wired in; a transcode failure falls back to the original bytes.
    pub(crate) async fn prepare_attachment(
        &self,
        media: &MediaRef,
    ) -> Result<Attachment, CourierError> {
        if media.url.is_empty() || media.media_key.is_empty() {
            return Err(CourierError::Media("missing media URL or key".into()));
        }

        let data = self.messenger.download_media(media).await?;
        let ext = extension_for_kind(media.kind, media.file_name.as_deref());
        let file_name = media
            .file_name
            .clone()
            .unwrap_or_else(|| format!("media{ext}"));

        let is_audio = matches!(media.kind, MediaKind::Audio | MediaKind::Voice);
        if is_audio
            && !is_passthrough_audio(&ext)
            && let Some(transcoder) = self.transcoder.clone()
        {
            match self.transcode_bytes(transcoder.as_ref(), &data, &ext).await {
                Ok(attachment) => return Ok(attachment),
                Err(e) => {
                    warn!(error = %e, file_name = file_name.as_str(),
                        "audio transcode failed, uploading original");
                }
            }
        }

        Ok(Attachment {
            mime_type: mime_for_extension(&ext).to_string(),
            file_name,
            data,
        })
    }

    /// Stage bytes to a temp file, run the external transcoder, read the
    /// converted output back.
    async fn transcode_bytes(
        &self,
        transcoder: &dyn courier_core::Transcoder,
        data: &[u8],
        ext: &str,
    ) -> Result<Attachment, CourierError> {
        let dir = tempfile::tempdir()
            .map_err(|e| CourierError::Media(format!("failed to create temp dir: {e}")))?;
        let input = dir.path().join(format!("input{ext}"));
        tokio::fs::write(&input, data)
            .await
            .map_err(|e| CourierError::Media(format!("failed to stage media: {e}")))?;

        let output = transcoder.transcode(&input).await?;
        let converted = tokio::fs::read(&output)
            .await
            .map_err(|e| CourierError::Media(format!("failed to read transcoded media: {e}")))?;

        let file_name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".to_string());
        let out_ext = extension_for_kind(MediaKind::Audio, Some(&file_name));

        // The transcoder may write outside our staging dir; clean up its output.
        if output.parent() != Some(dir.path()) {
            let _ = tokio::fs::remove_file(&output).await;
        }

        debug!(file_name = file_name.as_str(), "audio transcoded");
        Ok(Attachment {
            mime_type: mime_for_extension(&out_ext).to_string(),
            file_name,
            data: converted,
        })
    }
}
