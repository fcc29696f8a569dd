// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment MIME handling for helpdesk uploads.
//!
//! The platform renders audio with an inline player only when the part is
//! flagged as recorded audio and carries an audio MIME type it recognizes, so
//! uploads normalize types before submission.

/// Strip parameters and fold aliases onto canonical MIME types.
pub fn canonicalize_mime_type(mime_type: &str) -> String {
    let mut normalized = mime_type.trim().to_ascii_lowercase();
    if let Some(semi) = normalized.find(';') {
        normalized.truncate(semi);
        normalized = normalized.trim_end().to_string();
    }
    match normalized.as_str() {
        "application/ogg" | "audio/opus" => "audio/ogg".to_string(),
        "audio/x-wav" => "audio/wav".to_string(),
        _ => normalized,
    }
}

/// Audio MIME type derived from a file extension, if it is a known audio one.
pub fn audio_mime_for_name(file_name: &str) -> Option<&'static str> {
    match extension(file_name).as_str() {
        "mp3" => Some("audio/mpeg"),
        "m4a" | "mp4" => Some("audio/mp4"),
        "aac" => Some("audio/aac"),
        "wav" => Some("audio/wav"),
        "webm" => Some("audio/webm"),
        "amr" => Some("audio/amr"),
        "flac" => Some("audio/flac"),
        "oga" | "ogg" | "opus" => Some("audio/ogg"),
        _ => None,
    }
}

/// Whether the part should be flagged as recorded audio for the platform.
pub fn is_recorded_audio(file_name: &str, mime_type: &str) -> bool {
    canonicalize_mime_type(mime_type).starts_with("audio/")
        || audio_mime_for_name(file_name).is_some()
}

/// Final MIME type for an attachment part.
///
/// Audio parts get an extension-derived type when available (the declared one
/// is often a container type the platform rejects); everything else keeps the
/// canonical declared type, falling back to octet-stream.
pub fn normalize_attachment_mime(file_name: &str, mime_type: &str) -> String {
    let canonical = canonicalize_mime_type(mime_type);
    if is_recorded_audio(file_name, &canonical) {
        if let Some(by_ext) = audio_mime_for_name(file_name) {
            return by_ext.to_string();
        }
        if canonical.starts_with("audio/") {
            return canonical;
        }
        return "audio/ogg".to_string();
    }
    if canonical.is_empty() {
        "application/octet-stream".to_string()
    } else {
        canonical
    }
}

/// Sniff an image content type from magic bytes. Avatar uploads only ever see
/// JPEG/PNG/GIF/WEBP from the messaging platform.
pub fn sniff_image(data: &[u8]) -> (&'static str, &'static str) {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        ("image/png", ".png")
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ("image/jpeg", ".jpg")
    } else if data.starts_with(b"GIF8") {
        ("image/gif", ".gif")
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        ("image/webp", ".webp")
    } else {
        ("image/jpeg", ".jpg")
    }
}

fn extension(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}
