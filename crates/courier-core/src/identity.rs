// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat identifier helpers.
//!
//! Identifiers follow the messaging platform's addressing scheme: group chats
//! end in `@group`, direct chats are `<digits>@<host>` with an optional
//! `:device` suffix, and bare phone numbers appear in helpdesk-originated
//! payloads.

/// Suffix marking a group chat identifier.
pub const GROUP_SUFFIX: &str = "@group";

/// Returns true if the identifier addresses a group chat.
pub fn is_group_id(id: &str) -> bool {
    id.ends_with(GROUP_SUFFIX)
}

/// Extracts the bare phone/user part of an identifier: everything before the
/// `@` host and before any `:device` suffix.
pub fn phone_from_id(id: &str) -> String {
    let bare = id.split('@').next().unwrap_or(id);
    let bare = bare.split(':').next().unwrap_or(bare);
    bare.to_string()
}

/// Normalizes an identifier or raw phone number to E.164-ish form: leading
/// `+` followed by digits only. Returns an empty string if no digits remain.
pub fn normalize_phone_e164(raw: &str) -> String {
    let digits: String = phone_from_id(raw)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        String::new()
    } else {
        format!("+{digits}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_detection() {
        assert!(is_group_id("120363abc@group"));
        assert!(!is_group_id("15551234567@host"));
        assert!(!is_group_id("15551234567"));
    }

    #[test]
    fn phone_extraction_strips_host_and_device() {
        assert_eq!(phone_from_id("15551234567@host"), "15551234567");
        assert_eq!(phone_from_id("15551234567:2@host"), "15551234567");
        assert_eq!(phone_from_id("15551234567"), "15551234567");
    }

    #[test]
    fn e164_normalization() {
        assert_eq!(normalize_phone_e164("15551234567@host"), "+15551234567");
        assert_eq!(normalize_phone_e164("+1 (555) 123-4567"), "+15551234567");
        assert_eq!(normalize_phone_e164("no-digits"), "");
    }
}
