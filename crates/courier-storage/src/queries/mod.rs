// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity.

pub mod chats;
pub mod export;
pub mod messages;

use chrono::{DateTime, SecondsFormat, Utc};

/// Canonical SQL text form of a timestamp. Millisecond precision, UTC `Z`
/// suffix, lexicographically ordered.
pub(crate) fn ts_to_sql(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a timestamp read from a row, surfacing failures as column
/// conversion errors.
pub(crate) fn ts_from_sql(idx: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}
