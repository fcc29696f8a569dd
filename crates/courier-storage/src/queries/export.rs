// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Export bookkeeping: watermarks and the exported-message dedup table.

use chrono::{DateTime, Utc};
use courier_core::CourierError;
use courier_core::types::IdempotencyKey;
use rusqlite::params;

use crate::database::Database;
use crate::queries::{ts_from_sql, ts_to_sql};

/// Watermark of the latest successfully exported message, if any.
pub async fn get_watermark(
    db: &Database,
    account_id: &str,
    chat_id: &str,
) -> Result<Option<DateTime<Utc>>, CourierError> {
    let account_id = account_id.to_string();
    let chat_id = chat_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT last_exported_at FROM export_state
                 WHERE account_id = ?1 AND chat_id = ?2",
                params![account_id, chat_id],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(raw) => Ok(Some(ts_from_sql(0, &raw)?)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Advance the watermark for a chat (upsert).
pub async fn set_watermark(
    db: &Database,
    account_id: &str,
    chat_id: &str,
    exported_at: DateTime<Utc>,
) -> Result<(), CourierError> {
    let account_id = account_id.to_string();
    let chat_id = chat_id.to_string();
    let exported_at = ts_to_sql(&exported_at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO export_state (account_id, chat_id, last_exported_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (account_id, chat_id)
                 DO UPDATE SET last_exported_at = excluded.last_exported_at,
                               updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![account_id, chat_id, exported_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Has this idempotency key already been exported for the chat?
pub async fn is_key_exported(
    db: &Database,
    account_id: &str,
    chat_id: &str,
    key: &IdempotencyKey,
) -> Result<bool, CourierError> {
    let account_id = account_id.to_string();
    let chat_id = chat_id.to_string();
    let key = key.as_str().to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT 1 FROM exported_messages
                 WHERE account_id = ?1 AND chat_id = ?2 AND message_key = ?3
                 LIMIT 1",
                params![account_id, chat_id, key],
                |row| row.get::<_, i64>(0),
            );
            match result {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record key -> remote message id. Insert-if-absent: racing callers both
/// succeed, the first row wins.
pub async fn mark_key_exported(
    db: &Database,
    account_id: &str,
    chat_id: &str,
    key: &IdempotencyKey,
    remote_message_id: i64,
) -> Result<(), CourierError> {
    let account_id = account_id.to_string();
    let chat_id = chat_id.to_string();
    let key = key.as_str().to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO exported_messages
                     (account_id, chat_id, message_key, remote_message_id)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (account_id, chat_id, message_key)
                 DO NOTHING",
                params![account_id, chat_id, key, remote_message_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Reverse index: was this remote message created by us?
pub async fn is_remote_message_ours(
    db: &Database,
    remote_message_id: i64,
) -> Result<bool, CourierError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT 1 FROM exported_messages
                 WHERE remote_message_id = ?1
                 LIMIT 1",
                params![remote_message_id],
                |row| row.get::<_, i64>(0),
            );
            match result {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
