// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat CRUD operations.

use courier_core::CourierError;
use courier_core::types::Chat;
use rusqlite::params;

use crate::database::Database;
use crate::queries::{ts_from_sql, ts_to_sql};

/// Insert or refresh a chat row.
pub async fn upsert_chat(db: &Database, chat: &Chat) -> Result<(), CourierError> {
    let chat = chat.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chats (account_id, chat_id, name, last_message_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (account_id, chat_id)
                 DO UPDATE SET name = excluded.name,
                               last_message_at = excluded.last_message_at,
                               updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    chat.account_id,
                    chat.id,
                    chat.name,
                    chat.last_message_at.as_ref().map(ts_to_sql),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All chats for an account, most recently active first.
pub async fn list_chats(db: &Database, account_id: &str) -> Result<Vec<Chat>, CourierError> {
    let account_id = account_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT account_id, chat_id, name, last_message_at
                 FROM chats WHERE account_id = ?1
                 ORDER BY last_message_at IS NULL, last_message_at DESC",
            )?;
            let rows = stmt.query_map(params![account_id], |row| {
                let last_raw: Option<String> = row.get(3)?;
                let last_message_at = match last_raw {
                    Some(raw) => Some(ts_from_sql(3, &raw)?),
                    None => None,
                };
                Ok(Chat {
                    account_id: row.get(0)?,
                    id: row.get(1)?,
                    name: row.get(2)?,
                    last_message_at,
                })
            })?;
            let mut chats = Vec::new();
            for row in rows {
                chats.push(row?);
            }
            Ok(chats)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
