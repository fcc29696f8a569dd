// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message read/write operations.

use std::str::FromStr;

use courier_core::CourierError;
use courier_core::types::{MediaKind, MediaRef, MessageFilter, StoredMessage};
use rusqlite::params;

use crate::database::Database;
use crate::queries::{ts_from_sql, ts_to_sql};

const MESSAGE_COLUMNS: &str = "id, account_id, chat_id, sender, content, timestamp, is_from_me, \
     media_kind, media_url, media_file_name, media_key, file_sha256, file_enc_sha256, file_length";

/// Insert a new message row.
pub async fn insert_message(db: &Database, msg: &StoredMessage) -> Result<(), CourierError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            let (media_kind, media_url, media_file_name, media_key, file_sha256, file_enc_sha256, file_length) =
                match &msg.media {
                    Some(m) => (
                        Some(m.kind.to_string()),
                        Some(m.url.clone()),
                        m.file_name.clone(),
                        Some(m.media_key.clone()),
                        Some(m.file_sha256.clone()),
                        Some(m.file_enc_sha256.clone()),
                        m.file_length as i64,
                    ),
                    None => (None, None, None, None, None, None, 0),
                };
            conn.execute(
                "INSERT INTO messages (id, account_id, chat_id, sender, content, timestamp, is_from_me,
                                       media_kind, media_url, media_file_name, media_key,
                                       file_sha256, file_enc_sha256, file_length)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    msg.id,
                    msg.account_id,
                    msg.chat_id,
                    msg.sender,
                    msg.content,
                    ts_to_sql(&msg.timestamp),
                    msg.is_from_me,
                    media_kind,
                    media_url,
                    media_file_name,
                    media_key,
                    file_sha256,
                    file_enc_sha256,
                    file_length,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages matching the filter, ascending by timestamp.
pub async fn list_messages(
    db: &Database,
    filter: &MessageFilter,
) -> Result<Vec<StoredMessage>, CourierError> {
    let account_id = filter.account_id.clone();
    let chat_id = filter.chat_id.clone();
    let since = filter.since.as_ref().map(ts_to_sql);
    let until = filter.until.as_ref().map(ts_to_sql);
    let limit = filter.limit.map(|l| l as i64);

    db.connection()
        .call(move |conn| {
            let mut sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages \
                 WHERE account_id = :account AND chat_id = :chat"
            );
            if since.is_some() {
                sql.push_str(" AND timestamp > :since");
            }
            if until.is_some() {
                sql.push_str(" AND timestamp <= :until");
            }
            sql.push_str(" ORDER BY timestamp ASC");
            if limit.is_some() {
                sql.push_str(" LIMIT :limit");
            }

            let mut stmt = conn.prepare(&sql)?;
            let mut named: Vec<(&str, &dyn rusqlite::ToSql)> =
                vec![(":account", &account_id), (":chat", &chat_id)];
            if let Some(ref s) = since {
                named.push((":since", s));
            }
            if let Some(ref u) = until {
                named.push((":until", u));
            }
            if let Some(ref l) = limit {
                named.push((":limit", l));
            }

            let rows = stmt.query_map(named.as_slice(), row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<StoredMessage, rusqlite::Error> {
    let ts_raw: String = row.get(5)?;
    let media_kind_raw: Option<String> = row.get(7)?;

    let media = match media_kind_raw {
        Some(kind_raw) => {
            let kind = MediaKind::from_str(&kind_raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    7,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            let file_length: i64 = row.get(13)?;
            Some(MediaRef {
                kind,
                url: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
                file_name: row.get(9)?,
                media_key: row.get::<_, Option<Vec<u8>>>(10)?.unwrap_or_default(),
                file_sha256: row.get::<_, Option<Vec<u8>>>(11)?.unwrap_or_default(),
                file_enc_sha256: row.get::<_, Option<Vec<u8>>>(12)?.unwrap_or_default(),
                file_length: file_length as u64,
            })
        }
        None => None,
    };

    Ok(StoredMessage {
        id: row.get(0)?,
        account_id: row.get(1)?,
        chat_id: row.get(2)?,
        sender: row.get(3)?,
        content: row.get(4)?,
        timestamp: ts_from_sql(5, &ts_raw)?,
        is_from_me: row.get(6)?,
        media,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_msg(id: &str, ts: i64, content: &str) -> StoredMessage {
        StoredMessage {
            id: id.to_string(),
            account_id: "acct".to_string(),
            chat_id: "chat@host".to_string(),
            sender: "15551234567@host".to_string(),
            content: content.to_string(),
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            is_from_me: false,
            media: None,
        }
    }

    #[tokio::test]
    async fn insert_and_list_in_timestamp_order() {
        let (db, _dir) = setup_db().await;

        // Inserted out of order on purpose.
        insert_message(&db, &make_msg("m2", 1_700_000_200, "second"))
            .await
            .unwrap();
        insert_message(&db, &make_msg("m1", 1_700_000_100, "first"))
            .await
            .unwrap();
        insert_message(&db, &make_msg("m3", 1_700_000_300, "third"))
            .await
            .unwrap();

        let filter = MessageFilter {
            account_id: "acct".into(),
            chat_id: "chat@host".into(),
            ..Default::default()
        };
        let messages = list_messages(&db, &filter).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].id, "m1");
        assert_eq!(messages[2].id, "m3");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn since_bound_is_strict() {
        let (db, _dir) = setup_db().await;

        insert_message(&db, &make_msg("m1", 1_700_000_100, "old"))
            .await
            .unwrap();
        insert_message(&db, &make_msg("m2", 1_700_000_200, "new"))
            .await
            .unwrap();

        let filter = MessageFilter {
            account_id: "acct".into(),
            chat_id: "chat@host".into(),
            since: Some(Utc.timestamp_opt(1_700_000_100, 0).unwrap()),
            ..Default::default()
        };
        let messages = list_messages(&db, &filter).await.unwrap();
        assert_eq!(messages.len(), 1, "message at the bound must be excluded");
        assert_eq!(messages[0].id, "m2");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn limit_caps_result_size() {
        let (db, _dir) = setup_db().await;

        for i in 0..5 {
            insert_message(&db, &make_msg(&format!("m{i}"), 1_700_000_000 + i, "x"))
                .await
                .unwrap();
        }

        let filter = MessageFilter {
            account_id: "acct".into(),
            chat_id: "chat@host".into(),
            limit: Some(3),
            ..Default::default()
        };
        let messages = list_messages(&db, &filter).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].id, "m0");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn media_descriptor_round_trips() {
        let (db, _dir) = setup_db().await;

        let mut msg = make_msg("m1", 1_700_000_100, "photo caption");
        msg.media = Some(MediaRef {
            kind: MediaKind::Image,
            url: "https://cdn.example.com/blob/1".into(),
            file_name: Some("photo.jpg".into()),
            media_key: vec![1, 2, 3],
            file_sha256: vec![4, 5],
            file_enc_sha256: vec![6, 7],
            file_length: 2048,
        });
        insert_message(&db, &msg).await.unwrap();

        let filter = MessageFilter {
            account_id: "acct".into(),
            chat_id: "chat@host".into(),
            ..Default::default()
        };
        let messages = list_messages(&db, &filter).await.unwrap();
        let media = messages[0].media.as_ref().unwrap();
        assert_eq!(media.kind, MediaKind::Image);
        assert_eq!(media.file_name.as_deref(), Some("photo.jpg"));
        assert_eq!(media.media_key, vec![1, 2, 3]);
        assert_eq!(media.file_length, 2048);

        db.close().await.unwrap();
    }
}
