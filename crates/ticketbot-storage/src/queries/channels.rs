// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel operations.

use rusqlite::params;
use ticketbot_core::{ChannelRecord, TicketbotError};

use crate::database::Database;
use crate::queries::{json_column, optional, parse_column};

/// Insert or replace a channel definition.
pub async fn upsert_channel(db: &Database, channel: &ChannelRecord) -> Result<(), TicketbotError> {
    let channel = channel.clone();
    let settings = channel.settings.to_string();
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO channels (id, name, platform, credential_id, question_template_id,
                                   rating_template_id, settings)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                platform = excluded.platform,
                credential_id = excluded.credential_id,
                question_template_id = excluded.question_template_id,
                rating_template_id = excluded.rating_template_id,
                settings = excluded.settings",
            params![
                channel.id,
                channel.name,
                channel.platform.to_string(),
                channel.credential_id,
                channel.question_template_id,
                channel.rating_template_id,
                settings,
            ],
        )?;
        Ok::<_, rusqlite::Error>(())
    })
    .await
}

/// Get a channel by ID.
pub async fn get_channel(db: &Database, id: &str) -> Result<Option<ChannelRecord>, TicketbotError> {
    let id = id.to_string();
    db.call(move |conn| {
        optional(conn.query_row(
            "SELECT id, name, platform, credential_id, question_template_id,
                    rating_template_id, settings
             FROM channels WHERE id = ?1",
            params![id],
            |row| {
                Ok(ChannelRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    platform: parse_column(row, 2)?,
                    credential_id: row.get(3)?,
                    question_template_id: row.get(4)?,
                    rating_template_id: row.get(5)?,
                    settings: json_column(row, 6)?,
                })
            },
        ))
    })
    .await
}

/// Point a channel at different questionnaire and rating templates.
pub async fn set_channel_templates(
    db: &Database,
    id: &str,
    question_template_id: Option<&str>,
    rating_template_id: Option<&str>,
) -> Result<(), TicketbotError> {
    let channel_id = id.to_string();
    let question = question_template_id.map(str::to_string);
    let rating = rating_template_id.map(str::to_string);
    let updated = db
        .call(move |conn| {
            conn.execute(
                "UPDATE channels SET question_template_id = ?1, rating_template_id = ?2
                 WHERE id = ?3",
                params![question, rating, channel_id],
            )
        })
        .await?;
    if updated == 0 {
        return Err(TicketbotError::NotFound {
            entity: "channel",
            id: id.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{make_channel, setup_db};
    use ticketbot_core::Platform;

    #[tokio::test]
    async fn upsert_and_get_channel_roundtrips() {
        let (db, _dir) = setup_db().await;
        let mut channel = make_channel("ch-1", None);
        channel.platform = Platform::Slack;
        channel.settings = serde_json::json!({"lang": "en"});

        upsert_channel(&db, &channel).await.unwrap();
        let stored = get_channel(&db, "ch-1").await.unwrap().unwrap();
        assert_eq!(stored, channel);

        channel.name = "Renamed".to_string();
        upsert_channel(&db, &channel).await.unwrap();
        let stored = get_channel(&db, "ch-1").await.unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_nonexistent_channel_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_channel(&db, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_templates_updates_channel() {
        let (db, _dir) = setup_db().await;
        upsert_channel(&db, &make_channel("ch-1", None)).await.unwrap();
        set_channel_templates(&db, "ch-1", Some("intake"), Some("csat"))
            .await
            .unwrap();
        let stored = get_channel(&db, "ch-1").await.unwrap().unwrap();
        assert_eq!(stored.question_template_id.as_deref(), Some("intake"));
        assert_eq!(stored.rating_template_id.as_deref(), Some("csat"));
    }

    #[tokio::test]
    async fn set_templates_on_unknown_channel_is_not_found() {
        let (db, _dir) = setup_db().await;
        let err = set_channel_templates(&db, "ghost", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TicketbotError::NotFound { entity: "channel", .. }));
    }
}
