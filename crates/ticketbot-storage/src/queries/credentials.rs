// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot credential operations. Tokens are stored encrypted; this module never
//! sees them in clear text.

use rusqlite::params;
use ticketbot_core::{BotCredential, Platform, TicketbotError};

use crate::database::Database;
use crate::queries::{json_column, optional, parse_column};

/// Store a new credential. Returns the auto-generated credential ID.
pub async fn insert_credential(
    db: &Database,
    platform: Platform,
    encrypted_token: &str,
    extra: &serde_json::Value,
) -> Result<i64, TicketbotError> {
    let encrypted_token = encrypted_token.to_string();
    let extra = extra.to_string();
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO bot_credentials (platform, encrypted_token, extra) VALUES (?1, ?2, ?3)",
            params![platform.to_string(), encrypted_token, extra],
        )?;
        Ok::<_, rusqlite::Error>(conn.last_insert_rowid())
    })
    .await
}

/// Get a credential by ID, active or not.
pub async fn get_credential(db: &Database, id: i64) -> Result<Option<BotCredential>, TicketbotError> {
    db.call(move |conn| {
        optional(conn.query_row(
            "SELECT id, platform, encrypted_token, extra, is_active
             FROM bot_credentials WHERE id = ?1",
            params![id],
            |row| {
                Ok(BotCredential {
                    id: row.get(0)?,
                    platform: parse_column(row, 1)?,
                    encrypted_token: row.get(2)?,
                    extra: json_column(row, 3)?,
                    is_active: row.get(4)?,
                })
            },
        ))
    })
    .await
}

/// Enable or disable a credential.
pub async fn set_credential_active(
    db: &Database,
    id: i64,
    is_active: bool,
) -> Result<(), TicketbotError> {
    let updated = db
        .call(move |conn| {
            conn.execute(
                "UPDATE bot_credentials SET is_active = ?1 WHERE id = ?2",
                params![is_active, id],
            )
        })
        .await?;
    if updated == 0 {
        return Err(TicketbotError::NotFound {
            entity: "credential",
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Replace the encrypted token of a credential (rotation).
pub async fn update_credential_token(
    db: &Database,
    id: i64,
    encrypted_token: &str,
) -> Result<(), TicketbotError> {
    let encrypted_token = encrypted_token.to_string();
    let updated = db
        .call(move |conn| {
            conn.execute(
                "UPDATE bot_credentials SET encrypted_token = ?1 WHERE id = ?2",
                params![encrypted_token, id],
            )
        })
        .await?;
    if updated == 0 {
        return Err(TicketbotError::NotFound {
            entity: "credential",
            id: id.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn insert_and_get_credential() {
        let (db, _dir) = setup_db().await;
        let extra = serde_json::json!({"phone_number_id": "555"});
        let id = insert_credential(&db, Platform::Whatsapp, "sealed", &extra)
            .await
            .unwrap();

        let cred = get_credential(&db, id).await.unwrap().unwrap();
        assert_eq!(cred.platform, Platform::Whatsapp);
        assert_eq!(cred.encrypted_token, "sealed");
        assert_eq!(cred.extra, extra);
        assert!(cred.is_active);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn deactivate_credential() {
        let (db, _dir) = setup_db().await;
        let id = insert_credential(&db, Platform::Telegram, "t", &serde_json::json!({}))
            .await
            .unwrap();
        set_credential_active(&db, id, false).await.unwrap();
        assert!(!get_credential(&db, id).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn rotate_token() {
        let (db, _dir) = setup_db().await;
        let id = insert_credential(&db, Platform::Telegram, "old", &serde_json::json!({}))
            .await
            .unwrap();
        update_credential_token(&db, id, "new").await.unwrap();
        assert_eq!(
            get_credential(&db, id).await.unwrap().unwrap().encrypted_token,
            "new"
        );
    }

    #[tokio::test]
    async fn missing_credential() {
        let (db, _dir) = setup_db().await;
        assert!(get_credential(&db, 99).await.unwrap().is_none());
        assert!(matches!(
            set_credential_active(&db, 99, true).await,
            Err(TicketbotError::NotFound { .. })
        ));
    }
}
