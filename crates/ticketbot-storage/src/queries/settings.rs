// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key/value settings holding JSON documents (templates, preset catalogue).

use rusqlite::params;
use ticketbot_core::TicketbotError;

use crate::database::Database;
use crate::queries::{json_column, optional};

/// Read a settings document. Returns `None` when the key was never written.
pub async fn get_setting(
    db: &Database,
    key: &str,
) -> Result<Option<serde_json::Value>, TicketbotError> {
    let key = key.to_string();
    db.call(move |conn| {
        optional(conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| json_column(row, 0),
        ))
    })
    .await
}

/// Write (or overwrite) a settings document.
pub async fn put_setting(
    db: &Database,
    key: &str,
    value: &serde_json::Value,
) -> Result<(), TicketbotError> {
    let key = key.to_string();
    let value = value.to_string();
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
            params![key, value],
        )?;
        Ok::<_, rusqlite::Error>(())
    })
    .await
}
