// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for operations on storage entities.

pub mod channels;
pub mod credentials;
pub mod notifications;
pub mod settings;
pub mod tickets;

/// Turn `QueryReturnedNoRows` into `Ok(None)`.
pub(crate) fn optional<T>(
    result: Result<T, rusqlite::Error>,
) -> Result<Option<T>, rusqlite::Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read a TEXT column that holds an enum rendered by strum.
pub(crate) fn parse_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Read a TEXT column that holds a JSON document.
pub(crate) fn json_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> Result<serde_json::Value, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use tempfile::{TempDir, tempdir};
    use ticketbot_core::{ChannelRecord, Platform};

    use crate::database::Database;

    pub async fn setup_db() -> (Database, TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    pub fn make_channel(id: &str, credential_id: Option<i64>) -> ChannelRecord {
        ChannelRecord {
            id: id.to_string(),
            name: format!("Support {id}"),
            platform: Platform::Telegram,
            credential_id,
            question_template_id: None,
            rating_template_id: None,
            settings: serde_json::json!({}),
        }
    }
}
