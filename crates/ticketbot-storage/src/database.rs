// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes; other
//! processes sharing the file are the only source of SQLITE_BUSY, which
//! [`Database::call`] absorbs with bounded retries.

use std::path::Path;
use std::time::Duration;

use ticketbot_config::model::StorageConfig;
use ticketbot_core::TicketbotError;

use crate::retry::{RetryPolicy, StorageFailure};

/// Handle to the single SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    retry: RetryPolicy,
}

impl Database {
    /// Open (or create) the database at `path` with default storage settings.
    pub async fn open(path: &str) -> Result<Self, TicketbotError> {
        let config = StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        };
        Self::open_with_config(&config).await
    }

    /// Open (or create) the database described by the `[storage]` section.
    ///
    /// Creates the parent directory, runs pending migrations, and applies
    /// connection PRAGMAs before returning.
    pub async fn open_with_config(config: &StorageConfig) -> Result<Self, TicketbotError> {
        let path = config.database_path.clone();
        if let Some(parent) = Path::new(&path).parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(TicketbotError::storage)?;
        }

        let wal_mode = config.wal_mode;
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);

        let migrate_path = path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), TicketbotError> {
            let mut conn =
                rusqlite::Connection::open(&migrate_path).map_err(TicketbotError::storage)?;
            apply_pragmas(&conn, wal_mode, busy_timeout).map_err(TicketbotError::storage)?;
            crate::migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| TicketbotError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(TicketbotError::storage)?;
        conn.call(move |conn| apply_pragmas(conn, wal_mode, busy_timeout))
            .await
            .map_err(map_tr_err)?;

        tracing::debug!(path = %path, wal_mode, "database opened");
        Ok(Self {
            conn,
            retry: RetryPolicy::from_config(config),
        })
    }

    /// The retry policy applied by [`Database::call`].
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run `f` on the connection thread, retrying on lock contention.
    ///
    /// The closure runs once per attempt, so it must be cheap to clone and
    /// must not leave side effects behind when it fails. After the retry
    /// budget is spent the caller gets [`TicketbotError::StorageContention`].
    pub async fn call<T, E, F>(&self, f: F) -> Result<T, TicketbotError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<T, E> + Clone + Send + 'static,
        T: Send + 'static,
        E: StorageFailure,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.conn.call(f.clone()).await {
                Ok(value) => return Ok(value),
                Err(tokio_rusqlite::Error::Error(err)) if err.is_busy() => {
                    if attempt >= self.retry.max_attempts {
                        tracing::warn!(attempts = attempt, "storage stayed busy, giving up");
                        return Err(TicketbotError::StorageContention { attempts: attempt });
                    }
                    let delay = self.retry.backoff(attempt - 1);
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "storage busy, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(tokio_rusqlite::Error::Error(err)) => return Err(err.into_error()),
                Err(tokio_rusqlite::Error::ConnectionClosed) => {
                    return Err(TicketbotError::Internal(
                        "database connection closed".to_string(),
                    ));
                }
                Err(_) => {
                    return Err(TicketbotError::Internal(
                        "database connection error".to_string(),
                    ));
                }
            }
        }
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), TicketbotError> {
        self.conn
            .call(|conn| {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(TicketbotError::storage)
    }
}

fn apply_pragmas(
    conn: &rusqlite::Connection,
    wal_mode: bool,
    busy_timeout: Duration,
) -> Result<(), rusqlite::Error> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", true)?;
    if wal_mode {
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
    }
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(())
}

/// Map a tokio-rusqlite error into a [`TicketbotError`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TicketbotError {
    match e {
        tokio_rusqlite::Error::Error(err) => err.into_error(),
        other => TicketbotError::storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_parent_directory_and_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("ticketbot.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let tables: Vec<String> = db
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect::<Result<Vec<String>, rusqlite::Error>>()
            })
            .await
            .unwrap();
        for expected in [
            "bot_credentials",
            "channel_notifications",
            "channels",
            "message_history",
            "messages",
            "settings",
            "ticket_ratings",
            "tickets",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("ticketbot.db");
        let path = db_path.to_str().unwrap();
        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let enabled: i64 = db
            .call(|conn| conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_contention() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("t.db").to_string_lossy().into_owned(),
            busy_retries: 3,
            busy_backoff_ms: 1,
            ..StorageConfig::default()
        };
        let db = Database::open_with_config(&config).await.unwrap();

        let calls = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), TicketbotError> = db
            .call(move |_conn| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Err::<(), _>(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
                    None,
                ))
            })
            .await;

        assert!(matches!(
            result,
            Err(TicketbotError::StorageContention { attempts: 3 })
        ));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transient_busy_is_retried_to_success() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();

        let calls = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = calls.clone();
        let value = db
            .call(move |_conn| {
                let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if n == 0 {
                    Err(rusqlite::Error::SqliteFailure(
                        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                        None,
                    ))
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
