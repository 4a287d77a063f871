// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound notification table operations.
//!
//! A worker owns a notification only after [`claim_notification`] succeeds.
//! The claim is a compare-and-swap on `(status, attempts)`, so two workers
//! that loaded the same row cannot both move it to `in_progress`, and a held
//! `in_progress` row is only taken over after its lease expires. Completion
//! is guarded by the same attempt count, so a holder whose lease was taken
//! over cannot overwrite the new holder's result.

use rusqlite::{Connection, params};
use ticketbot_core::{Notification, NotificationStatus, TicketbotError, now_timestamp};

use crate::database::Database;
use crate::models::NewNotification;
use crate::queries::{optional, parse_column};

/// Insert a pending notification inside an existing transaction.
pub fn insert_notification_tx(
    conn: &Connection,
    notification: &NewNotification,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO channel_notifications (channel_id, recipient, payload, status, scheduled_at)
         VALUES (?1, ?2, ?3, 'pending', ?4)",
        params![
            notification.channel_id,
            notification.recipient,
            notification.payload,
            now_timestamp()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert a pending notification. Returns the auto-generated ID.
pub async fn insert_notification(
    db: &Database,
    notification: &NewNotification,
) -> Result<i64, TicketbotError> {
    let notification = notification.clone();
    db.call(move |conn| insert_notification_tx(conn, &notification))
        .await
}

/// Get a notification by ID.
pub async fn get_notification(
    db: &Database,
    id: i64,
) -> Result<Option<Notification>, TicketbotError> {
    db.call(move |conn| {
        optional(conn.query_row(
            "SELECT id, channel_id, recipient, payload, status, attempts, scheduled_at,
                    started_at, finished_at, error
             FROM channel_notifications WHERE id = ?1",
            params![id],
            |row| {
                Ok(Notification {
                    id: row.get(0)?,
                    channel_id: row.get(1)?,
                    recipient: row.get(2)?,
                    payload: row.get(3)?,
                    status: parse_column(row, 4)?,
                    attempts: row.get(5)?,
                    scheduled_at: row.get(6)?,
                    started_at: row.get(7)?,
                    finished_at: row.get(8)?,
                    error: row.get(9)?,
                })
            },
        ))
    })
    .await
}

/// Claim a notification for processing.
///
/// Succeeds only if the row still has the status and attempt count the
/// caller observed. A `pending` or `retry` row is always claimable; an
/// `in_progress` row only once its `started_at` is older than
/// `stale_before`, meaning the processor that held it is gone. On success
/// the row is `in_progress`, `attempts` is incremented, and `started_at` is
/// set. Returns `false` if another processor holds or won the row.
pub async fn claim_notification(
    db: &Database,
    id: i64,
    observed_status: NotificationStatus,
    observed_attempts: i64,
    stale_before: &str,
) -> Result<bool, TicketbotError> {
    let observed_status = observed_status.to_string();
    let stale_before = stale_before.to_string();
    let claimed = db
        .call(move |conn| {
            conn.execute(
                "UPDATE channel_notifications
                 SET status = 'in_progress', attempts = attempts + 1, started_at = ?1
                 WHERE id = ?2 AND status = ?3 AND attempts = ?4
                   AND (status IN ('pending', 'retry')
                        OR (status = 'in_progress' AND started_at < ?5))",
                params![now_timestamp(), id, observed_status, observed_attempts, stale_before],
            )
        })
        .await?;
    Ok(claimed == 1)
}

/// Record a successful delivery and clear any previous error.
///
/// Applies only while the row is still held by the claim that produced
/// `attempts`; returns `false` when the claim was lost in the meantime.
pub async fn mark_done(db: &Database, id: i64, attempts: i64) -> Result<bool, TicketbotError> {
    let updated = db
        .call(move |conn| {
            conn.execute(
                "UPDATE channel_notifications
                 SET status = 'done', finished_at = ?1, error = NULL
                 WHERE id = ?2 AND status = 'in_progress' AND attempts = ?3",
                params![now_timestamp(), id, attempts],
            )
        })
        .await?;
    Ok(updated == 1)
}

/// Record a failed delivery with a human-readable reason. Same claim
/// guard as [`mark_done`].
pub async fn mark_failed(
    db: &Database,
    id: i64,
    attempts: i64,
    error: &str,
) -> Result<bool, TicketbotError> {
    let error = error.to_string();
    let updated = db
        .call(move |conn| {
            conn.execute(
                "UPDATE channel_notifications
                 SET status = 'failed', finished_at = ?1, error = ?2
                 WHERE id = ?3 AND status = 'in_progress' AND attempts = ?4",
                params![now_timestamp(), error, id, attempts],
            )
        })
        .await?;
    Ok(updated == 1)
}

/// Operator action: move a failed notification to `retry` so the worker
/// picks it up again. Returns `false` if the row was not `failed`.
pub async fn requeue_notification(db: &Database, id: i64) -> Result<bool, TicketbotError> {
    let updated = db
        .call(move |conn| {
            conn.execute(
                "UPDATE channel_notifications
                 SET status = 'retry', finished_at = NULL, scheduled_at = ?1
                 WHERE id = ?2 AND status = 'failed'",
                params![now_timestamp(), id],
            )
        })
        .await?;
    Ok(updated == 1)
}

/// IDs of notifications waiting for delivery, oldest first: `pending` and
/// `retry` rows plus `in_progress` rows abandoned before `stale_before`.
pub async fn list_due_notification_ids(
    db: &Database,
    limit: u32,
    stale_before: &str,
) -> Result<Vec<i64>, TicketbotError> {
    let stale_before = stale_before.to_string();
    db.call(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT id FROM channel_notifications
             WHERE status IN ('pending', 'retry')
                OR (status = 'in_progress' AND started_at < ?2)
             ORDER BY scheduled_at ASC, id ASC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit, stale_before], |row| row.get(0))?;
        rows.collect::<Result<Vec<i64>, rusqlite::Error>>()
    })
    .await
}
