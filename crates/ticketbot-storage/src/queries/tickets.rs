// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket, originating message, history, and rating operations.
//!
//! The synchronous `*_tx` helpers are building blocks for callers that run
//! their own transaction through [`Database::call`] (ticket finalization
//! copies attachments between statements).

use rusqlite::{Connection, params};
use ticketbot_core::{Ticket, TicketStatus, TicketbotError, now_timestamp};

use crate::database::Database;
use crate::models::{HistoryEntry, NewNotification, NewTicket, TicketMessage, TicketRating};
use crate::queries::notifications::insert_notification_tx;
use crate::queries::{json_column, optional, parse_column};

const TICKET_COLUMNS: &str = "ticket_id, channel_id, user_id, status, created_at, resolved_at,
     resolved_by, reopen_count, closed_count, rating_pending";

fn ticket_from_row(row: &rusqlite::Row<'_>) -> Result<Ticket, rusqlite::Error> {
    Ok(Ticket {
        ticket_id: row.get(0)?,
        channel_id: row.get(1)?,
        user_id: row.get(2)?,
        status: parse_column(row, 3)?,
        created_at: row.get(4)?,
        resolved_at: row.get(5)?,
        resolved_by: row.get(6)?,
        reopen_count: row.get(7)?,
        closed_count: row.get(8)?,
        rating_pending: row.get(9)?,
    })
}

/// Returns `true` if the error is a PRIMARY KEY or UNIQUE violation.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                        | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                )
    )
}

/// Insert a pending ticket row.
pub fn insert_ticket_tx(conn: &Connection, ticket: &NewTicket) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO tickets (ticket_id, channel_id, user_id, status, created_at)
         VALUES (?1, ?2, ?3, 'pending', ?4)",
        params![
            ticket.ticket_id,
            ticket.channel_id,
            ticket.user_id,
            ticket.created_at
        ],
    )?;
    Ok(())
}

/// Insert the message a ticket was opened with.
pub fn insert_origin_message_tx(
    conn: &Connection,
    message: &TicketMessage,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO messages (ticket_id, channel_id, user_id, business, location_type, city,
                               location_name, problem, fields, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            message.ticket_id,
            message.channel_id,
            message.user_id,
            message.business,
            message.location_type,
            message.city,
            message.location_name,
            message.problem,
            message.fields.to_string(),
            message.created_at,
        ],
    )?;
    Ok(())
}

/// Append one history line. Returns the new row ID.
pub fn append_history_tx(
    conn: &Connection,
    ticket_id: &str,
    author: &str,
    body: Option<&str>,
    attachment_path: Option<&str>,
    created_at: &str,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO message_history (ticket_id, author, body, attachment_path, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![ticket_id, author, body, attachment_path, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get a ticket by ID.
pub async fn get_ticket(db: &Database, ticket_id: &str) -> Result<Option<Ticket>, TicketbotError> {
    let ticket_id = ticket_id.to_string();
    db.call(move |conn| {
        optional(conn.query_row(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = ?1"),
            params![ticket_id],
            ticket_from_row,
        ))
    })
    .await
}

/// Get the message a ticket was opened with.
pub async fn get_ticket_message(
    db: &Database,
    ticket_id: &str,
) -> Result<Option<TicketMessage>, TicketbotError> {
    let ticket_id = ticket_id.to_string();
    db.call(move |conn| {
        optional(conn.query_row(
            "SELECT ticket_id, channel_id, user_id, business, location_type, city,
                    location_name, problem, fields, created_at
             FROM messages WHERE ticket_id = ?1",
            params![ticket_id],
            |row| {
                Ok(TicketMessage {
                    ticket_id: row.get(0)?,
                    channel_id: row.get(1)?,
                    user_id: row.get(2)?,
                    business: row.get(3)?,
                    location_type: row.get(4)?,
                    city: row.get(5)?,
                    location_name: row.get(6)?,
                    problem: row.get(7)?,
                    fields: json_column(row, 8)?,
                    created_at: row.get(9)?,
                })
            },
        ))
    })
    .await
}

/// List a ticket's history in insertion order.
pub async fn list_history(
    db: &Database,
    ticket_id: &str,
) -> Result<Vec<HistoryEntry>, TicketbotError> {
    let ticket_id = ticket_id.to_string();
    db.call(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, ticket_id, author, body, attachment_path, created_at
             FROM message_history WHERE ticket_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![ticket_id], |row| {
            Ok(HistoryEntry {
                id: row.get(0)?,
                ticket_id: row.get(1)?,
                author: row.get(2)?,
                body: row.get(3)?,
                attachment_path: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, rusqlite::Error>>()
    })
    .await
}

enum Transition {
    Missing,
    WrongStatus(TicketStatus),
    Applied(Ticket, Vec<i64>),
}

fn load_ticket_tx(conn: &Connection, ticket_id: &str) -> Result<Option<Ticket>, rusqlite::Error> {
    optional(conn.query_row(
        &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = ?1"),
        params![ticket_id],
        ticket_from_row,
    ))
}

fn finish_transition(ticket_id: &str, outcome: Transition) -> Result<(Ticket, Vec<i64>), TicketbotError> {
    match outcome {
        Transition::Applied(ticket, ids) => Ok((ticket, ids)),
        Transition::Missing => Err(TicketbotError::NotFound {
            entity: "ticket",
            id: ticket_id.to_string(),
        }),
        Transition::WrongStatus(status) => Err(TicketbotError::Validation(format!(
            "ticket {ticket_id} is {status}"
        ))),
    }
}

/// Mark a ticket resolved and enqueue the given notifications atomically.
///
/// `closed_count` is incremented and `rating_pending` set as requested.
/// Returns the updated ticket and the IDs of the inserted notifications.
pub async fn resolve_ticket(
    db: &Database,
    ticket_id: &str,
    resolved_by: &str,
    rating_pending: bool,
    notifications: Vec<NewNotification>,
) -> Result<(Ticket, Vec<i64>), TicketbotError> {
    let id = ticket_id.to_string();
    let resolved_by = resolved_by.to_string();
    let outcome = db
        .call(move |conn| {
            let tx = conn.transaction()?;
            let Some(ticket) = load_ticket_tx(&tx, &id)? else {
                return Ok(Transition::Missing);
            };
            if ticket.status == TicketStatus::Resolved {
                return Ok(Transition::WrongStatus(ticket.status));
            }
            tx.execute(
                "UPDATE tickets SET status = 'resolved', resolved_at = ?1, resolved_by = ?2,
                        closed_count = closed_count + 1, rating_pending = ?3
                 WHERE ticket_id = ?4",
                params![now_timestamp(), resolved_by, rating_pending, id],
            )?;
            let mut ids = Vec::with_capacity(notifications.len());
            for notification in &notifications {
                ids.push(insert_notification_tx(&tx, notification)?);
            }
            let updated = load_ticket_tx(&tx, &id)?;
            tx.commit()?;
            Ok::<_, rusqlite::Error>(match updated {
                Some(ticket) => Transition::Applied(ticket, ids),
                None => Transition::Missing,
            })
        })
        .await?;
    finish_transition(ticket_id, outcome)
}

/// Move a resolved ticket back to pending and count the reopen.
pub async fn reopen_ticket(db: &Database, ticket_id: &str) -> Result<Ticket, TicketbotError> {
    let id = ticket_id.to_string();
    let outcome = db
        .call(move |conn| {
            let tx = conn.transaction()?;
            let Some(ticket) = load_ticket_tx(&tx, &id)? else {
                return Ok(Transition::Missing);
            };
            if ticket.status != TicketStatus::Resolved {
                return Ok(Transition::WrongStatus(ticket.status));
            }
            tx.execute(
                "UPDATE tickets SET status = 'pending', resolved_at = NULL, resolved_by = NULL,
                        reopen_count = reopen_count + 1, rating_pending = 0
                 WHERE ticket_id = ?1",
                params![id],
            )?;
            let updated = load_ticket_tx(&tx, &id)?;
            tx.commit()?;
            Ok::<_, rusqlite::Error>(match updated {
                Some(ticket) => Transition::Applied(ticket, Vec::new()),
                None => Transition::Missing,
            })
        })
        .await?;
    finish_transition(ticket_id, outcome).map(|(ticket, _)| ticket)
}

/// The most recently resolved ticket of this user that still awaits a rating.
pub async fn pending_rating_ticket(
    db: &Database,
    channel_id: &str,
    user_id: &str,
) -> Result<Option<Ticket>, TicketbotError> {
    let channel_id = channel_id.to_string();
    let user_id = user_id.to_string();
    db.call(move |conn| {
        optional(conn.query_row(
            &format!(
                "SELECT {TICKET_COLUMNS} FROM tickets
                 WHERE channel_id = ?1 AND user_id = ?2 AND rating_pending = 1
                 ORDER BY resolved_at DESC LIMIT 1"
            ),
            params![channel_id, user_id],
            ticket_from_row,
        ))
    })
    .await
}

/// Store a rating and clear the ticket's pending flag.
///
/// Returns `false` when the ticket was no longer waiting for a rating.
pub async fn record_rating(
    db: &Database,
    ticket_id: &str,
    template_id: Option<&str>,
    value: i64,
) -> Result<bool, TicketbotError> {
    let ticket_id = ticket_id.to_string();
    let template_id = template_id.map(str::to_string);
    db.call(move |conn| {
        let tx = conn.transaction()?;
        let cleared = tx.execute(
            "UPDATE tickets SET rating_pending = 0 WHERE ticket_id = ?1 AND rating_pending = 1",
            params![ticket_id],
        )?;
        if cleared == 0 {
            return Ok(false);
        }
        tx.execute(
            "INSERT INTO ticket_ratings (ticket_id, template_id, value, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(ticket_id) DO UPDATE SET
                template_id = excluded.template_id,
                value = excluded.value,
                created_at = excluded.created_at",
            params![ticket_id, template_id, value, now_timestamp()],
        )?;
        tx.commit()?;
        Ok::<_, rusqlite::Error>(true)
    })
    .await
}

/// Get the rating submitted for a ticket, if any.
pub async fn get_rating(
    db: &Database,
    ticket_id: &str,
) -> Result<Option<TicketRating>, TicketbotError> {
    let ticket_id = ticket_id.to_string();
    db.call(move |conn| {
        optional(conn.query_row(
            "SELECT ticket_id, template_id, value, created_at
             FROM ticket_ratings WHERE ticket_id = ?1",
            params![ticket_id],
            |row| {
                Ok(TicketRating {
                    ticket_id: row.get(0)?,
                    template_id: row.get(1)?,
                    value: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        ))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AUTHOR_USER;
    use crate::queries::channels::upsert_channel;
    use crate::queries::notifications::get_notification;
    use crate::queries::test_support::{make_channel, setup_db};

    async fn seed_ticket(db: &Database, ticket_id: &str) {
        upsert_channel(db, &make_channel("ch-1", None)).await.unwrap();
        let ticket = NewTicket {
            ticket_id: ticket_id.to_string(),
            channel_id: "ch-1".to_string(),
            user_id: "u-1".to_string(),
            created_at: now_timestamp(),
        };
        db.call(move |conn| {
            let tx = conn.transaction()?;
            insert_ticket_tx(&tx, &ticket)?;
            append_history_tx(&tx, &ticket.ticket_id, AUTHOR_USER, Some("hello"), None, &ticket.created_at)?;
            tx.commit()
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn inserted_ticket_is_pending() {
        let (db, _dir) = setup_db().await;
        seed_ticket(&db, "T-1").await;
        let ticket = get_ticket(&db, "T-1").await.unwrap().unwrap();
        assert_eq!(ticket.status, TicketStatus::Pending);
        assert_eq!(ticket.reopen_count, 0);
        assert!(!ticket.rating_pending);

        let history = list_history(&db, "T-1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].body.as_deref(), Some("hello"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_ticket_id_is_unique_violation() {
        let (db, _dir) = setup_db().await;
        seed_ticket(&db, "T-1").await;
        let dup = NewTicket {
            ticket_id: "T-1".to_string(),
            channel_id: "ch-1".to_string(),
            user_id: "u-2".to_string(),
            created_at: now_timestamp(),
        };
        let violated = db
            .call(move |conn| {
                Ok::<_, rusqlite::Error>(
                    insert_ticket_tx(conn, &dup)
                        .err()
                        .is_some_and(|e| is_unique_violation(&e)),
                )
            })
            .await
            .unwrap();
        assert!(violated);
    }

    #[tokio::test]
    async fn resolve_counts_closure_and_enqueues() {
        let (db, _dir) = setup_db().await;
        seed_ticket(&db, "T-1").await;
        let note = NewNotification {
            channel_id: "ch-1".to_string(),
            recipient: "u-1".to_string(),
            payload: "resolved".to_string(),
        };
        let (ticket, ids) = resolve_ticket(&db, "T-1", "agent-7", true, vec![note])
            .await
            .unwrap();
        assert_eq!(ticket.status, TicketStatus::Resolved);
        assert_eq!(ticket.closed_count, 1);
        assert_eq!(ticket.resolved_by.as_deref(), Some("agent-7"));
        assert!(ticket.rating_pending);
        assert_eq!(ids.len(), 1);
        assert!(get_notification(&db, ids[0]).await.unwrap().is_some());

        let again = resolve_ticket(&db, "T-1", "agent-7", false, Vec::new()).await;
        assert!(matches!(again, Err(TicketbotError::Validation(_))));
    }

    #[tokio::test]
    async fn reopen_after_resolve() {
        let (db, _dir) = setup_db().await;
        seed_ticket(&db, "T-1").await;
        assert!(matches!(
            reopen_ticket(&db, "T-1").await,
            Err(TicketbotError::Validation(_))
        ));
        resolve_ticket(&db, "T-1", "a", true, Vec::new()).await.unwrap();
        let ticket = reopen_ticket(&db, "T-1").await.unwrap();
        assert_eq!(ticket.status, TicketStatus::Pending);
        assert_eq!(ticket.reopen_count, 1);
        assert!(ticket.resolved_at.is_none());
        assert!(!ticket.rating_pending);
    }

    #[tokio::test]
    async fn resolve_unknown_ticket_is_not_found() {
        let (db, _dir) = setup_db().await;
        assert!(matches!(
            resolve_ticket(&db, "nope", "a", false, Vec::new()).await,
            Err(TicketbotError::NotFound { entity: "ticket", .. })
        ));
    }

    #[tokio::test]
    async fn rating_is_recorded_once() {
        let (db, _dir) = setup_db().await;
        seed_ticket(&db, "T-1").await;
        resolve_ticket(&db, "T-1", "a", true, Vec::new()).await.unwrap();

        let pending = pending_rating_ticket(&db, "ch-1", "u-1").await.unwrap();
        assert_eq!(pending.map(|t| t.ticket_id).as_deref(), Some("T-1"));

        assert!(record_rating(&db, "T-1", Some("csat"), 4).await.unwrap());
        assert!(!record_rating(&db, "T-1", Some("csat"), 5).await.unwrap());
        let rating = get_rating(&db, "T-1").await.unwrap().unwrap();
        assert_eq!(rating.value, 4);
        assert!(pending_rating_ticket(&db, "ch-1", "u-1").await.unwrap().is_none());
    }
}
