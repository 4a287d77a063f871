// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff-side ticket transitions: resolve and reopen.

use std::sync::Arc;

use serde_json::json;
use ticketbot_core::{Ticket, TicketbotError};
use ticketbot_storage::Database;
use ticketbot_storage::models::NewNotification;
use ticketbot_storage::queries::channels::get_channel;
use ticketbot_storage::queries::tickets::{get_ticket, reopen_ticket, resolve_ticket};

use crate::templates::TemplateStore;

/// Outcome of resolving a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub ticket: Ticket,
    /// Notifications written in the same transaction, ready to enqueue.
    pub notification_ids: Vec<i64>,
}

pub struct TicketLifecycle {
    db: Database,
    store: Arc<TemplateStore>,
    resolved_message: String,
}

impl TicketLifecycle {
    pub fn new(db: Database, store: Arc<TemplateStore>, resolved_message: impl Into<String>) -> Self {
        Self {
            db,
            store,
            resolved_message: resolved_message.into(),
        }
    }

    /// Resolve a ticket and queue the user's status update.
    ///
    /// When the channel has a rating template a rating prompt is queued as
    /// well and the ticket starts waiting for a rating.
    pub async fn resolve(&self, ticket_id: &str, resolved_by: &str) -> Result<Resolution, TicketbotError> {
        let ticket = get_ticket(&self.db, ticket_id)
            .await?
            .ok_or_else(|| TicketbotError::NotFound {
                entity: "ticket",
                id: ticket_id.to_string(),
            })?;
        let channel = get_channel(&self.db, &ticket.channel_id)
            .await?
            .ok_or_else(|| TicketbotError::NotFound {
                entity: "channel",
                id: ticket.channel_id.clone(),
            })?;

        let mut notifications = vec![NewNotification {
            channel_id: ticket.channel_id.clone(),
            recipient: ticket.user_id.clone(),
            payload: json!({
                "message": self.resolved_message.replace("{ticket_id}", ticket_id),
            })
            .to_string(),
        }];

        let snapshot = self.store.snapshot();
        let rating = snapshot.rating_template_for(&channel);
        if let Some(template) = rating {
            notifications.push(NewNotification {
                channel_id: ticket.channel_id.clone(),
                recipient: ticket.user_id.clone(),
                payload: json!({
                    "message": template.prompt,
                    "extra": {"quick_replies": template.values()},
                })
                .to_string(),
            });
        }

        let (ticket, notification_ids) = resolve_ticket(
            &self.db,
            ticket_id,
            resolved_by,
            rating.is_some(),
            notifications,
        )
        .await?;
        tracing::info!(
            ticket_id = %ticket.ticket_id,
            resolved_by,
            closed_count = ticket.closed_count,
            notifications = notification_ids.len(),
            "ticket resolved"
        );
        Ok(Resolution {
            ticket,
            notification_ids,
        })
    }

    /// Reopen a resolved ticket.
    pub async fn reopen(&self, ticket_id: &str) -> Result<Ticket, TicketbotError> {
        let ticket = reopen_ticket(&self.db, ticket_id).await?;
        tracing::info!(
            ticket_id = %ticket.ticket_id,
            reopen_count = ticket.reopen_count,
            "ticket reopened"
        );
        Ok(ticket)
    }
}
