// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types that only the storage layer and its direct callers see.
//!
//! Shared domain records ([`Ticket`](ticketbot_core::Ticket),
//! [`Notification`](ticketbot_core::Notification), ...) live in
//! `ticketbot-core`.

use serde::{Deserialize, Serialize};

/// Settings key holding the raw questionnaire/rating template document.
pub const SETTINGS_QUESTIONNAIRE: &str = "questionnaire";
/// Settings key holding the preset catalogue tree.
pub const SETTINGS_PRESET_CATALOGUE: &str = "preset_catalogue";
/// Settings key holding the preset group/field schema.
pub const SETTINGS_PRESET_SCHEMA: &str = "preset_schema";

/// Who wrote a history entry.
pub const AUTHOR_USER: &str = "user";
/// History entries produced by staff actions.
pub const AUTHOR_STAFF: &str = "staff";

/// A notification row about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub channel_id: String,
    pub recipient: String,
    pub payload: String,
}

/// A ticket row about to be inserted by the finalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub ticket_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub created_at: String,
}

/// The message a ticket was opened with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketMessage {
    pub ticket_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub business: Option<String>,
    pub location_type: Option<String>,
    pub city: Option<String>,
    pub location_name: Option<String>,
    pub problem: String,
    /// All collected answers keyed by field or question id.
    pub fields: serde_json::Value,
    pub created_at: String,
}

/// One line of a ticket's conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub ticket_id: String,
    pub author: String,
    pub body: Option<String>,
    pub attachment_path: Option<String>,
    pub created_at: String,
}

/// A submitted satisfaction rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRating {
    pub ticket_id: String,
    pub template_id: Option<String>,
    pub value: i64,
    pub created_at: String,
}
