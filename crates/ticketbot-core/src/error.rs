// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Ticketbot support backend.

use thiserror::Error;

/// The primary error type used across all Ticketbot crates.
///
/// Variants follow the recovery policy of the component that raises them:
/// validation and session-protocol problems are recovered locally, delivery
/// problems end up recorded on the notification row, and storage contention
/// is only surfaced after the retry budget is exhausted.
#[derive(Debug, Error)]
pub enum TicketbotError {
    /// Configuration errors (bad credentials, unknown platform, missing settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed settings or templates.
    #[error("validation error: {0}")]
    Validation(String),

    /// Inbound event had an unexpected shape for the current conversation step.
    #[error("unexpected input: {0}")]
    SessionProtocol(String),

    /// Ticket creation failed and the transaction was rolled back.
    #[error("ticket finalization failed: {message}")]
    Finalization {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Outbound delivery failed (bad recipient, bad response, missing extra field).
    #[error("delivery failed: {message}")]
    Delivery { message: String },

    /// The store stayed busy for the whole retry budget.
    #[error("storage busy after {attempts} attempts")]
    StorageContention { attempts: u32 },

    /// Storage backend errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TicketbotError {
    /// Shorthand for a [`TicketbotError::Delivery`] with the given message.
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
        }
    }

    /// Wraps any error as a [`TicketbotError::Storage`].
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// Returns `true` when the error carries a message fit to be recorded
    /// verbatim on a failed notification.
    pub fn is_recognized_delivery(&self) -> bool {
        matches!(self, Self::Delivery { .. } | Self::Config(_))
    }
}
