// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound delivery contract implemented once per platform.

use async_trait::async_trait;

use crate::error::TicketbotError;
use crate::types::Platform;

/// A live sender bound to one decrypted credential.
///
/// Platform-specific failures (non-2xx response, API-level error body,
/// missing required `extra` field) must surface as
/// [`TicketbotError::Delivery`] so callers stay platform-agnostic.
#[async_trait]
pub trait NotificationProvider: Send + Sync {
    /// The platform this provider talks to.
    fn platform(&self) -> Platform;

    /// Delivers `message` to `recipient`.
    ///
    /// `extra` carries per-platform fields merged from the credential and
    /// the notification payload (e.g. WhatsApp's `phone_number_id`).
    async fn send(
        &self,
        recipient: &str,
        message: &str,
        extra: &serde_json::Value,
    ) -> Result<(), TicketbotError>;
}
