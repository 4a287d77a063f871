// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API text messages.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use ticketbot_core::{NotificationProvider, Platform, TicketbotError};

use super::{fit_message, send_json};
use crate::payload::{extra_str, merge_extra};

pub const WHATSAPP_API_BASE: &str = "https://graph.facebook.com/v19.0";

/// Sends through `POST /{phone_number_id}/messages`.
///
/// `phone_number_id` comes from the credential's extra fields and may be
/// overridden per notification.
pub struct WhatsappProvider {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
    defaults: Value,
}

impl WhatsappProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: SecretString,
        defaults: Value,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token,
            defaults,
        }
    }
}

#[async_trait]
impl NotificationProvider for WhatsappProvider {
    fn platform(&self) -> Platform {
        Platform::Whatsapp
    }

    async fn send(&self, recipient: &str, message: &str, extra: &Value) -> Result<(), TicketbotError> {
        let extra = merge_extra(&self.defaults, extra);
        let phone_number_id = extra_str(&extra, "phone_number_id").ok_or_else(|| {
            TicketbotError::delivery("whatsapp: missing required extra field phone_number_id")
        })?;
        let url = format!(
            "{}/{phone_number_id}/messages",
            self.base_url.trim_end_matches('/')
        );
        send_json(
            Platform::Whatsapp,
            self.client
                .post(url)
                .bearer_auth(self.token.expose_secret())
                .json(&json!({
                    "messaging_product": "whatsapp",
                    "to": recipient,
                    "type": "text",
                    "text": {"body": fit_message(Platform::Whatsapp, message)},
                })),
        )
        .await?;
        Ok(())
    }
}
