// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generic JSON webhook.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use ticketbot_core::{NotificationProvider, Platform, TicketbotError};

use super::send_json;
use crate::payload::{extra_str, merge_extra};

/// Posts `{recipient, message, extra}` to the `url` extra field, with the
/// credential token as bearer.
pub struct WebhookProvider {
    client: reqwest::Client,
    token: SecretString,
    defaults: Value,
}

impl WebhookProvider {
    pub fn new(client: reqwest::Client, token: SecretString, defaults: Value) -> Self {
        Self {
            client,
            token,
            defaults,
        }
    }
}

#[async_trait]
impl NotificationProvider for WebhookProvider {
    fn platform(&self) -> Platform {
        Platform::Webhook
    }

    async fn send(&self, recipient: &str, message: &str, extra: &Value) -> Result<(), TicketbotError> {
        let extra = merge_extra(&self.defaults, extra);
        let url = extra_str(&extra, "url")
            .ok_or_else(|| TicketbotError::delivery("webhook: missing required extra field url"))?
            .to_string();
        let mut request = self.client.post(url).json(&json!({
            "recipient": recipient,
            "message": message,
            "extra": extra,
        }));
        if !self.token.expose_secret().is_empty() {
            request = request.bearer_auth(self.token.expose_secret());
        }
        send_json(Platform::Webhook, request).await?;
        Ok(())
    }
}
