// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform senders.
//!
//! Every HTTP failure is reported as [`TicketbotError::Delivery`] so the
//! worker never needs to know which platform it is talking to.

pub mod dry_run;
pub mod slack;
pub mod telegram;
pub mod webhook;
pub mod whatsapp;

use serde_json::Value;
use ticketbot_core::{Platform, TicketbotError};

pub use dry_run::DryRunProvider;
pub use slack::SlackProvider;
pub use telegram::TelegramProvider;
pub use webhook::WebhookProvider;
pub use whatsapp::WhatsappProvider;

/// Send a prepared request and return the decoded JSON body (or `Null`
/// for an empty body) of a 2xx response.
pub(crate) async fn send_json(
    platform: Platform,
    request: reqwest::RequestBuilder,
) -> Result<Value, TicketbotError> {
    let response = request.send().await.map_err(|e| {
        TicketbotError::delivery(format!("{platform} request failed: {e}"))
    })?;
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(%platform, status = %status, "provider response received");

    if !status.is_success() {
        return Err(TicketbotError::delivery(format!(
            "{platform} returned {status}: {}",
            snippet(&body)
        )));
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
}

/// Cut a message down to what the platform accepts in one send.
pub(crate) fn fit_message(platform: Platform, message: &str) -> &str {
    let max = platform.capabilities().max_message_len;
    match message.char_indices().nth(max) {
        Some((cut, _)) => {
            tracing::warn!(%platform, max, "message truncated to platform limit");
            &message[..cut]
        }
        None => message,
    }
}

/// Quick replies requested by the payload, as strings.
pub(crate) fn quick_replies(extra: &Value) -> Vec<String> {
    extra
        .get("quick_replies")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((cut, _)) => &body[..cut],
        None => body,
    }
}
