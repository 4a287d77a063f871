// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram Bot API `sendMessage`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use ticketbot_core::{NotificationProvider, Platform, TicketbotError};

use super::{fit_message, quick_replies, send_json};

/// Default Bot API endpoint.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramProvider {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl TelegramProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, token: SecretString) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token,
        }
    }

    fn request_body(recipient: &str, message: &str, extra: &Value) -> Value {
        let mut body = json!({
            "chat_id": recipient,
            "text": fit_message(Platform::Telegram, message),
        });
        let replies = quick_replies(extra);
        if !replies.is_empty() {
            let keyboard: Vec<Vec<Value>> = replies
                .into_iter()
                .map(|text| vec![json!({ "text": text })])
                .collect();
            body["reply_markup"] = json!({
                "keyboard": keyboard,
                "one_time_keyboard": true,
                "resize_keyboard": true,
            });
        }
        body
    }
}

#[async_trait]
impl NotificationProvider for TelegramProvider {
    fn platform(&self) -> Platform {
        Platform::Telegram
    }

    async fn send(&self, recipient: &str, message: &str, extra: &Value) -> Result<(), TicketbotError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.base_url.trim_end_matches('/'),
            self.token.expose_secret()
        );
        let response = send_json(
            Platform::Telegram,
            self.client
                .post(url)
                .json(&Self::request_body(recipient, message, extra)),
        )
        .await?;

        if response.get("ok").and_then(Value::as_bool) != Some(true) {
            let description = response
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unexpected response");
            return Err(TicketbotError::delivery(format!("telegram: {description}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base: &str) -> TelegramProvider {
        TelegramProvider::new(reqwest::Client::new(), base, SecretString::from("123:abc"))
    }

    #[tokio::test]
    async fn sends_to_bot_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(json!({"chat_id": "555", "text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        provider(&server.uri())
            .send("555", "hello", &json!({}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn api_error_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                json!({"ok": false, "description": "Bad Request: chat not found"}),
            ))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .send("555", "hello", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TicketbotError::Delivery { .. }));
        assert!(err.to_string().contains("chat not found"));
    }

    #[test]
    fn quick_replies_become_a_keyboard() {
        let body = TelegramProvider::request_body("1", "Rate us", &json!({"quick_replies": ["1", "2"]}));
        assert_eq!(body["reply_markup"]["keyboard"][1][0]["text"], "2");
        let plain = TelegramProvider::request_body("1", "hi", &json!({}));
        assert!(plain.get("reply_markup").is_none());
    }
}
