// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slack Web API `chat.postMessage`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use ticketbot_core::{NotificationProvider, Platform, TicketbotError};

use super::{fit_message, send_json};

pub const SLACK_API_BASE: &str = "https://slack.com/api";

pub struct SlackProvider {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl SlackProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, token: SecretString) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token,
        }
    }
}

#[async_trait]
impl NotificationProvider for SlackProvider {
    fn platform(&self) -> Platform {
        Platform::Slack
    }

    async fn send(&self, recipient: &str, message: &str, _extra: &Value) -> Result<(), TicketbotError> {
        let url = format!("{}/chat.postMessage", self.base_url.trim_end_matches('/'));
        let response = send_json(
            Platform::Slack,
            self.client
                .post(url)
                .bearer_auth(self.token.expose_secret())
                .json(&json!({
                    "channel": recipient,
                    "text": fit_message(Platform::Slack, message),
                })),
        )
        .await?;

        // Slack answers 200 even for failures and reports them in the body.
        if response.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = response
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unexpected response");
            return Err(TicketbotError::delivery(format!("slack: {error}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base: &str) -> SlackProvider {
        SlackProvider::new(reqwest::Client::new(), base, SecretString::from("xoxb-1"))
    }

    #[tokio::test]
    async fn posts_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(header("authorization", "Bearer xoxb-1"))
            .and(body_partial_json(json!({"channel": "U1", "text": "done"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        provider(&server.uri()).send("U1", "done", &json!({})).await.unwrap();
    }

    #[tokio::test]
    async fn ok_false_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "error": "channel_not_found"})),
            )
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .send("U1", "done", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "delivery failed: slack: channel_not_found");
    }
}
