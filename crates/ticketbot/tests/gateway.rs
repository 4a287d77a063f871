// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway routes driven in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use ticketbot::gateway::router;
use ticketbot::serve::{Services, build_services};
use ticketbot_config::TicketbotConfig;
use ticketbot_core::NotificationStatus;
use ticketbot_notify::ProcessOutcome;
use ticketbot_storage::models::SETTINGS_QUESTIONNAIRE;
use ticketbot_storage::queries::credentials::set_credential_active;
use ticketbot_storage::queries::notifications::get_notification;
use ticketbot_storage::queries::settings::put_setting;
use ticketbot_test_utils::{PlaintextCipher, TestDb};
use tower::ServiceExt;

struct App {
    test_db: TestDb,
    services: Services,
}

impl App {
    async fn new() -> Self {
        let test_db = TestDb::builder()
            .with_credential("42:token", json!({}))
            .with_catalogue(json!({"Acme": {"Cafe": {"Berlin": ["Store A"]}}}))
            .with_questionnaire(json!({
                "question_templates": [{
                    "id": "city",
                    "questions": [{
                        "text": "Which city?",
                        "preset": {"group": "location", "field": "city"}
                    }]
                }]
            }))
            .build()
            .await
            .unwrap();
        let mut config = TicketbotConfig::default();
        config.attachments = test_db.attachments();
        let services = build_services(&config, test_db.db.clone(), Arc::new(PlaintextCipher))
            .await
            .unwrap();
        Self { test_db, services }
    }

    fn router(&self) -> Router {
        router(self.services.state.clone())
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(self.router(), request).await
    }

    /// Walk a fresh conversation to a filed ticket and return its id.
    async fn file_ticket(&self) -> String {
        self.say("hello").await;
        self.say("Berlin").await;
        let (_, body) = self.say("Heating is off").await;
        let text = body["replies"][0]["text"].as_str().unwrap();
        text.split_whitespace()
            .find(|word| word.contains('-'))
            .unwrap()
            .to_string()
    }

    /// Resolve a ticket and return the single status notification id.
    async fn resolve(&self, ticket_id: &str) -> i64 {
        let (status, body) = self
            .post(
                &format!("/v1/tickets/{ticket_id}/resolve"),
                json!({"resolved_by": "alice"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<i64> = serde_json::from_value(body["notification_ids"].clone()).unwrap();
        assert_eq!(ids.len(), 1);
        ids[0]
    }

    async fn say(&self, text: &str) -> (StatusCode, Value) {
        self.post(
            "/v1/inbound",
            json!({"channel_id": self.test_db.channel.id, "platform_user_id": "u1", "text": text}),
        )
        .await
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = App::new().await;
    let request = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app.router(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["active_sessions"], 0);
}

#[tokio::test]
async fn intake_resolve_and_notify() {
    let app = App::new().await;

    let (status, body) = app.say("hello").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["replies"][1]["text"], "Which city?");
    assert_eq!(body["replies"][1]["quick_replies"], json!(["Berlin"]));

    app.say("Berlin").await;
    let (_, body) = app.say("Heating is off").await;
    let text = body["replies"][0]["text"].as_str().unwrap().to_string();
    let ticket_id = text
        .split_whitespace()
        .find(|word| word.contains('-'))
        .unwrap()
        .to_string();

    let (status, body) = app
        .post(
            &format!("/v1/tickets/{ticket_id}/resolve"),
            json!({"resolved_by": "alice"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ticket"]["status"], "resolved");
    let ids: Vec<i64> = serde_json::from_value(body["notification_ids"].clone()).unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(app.services.state.queue.len(), 1);

    // Dry run is on by default: the worker completes without network.
    assert_eq!(
        app.services.worker.process(ids[0]).await.unwrap(),
        ProcessOutcome::Done
    );
    let row = get_notification(&app.test_db.db, ids[0]).await.unwrap().unwrap();
    assert_eq!(row.status, NotificationStatus::Done);

    let (status, _) = app
        .post(
            &format!("/v1/tickets/{ticket_id}/resolve"),
            json!({"resolved_by": "alice"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .post(&format!("/v1/tickets/{ticket_id}/reopen"), Value::Null)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reopen_count"], 1);
}

#[tokio::test]
async fn unknown_ticket_and_channel_are_404() {
    let app = App::new().await;
    let (status, _) = app
        .post("/v1/tickets/nope/resolve", json!({"resolved_by": "alice"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(
            "/v1/inbound",
            json!({"channel_id": "ghost", "platform_user_id": "u1", "text": "hi"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn attachments_outside_staging_are_rejected() {
    let app = App::new().await;
    let (status, _) = app
        .post(
            "/v1/inbound",
            json!({
                "channel_id": app.test_db.channel.id,
                "platform_user_id": "u1",
                "text": "hi",
                "attachments": [{"file_name": "passwd", "temp_path": "/etc/passwd"}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.services.state.engine.active_sessions(), 0);
}

#[tokio::test]
async fn retry_requires_failed_notification() {
    let app = App::new().await;
    let (status, _) = app.post("/v1/notifications/1/retry", Value::Null).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.post("/v1/notifications/7/enqueue", Value::Null).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["queued"], true);
}

#[tokio::test]
async fn settings_reload_applies_to_new_sessions() {
    let app = App::new().await;
    put_setting(
        &app.test_db.db,
        SETTINGS_QUESTIONNAIRE,
        &json!({"question_templates": [{"id": "t", "questions": [{"text": "Your name?"}]}]}),
    )
    .await
    .unwrap();

    let (status, _) = app.post("/v1/settings/reload", Value::Null).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app.say("hi").await;
    assert_eq!(body["replies"][1]["text"], "Your name?");
}

#[tokio::test]
async fn reload_drops_cached_credentials() {
    let app = App::new().await;
    let cache = app.services.state.factory.cache();
    let credential_id = app.test_db.channel.credential_id.unwrap();

    let ticket_id = app.file_ticket().await;
    let first = app.resolve(&ticket_id).await;
    assert_eq!(
        app.services.worker.process(first).await.unwrap(),
        ProcessOutcome::Done
    );
    assert_eq!(cache.len(), 1);

    set_credential_active(&app.test_db.db, credential_id, false)
        .await
        .unwrap();
    let (status, _) = app.post("/v1/settings/reload", Value::Null).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(cache.is_empty());

    let (status, _) = app
        .post(&format!("/v1/tickets/{ticket_id}/reopen"), Value::Null)
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = app.resolve(&ticket_id).await;
    match app.services.worker.process(second).await.unwrap() {
        ProcessOutcome::Failed(reason) => assert!(reason.contains("disabled"), "{reason}"),
        other => panic!("expected a failed delivery, got {other:?}"),
    }
    let row = get_notification(&app.test_db.db, second).await.unwrap().unwrap();
    assert_eq!(row.status, NotificationStatus::Failed);
}

#[tokio::test]
async fn single_credential_can_be_invalidated() {
    let app = App::new().await;
    let credential_id = app.test_db.channel.credential_id.unwrap();

    let ticket_id = app.file_ticket().await;
    let id = app.resolve(&ticket_id).await;
    app.services.worker.process(id).await.unwrap();
    assert_eq!(app.services.state.factory.cache().len(), 1);

    let uri = format!("/v1/credentials/{credential_id}/invalidate");
    let (status, body) = app.post(&uri, Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["evicted"], true);
    assert!(app.services.state.factory.cache().is_empty());

    let (_, body) = app.post(&uri, Value::Null).await;
    assert_eq!(body["evicted"], false);
}
