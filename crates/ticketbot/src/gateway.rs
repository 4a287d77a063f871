// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway built on axum.
//!
//! Platform adapters post normalized inbound events and receive the
//! replies to relay; staff tooling resolves and reopens tickets, nudges
//! notifications, and drops cached bot credentials after edits.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use ticketbot_core::{InboundEvent, Reply, Ticket, TicketbotError};
use ticketbot_intake::{ConversationEngine, TemplateStore, TicketLifecycle};
use ticketbot_notify::{NotificationQueue, ProviderFactory};
use ticketbot_storage::Database;
use ticketbot_storage::queries::notifications::requeue_notification;
use tower_http::trace::TraceLayer;

/// Shared state for the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub engine: Arc<ConversationEngine>,
    pub lifecycle: Arc<TicketLifecycle>,
    pub store: Arc<TemplateStore>,
    pub queue: NotificationQueue,
    pub factory: Arc<ProviderFactory>,
    /// Inbound attachments must already sit inside this directory.
    pub staging_dir: PathBuf,
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/inbound", post(post_inbound))
        .route("/v1/tickets/{ticket_id}/resolve", post(post_resolve))
        .route("/v1/tickets/{ticket_id}/reopen", post(post_reopen))
        .route("/v1/notifications/{id}/enqueue", post(post_enqueue))
        .route("/v1/notifications/{id}/retry", post(post_retry))
        .route("/v1/settings/reload", post(post_reload))
        .route("/v1/credentials/{id}/invalidate", post(post_invalidate_credential))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler error: a [`TicketbotError`] rendered as JSON.
pub struct ApiError(TicketbotError);

impl From<TicketbotError> for ApiError {
    fn from(e: TicketbotError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TicketbotError::NotFound { .. } => StatusCode::NOT_FOUND,
            TicketbotError::Validation(_) => StatusCode::CONFLICT,
            TicketbotError::SessionProtocol(_) => StatusCode::UNPROCESSABLE_ENTITY,
            TicketbotError::StorageContention { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InboundResponse {
    pub replies: Vec<Reply>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub resolved_by: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub ticket: Ticket,
    pub notification_ids: Vec<i64>,
}

async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": state.engine.active_sessions(),
        "queued_notifications": state.queue.len(),
    }))
}

async fn post_inbound(
    State(state): State<AppState>,
    Json(event): Json<InboundEvent>,
) -> Result<Json<InboundResponse>, ApiError> {
    if let Some(outside) = event
        .attachments
        .iter()
        .find(|a| !is_staged(&state.staging_dir, &a.temp_path))
    {
        return Err(TicketbotError::SessionProtocol(format!(
            "attachment {} is not in the staging area",
            outside.file_name
        ))
        .into());
    }
    let replies = state.engine.handle(event).await?;
    Ok(Json(InboundResponse { replies }))
}

async fn post_resolve(
    State(state): State<AppState>,
    UrlPath(ticket_id): UrlPath<String>,
    Json(body): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let resolution = state.lifecycle.resolve(&ticket_id, &body.resolved_by).await?;
    for id in &resolution.notification_ids {
        state.queue.enqueue(*id);
    }
    Ok(Json(ResolveResponse {
        ticket: resolution.ticket,
        notification_ids: resolution.notification_ids,
    }))
}

async fn post_reopen(
    State(state): State<AppState>,
    UrlPath(ticket_id): UrlPath<String>,
) -> Result<Json<Ticket>, ApiError> {
    Ok(Json(state.lifecycle.reopen(&ticket_id).await?))
}

async fn post_enqueue(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<i64>,
) -> (StatusCode, Json<serde_json::Value>) {
    let queued = state.queue.enqueue(id);
    (StatusCode::ACCEPTED, Json(json!({ "queued": queued })))
}

/// Operator retry: move a failed notification back to `retry` and queue it.
async fn post_retry(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<i64>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    if !requeue_notification(&state.db, id).await? {
        return Err(TicketbotError::Validation(format!(
            "notification {id} is not in failed state"
        ))
        .into());
    }
    tracing::info!(notification_id = id, "notification requeued by operator");
    let queued = state.queue.enqueue(id);
    Ok((StatusCode::ACCEPTED, Json(json!({ "queued": queued }))))
}

/// Re-read templates and channel settings, and forget every cached
/// credential so token or `is_active` edits take effect on the next send.
async fn post_reload(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.store.reload(&state.db).await?;
    state.factory.cache().clear();
    tracing::info!("settings reloaded, credential cache cleared");
    Ok(StatusCode::NO_CONTENT)
}

async fn post_invalidate_credential(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<i64>,
) -> Json<serde_json::Value> {
    let evicted = state.factory.cache().invalidate(id);
    tracing::info!(credential_id = id, evicted, "credential cache entry invalidated");
    Json(json!({ "evicted": evicted }))
}

/// `path` lies inside `staging_dir`, judged lexically.
fn is_staged(staging_dir: &Path, path: &Path) -> bool {
    path.starts_with(staging_dir)
        && path
            .components()
            .all(|c| !matches!(c, Component::ParentDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_paths_must_stay_inside() {
        let staging = Path::new("/srv/att/temp");
        assert!(is_staged(staging, Path::new("/srv/att/temp/123-photo.jpg")));
        assert!(!is_staged(staging, Path::new("/etc/passwd")));
        assert!(!is_staged(staging, Path::new("/srv/att/temp/../../etc/passwd")));
    }

    #[test]
    fn error_statuses() {
        let not_found = ApiError(TicketbotError::NotFound {
            entity: "ticket",
            id: "x".into(),
        })
        .into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        let busy = ApiError(TicketbotError::StorageContention { attempts: 5 }).into_response();
        assert_eq!(busy.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
