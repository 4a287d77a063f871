// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ticketbot serve`: open storage, start the background tasks, and run the
//! HTTP gateway until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use ticketbot_config::TicketbotConfig;
use ticketbot_core::{TicketbotError, TokenCipher};
use ticketbot_intake::{ConversationEngine, TemplateStore, TicketFinalizer, TicketLifecycle};
use ticketbot_notify::{NotificationQueue, NotificationWorker, ProviderFactory};
use ticketbot_storage::Database;
use ticketbot_vault::AesGcmTokenCipher;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::gateway::{self, AppState};
use crate::shutdown::install_signal_handler;

/// Everything the gateway and background tasks share.
pub struct Services {
    pub state: AppState,
    pub worker: NotificationWorker,
    pub inbox: ticketbot_notify::NotificationInbox,
}

/// Wire the components together over an open database.
pub async fn build_services(
    config: &TicketbotConfig,
    db: Database,
    cipher: Arc<dyn TokenCipher>,
) -> Result<Services, TicketbotError> {
    let store = Arc::new(TemplateStore::new(config.intake.max_rating_scale));
    store.reload(&db).await?;

    let finalizer = TicketFinalizer::from_config(db.clone(), &config.attachments);
    let engine = Arc::new(ConversationEngine::new(
        db.clone(),
        store.clone(),
        finalizer,
        config.intake.clone(),
    ));
    let lifecycle = Arc::new(TicketLifecycle::new(
        db.clone(),
        store.clone(),
        config.intake.resolved_message.clone(),
    ));

    let factory = Arc::new(ProviderFactory::from_config(db.clone(), cipher, &config.notify)?);
    let (queue, inbox) = NotificationQueue::new(config.notify.queue_capacity);
    let worker = NotificationWorker::new(db.clone(), factory.clone(), &config.notify);

    Ok(Services {
        state: AppState {
            db,
            engine,
            lifecycle,
            store,
            queue,
            factory,
            staging_dir: config.attachments.temp_dir(),
        },
        worker,
        inbox,
    })
}

/// Run the service until SIGINT/SIGTERM.
pub async fn run_serve(config: TicketbotConfig) -> Result<(), TicketbotError> {
    info!(name = %config.service.name, "starting ticketbot");

    let cipher: Arc<dyn TokenCipher> = Arc::new(AesGcmTokenCipher::from_config(&config.vault)?);
    let db = Database::open_with_config(&config.storage).await?;
    tokio::fs::create_dir_all(config.attachments.temp_dir())
        .await
        .map_err(TicketbotError::storage)?;

    let Services {
        state,
        worker,
        inbox,
    } = build_services(&config, db.clone(), cipher).await?;
    let cancel = install_signal_handler();

    let worker_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.run(inbox, cancel).await })
    };
    let sweeper_handle = tokio::spawn(sweep_sessions(
        state.engine.clone(),
        Duration::from_secs(config.intake.sweep_interval_secs.max(1)),
        cancel.clone(),
    ));

    let addr = format!("{}:{}", config.service.bind_address, config.service.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TicketbotError::Config(format!("failed to bind gateway to {addr}: {e}")))?;
    info!(%addr, "gateway listening");

    let serve_result = axum::serve(listener, gateway::router(state))
        .with_graceful_shutdown(cancel.clone().cancelled_owned())
        .await
        .map_err(|e| TicketbotError::Internal(format!("gateway server error: {e}")));

    // The server can also stop on its own; make sure the tasks follow.
    cancel.cancel();
    for (name, handle) in [("notification worker", worker_handle), ("session sweeper", sweeper_handle)] {
        if let Err(e) = handle.await {
            warn!(task = name, error = %e, "background task ended abnormally");
        }
    }

    db.close().await?;
    info!("ticketbot stopped");
    serve_result
}

/// Periodically drop idle intake sessions.
pub async fn sweep_sessions(
    engine: Arc<ConversationEngine>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(every);
    // Skip the first immediate tick.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let swept = engine.sweep_idle().await;
                if swept > 0 {
                    info!(swept, remaining = engine.active_sessions(), "idle sessions swept");
                }
            }
            _ = cancel.cancelled() => {
                info!("session sweeper shutting down");
                break;
            }
        }
    }
}
