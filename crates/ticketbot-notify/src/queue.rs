// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory notification queue and its single background worker.
//!
//! The worker blocks on the queue for at most `poll_interval`; when nothing
//! arrives it scans storage for `pending`/`retry` rows and for `in_progress`
//! rows whose claim lease expired, so rows written by other processes or
//! abandoned by a crash are still delivered. Duplicate work is harmless:
//! every delivery starts with a conditional claim that only one processor
//! can win, and a row is not taken over while its lease is live.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use ticketbot_config::model::NotifyConfig;
use ticketbot_core::{Notification, NotificationStatus, TicketbotError, timestamp_ago};
use ticketbot_storage::Database;
use ticketbot_storage::queries::channels::get_channel;
use ticketbot_storage::queries::notifications::{
    claim_notification, get_notification, list_due_notification_ids, mark_done, mark_failed,
};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::factory::ProviderSource;
use crate::payload::NotificationPayload;

/// Failure text recorded when processing broke for a reason that is not a
/// delivery problem.
pub const SYSTEM_ERROR: &str = "system error while sending notification";

/// Producer handle. Cheap to clone.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<i64>,
    queued: Arc<DashSet<i64>>,
}

/// Consumer end, handed to [`NotificationWorker::run`].
pub struct NotificationInbox {
    rx: mpsc::Receiver<i64>,
    queued: Arc<DashSet<i64>>,
}

impl NotificationQueue {
    pub fn new(capacity: usize) -> (Self, NotificationInbox) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queued = Arc::new(DashSet::new());
        (
            Self {
                tx,
                queued: queued.clone(),
            },
            NotificationInbox { rx, queued },
        )
    }

    /// Hand a notification id to the worker without waiting.
    ///
    /// Returns `false` when the id is already waiting in the queue or the
    /// queue is full or closed. Nothing is lost in those cases: the row
    /// stays `pending` and the storage scan picks it up.
    pub fn enqueue(&self, id: i64) -> bool {
        if !self.queued.insert(id) {
            tracing::debug!(notification_id = id, "notification already queued");
            return false;
        }
        match self.tx.try_send(id) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.queued.remove(&id);
                tracing::warn!(notification_id = id, "notification queue full, deferring to scan");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.queued.remove(&id);
                tracing::warn!(notification_id = id, "notification worker is not running");
                false
            }
        }
    }

    /// Ids currently waiting in memory.
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }
}

/// What happened to one notification id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// No such row.
    Missing,
    /// The row was not in a claimable status.
    Skipped(NotificationStatus),
    /// Another processor holds the row, or took it over before the
    /// outcome could be recorded.
    LostClaim,
    Done,
    /// Marked `failed` with this reason.
    Failed(String),
}

pub struct NotificationWorker {
    db: Database,
    providers: Arc<dyn ProviderSource>,
    poll_interval: Duration,
    scan_batch: u32,
    claim_lease: Duration,
}

impl NotificationWorker {
    pub fn new(db: Database, providers: Arc<dyn ProviderSource>, config: &NotifyConfig) -> Self {
        Self {
            db,
            providers,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            scan_batch: config.scan_batch,
            claim_lease: Duration::from_secs(config.claim_lease_secs),
        }
    }

    /// Process notifications until `cancel` fires or every producer handle
    /// is dropped. A notification already being processed is finished first.
    pub async fn run(&self, mut inbox: NotificationInbox, cancel: CancellationToken) {
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "notification worker started"
        );
        self.scan(&cancel).await;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                next = tokio::time::timeout(self.poll_interval, inbox.rx.recv()) => match next {
                    Ok(Some(id)) => {
                        inbox.queued.remove(&id);
                        self.process_logged(id).await;
                    }
                    Ok(None) => {
                        tracing::info!("notification queue closed");
                        break;
                    }
                    Err(_) => {
                        self.scan(&cancel).await;
                    }
                },
            }
        }
        tracing::info!("notification worker stopped");
    }

    /// Process due rows found in storage. Returns how many were attempted.
    pub async fn scan(&self, cancel: &CancellationToken) -> usize {
        let stale_before = timestamp_ago(self.claim_lease);
        let ids = match list_due_notification_ids(&self.db, self.scan_batch, &stale_before).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "notification scan failed");
                return 0;
            }
        };
        if !ids.is_empty() {
            tracing::debug!(count = ids.len(), "notifications picked up by scan");
        }
        let mut attempted = 0;
        for id in ids {
            if cancel.is_cancelled() {
                break;
            }
            self.process_logged(id).await;
            attempted += 1;
        }
        attempted
    }

    async fn process_logged(&self, id: i64) {
        if let Err(e) = self.process(id).await {
            tracing::error!(notification_id = id, error = %e, "notification processing aborted");
        }
    }

    /// Claim and deliver one notification, recording the outcome on its row.
    ///
    /// Errors are returned only when storage itself fails; delivery problems
    /// end up as [`ProcessOutcome::Failed`].
    pub async fn process(&self, id: i64) -> Result<ProcessOutcome, TicketbotError> {
        let Some(notification) = get_notification(&self.db, id).await? else {
            tracing::warn!(notification_id = id, "notification not found, dropping");
            return Ok(ProcessOutcome::Missing);
        };
        if !notification.status.is_claimable() {
            tracing::debug!(
                notification_id = id,
                status = %notification.status,
                "notification not claimable, skipping"
            );
            return Ok(ProcessOutcome::Skipped(notification.status));
        }
        let stale_before = timestamp_ago(self.claim_lease);
        if !claim_notification(
            &self.db,
            id,
            notification.status,
            notification.attempts,
            &stale_before,
        )
        .await?
        {
            tracing::debug!(notification_id = id, "notification held or claimed elsewhere");
            return Ok(ProcessOutcome::LostClaim);
        }
        let attempts = notification.attempts + 1;

        match self.deliver(&notification).await {
            Ok(()) => {
                if !mark_done(&self.db, id, attempts).await? {
                    tracing::warn!(
                        notification_id = id,
                        attempts,
                        "claim lease lost before delivery was recorded"
                    );
                    return Ok(ProcessOutcome::LostClaim);
                }
                tracing::info!(
                    notification_id = id,
                    channel_id = %notification.channel_id,
                    attempts,
                    "notification delivered"
                );
                Ok(ProcessOutcome::Done)
            }
            Err(e) => {
                let reason = failure_reason(&e);
                if e.is_recognized_delivery() {
                    tracing::warn!(
                        notification_id = id,
                        channel_id = %notification.channel_id,
                        attempts,
                        error = %reason,
                        "notification delivery failed"
                    );
                } else {
                    tracing::error!(
                        notification_id = id,
                        channel_id = %notification.channel_id,
                        attempts,
                        error = %e,
                        "unexpected error while sending notification"
                    );
                }
                if !mark_failed(&self.db, id, attempts, &reason).await? {
                    tracing::warn!(
                        notification_id = id,
                        attempts,
                        "claim lease lost before failure was recorded"
                    );
                    return Ok(ProcessOutcome::LostClaim);
                }
                Ok(ProcessOutcome::Failed(reason))
            }
        }
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), TicketbotError> {
        let channel = get_channel(&self.db, &notification.channel_id)
            .await?
            .ok_or_else(|| {
                TicketbotError::Config(format!("channel {} not found", notification.channel_id))
            })?;
        let provider = self.providers.provider_for(&channel).await?;

        let payload = NotificationPayload::parse(&notification.payload);
        if payload.message.trim().is_empty() {
            return Err(TicketbotError::delivery("message is empty"));
        }
        let recipient = notification.recipient.trim();
        if recipient.is_empty() {
            return Err(TicketbotError::delivery("recipient is empty"));
        }
        provider.send(recipient, &payload.message, &payload.extra).await
    }
}

fn failure_reason(error: &TicketbotError) -> String {
    match error {
        TicketbotError::Delivery { message } => message.clone(),
        TicketbotError::Config(message) => message.clone(),
        _ => SYSTEM_ERROR.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_dedupes_waiting_ids() {
        let (queue, _inbox) = NotificationQueue::new(4);
        assert!(queue.enqueue(1));
        assert!(!queue.enqueue(1));
        assert!(queue.enqueue(2));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn full_queue_defers_to_scan() {
        let (queue, _inbox) = NotificationQueue::new(1);
        assert!(queue.enqueue(1));
        assert!(!queue.enqueue(2));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn closed_queue_rejects() {
        let (queue, inbox) = NotificationQueue::new(1);
        drop(inbox);
        assert!(!queue.enqueue(1));
        assert!(queue.is_empty());
    }

    #[test]
    fn only_recognized_errors_keep_their_text() {
        assert_eq!(
            failure_reason(&TicketbotError::delivery("recipient is empty")),
            "recipient is empty"
        );
        assert_eq!(
            failure_reason(&TicketbotError::Config("credential 3 is disabled".into())),
            "credential 3 is disabled"
        );
        assert_eq!(
            failure_reason(&TicketbotError::Internal("panic".into())),
            SYSTEM_ERROR
        );
    }
}
