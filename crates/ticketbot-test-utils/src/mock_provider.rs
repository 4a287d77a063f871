// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording notification provider for deterministic testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ticketbot_core::{NotificationProvider, Platform, TicketbotError};

/// One captured `send` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub recipient: String,
    pub message: String,
    pub extra: serde_json::Value,
}

/// A provider that records every send.
///
/// Scripted outcomes are popped from a FIFO queue; when the queue is empty
/// the send succeeds. Clones share the same recording.
#[derive(Clone)]
pub struct RecordingProvider {
    platform: Platform,
    sent: Arc<Mutex<Vec<SentMessage>>>,
    outcomes: Arc<Mutex<VecDeque<Result<(), TicketbotError>>>>,
    delay: Option<Duration>,
}

impl RecordingProvider {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            sent: Arc::new(Mutex::new(Vec::new())),
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            delay: None,
        }
    }

    /// Sleep this long inside every send, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue the outcome of a future send.
    pub fn push_outcome(&self, outcome: Result<(), TicketbotError>) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push_back(outcome);
        }
    }

    /// Everything sent so far.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationProvider for RecordingProvider {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn send(
        &self,
        recipient: &str,
        message: &str,
        extra: &serde_json::Value,
    ) -> Result<(), TicketbotError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMessage {
                recipient: recipient.to_string(),
                message: message.to_string(),
                extra: extra.clone(),
            });
        }
        let outcome = self
            .outcomes
            .lock()
            .ok()
            .and_then(|mut outcomes| outcomes.pop_front());
        outcome.unwrap_or(Ok(()))
    }
}
