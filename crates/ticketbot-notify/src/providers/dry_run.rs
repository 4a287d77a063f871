// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logs deliveries instead of making them.

use async_trait::async_trait;
use ticketbot_core::{NotificationProvider, Platform, TicketbotError};

/// Stand-in used while `notify.dry_run` is on.
#[derive(Debug, Clone)]
pub struct DryRunProvider {
    platform: Platform,
}

impl DryRunProvider {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl NotificationProvider for DryRunProvider {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn send(
        &self,
        recipient: &str,
        message: &str,
        _extra: &serde_json::Value,
    ) -> Result<(), TicketbotError> {
        tracing::info!(
            platform = %self.platform,
            recipient,
            chars = message.chars().count(),
            "dry run: notification not sent"
        );
        Ok(())
    }
}
