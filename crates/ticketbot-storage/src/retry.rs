// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded retry of write transactions that hit SQLite lock contention.

use std::time::Duration;

use ticketbot_config::model::StorageConfig;
use ticketbot_core::TicketbotError;

/// Cap on the backoff exponent so a large retry budget cannot overflow.
const MAX_BACKOFF_SHIFT: u32 = 10;

/// Error raised inside a database closure.
///
/// The retry loop only needs to know whether a failure was caused by lock
/// contention and how to turn the rest into a [`TicketbotError`]. Callers
/// whose transactions also touch the filesystem implement this for their
/// own error enum.
pub trait StorageFailure: Send + 'static {
    /// Returns `true` for SQLITE_BUSY and SQLITE_LOCKED.
    fn is_busy(&self) -> bool;

    /// Converts a non-retryable failure into the crate-wide error type.
    fn into_error(self) -> TicketbotError;
}

impl StorageFailure for rusqlite::Error {
    fn is_busy(&self) -> bool {
        matches!(
            self,
            rusqlite::Error::SqliteFailure(err, _)
                if matches!(
                    err.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
        )
    }

    fn into_error(self) -> TicketbotError {
        TicketbotError::storage(self)
    }
}

/// Exponential backoff schedule for busy transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each further attempt.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Builds the policy from the `[storage]` section.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            max_attempts: config.busy_retries.max(1),
            base_delay: Duration::from_millis(config.busy_backoff_ms),
        }
    }

    /// Delay to wait after the given (zero-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * (1u32 << attempt.min(MAX_BACKOFF_SHIFT))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&StorageConfig::default())
    }
}
