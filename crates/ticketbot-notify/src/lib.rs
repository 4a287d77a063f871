// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound notification delivery for the Ticketbot support backend.
//!
//! Producers write `channel_notifications` rows and hand their ids to the
//! [`NotificationQueue`]. A single [`NotificationWorker`] claims each row,
//! asks a [`ProviderSource`] for the channel's sender, and records the
//! outcome. Rows that never reach the in-memory queue are found by a
//! periodic storage scan.

pub mod cache;
pub mod factory;
pub mod payload;
pub mod providers;
pub mod queue;

pub use cache::{CachedCredential, CredentialCache};
pub use factory::{ApiEndpoints, ProviderFactory, ProviderSource};
pub use payload::NotificationPayload;
pub use queue::{NotificationInbox, NotificationQueue, NotificationWorker, ProcessOutcome};
