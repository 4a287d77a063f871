// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Ticketbot support backend.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! connection via `tokio-rusqlite`, bounded retries on lock contention, and
//! typed operations for channels, credentials, settings, tickets, and the
//! outbound notification table.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod retry;

pub use database::Database;
pub use models::*;
pub use retry::{RetryPolicy, StorageFailure};
