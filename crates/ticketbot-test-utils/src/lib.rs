// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Ticketbot integration tests.
//!
//! Provides mock collaborators and a seeded database fixture for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`RecordingProvider`] - Notification provider that records sends and can be scripted to fail
//! - [`PlaintextCipher`] - Reversible, non-secret [`TokenCipher`](ticketbot_core::TokenCipher)
//! - [`TestDb`] - Temp-dir SQLite database with channel, credential, and settings seeding

pub mod cipher;
pub mod harness;
pub mod mock_provider;

pub use cipher::PlaintextCipher;
pub use harness::{TestDb, TestDbBuilder};
pub use mock_provider::{RecordingProvider, SentMessage};
