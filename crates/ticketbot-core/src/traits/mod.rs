// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seam traits between the Ticketbot crates.
//!
//! Implementations live in the crates that own the concern: the AES cipher
//! in `ticketbot-vault`, platform senders in `ticketbot-notify`.

pub mod cipher;
pub mod provider;

pub use cipher::TokenCipher;
pub use provider::NotificationProvider;
