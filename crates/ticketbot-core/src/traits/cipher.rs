// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token-at-rest encryption boundary.

use crate::error::TicketbotError;

/// Opaque encryption of bot tokens stored in `bot_credentials`.
///
/// Ciphertext is a printable string so it can be stored in a TEXT column.
pub trait TokenCipher: Send + Sync + 'static {
    /// Encrypts a clear-text token.
    fn encrypt(&self, token: &str) -> Result<String, TicketbotError>;

    /// Decrypts a stored ciphertext back into the clear-text token.
    fn decrypt(&self, ciphertext: &str) -> Result<String, TicketbotError>;
}
