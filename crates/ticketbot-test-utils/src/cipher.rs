// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A cipher for tests: tokens are stored with a visible prefix.

use ticketbot_core::{TicketbotError, TokenCipher};

const PREFIX: &str = "plain:";

/// Stores `plain:<token>`. Anything without the prefix fails to decrypt,
/// which lets tests exercise the decryption-failure path.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextCipher;

impl TokenCipher for PlaintextCipher {
    fn encrypt(&self, token: &str) -> Result<String, TicketbotError> {
        Ok(format!("{PREFIX}{token}"))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, TicketbotError> {
        ciphertext
            .strip_prefix(PREFIX)
            .map(str::to_string)
            .ok_or_else(|| TicketbotError::Config("token is not decryptable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_failure() {
        let stored = PlaintextCipher.encrypt("abc").unwrap();
        assert_eq!(PlaintextCipher.decrypt(&stored).unwrap(), "abc");
        assert!(PlaintextCipher.decrypt("abc").is_err());
    }
}
