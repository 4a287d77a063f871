// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`TokenCipher`] backed by AES-256-GCM.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ticketbot_config::model::VaultConfig;
use ticketbot_core::{TicketbotError, TokenCipher};
use zeroize::Zeroizing;

use crate::crypto::{open, seal};
use crate::key::load_key;

/// Encrypts tokens as base64 of `nonce || ciphertext || tag`.
pub struct AesGcmTokenCipher {
    key: Zeroizing<[u8; 32]>,
}

impl AesGcmTokenCipher {
    /// Build a cipher from raw key material.
    pub fn new(key: Zeroizing<[u8; 32]>) -> Self {
        Self { key }
    }

    /// Build a cipher from the key named by the `[vault]` section.
    pub fn from_config(config: &VaultConfig) -> Result<Self, TicketbotError> {
        let key = load_key(config)?;
        tracing::debug!(key_env = %config.key_env, "token cipher initialized");
        Ok(Self::new(key))
    }
}

impl std::fmt::Debug for AesGcmTokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmTokenCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl TokenCipher for AesGcmTokenCipher {
    fn encrypt(&self, token: &str) -> Result<String, TicketbotError> {
        let sealed = seal(&self.key, token.as_bytes())?;
        Ok(STANDARD.encode(sealed))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, TicketbotError> {
        let sealed = STANDARD
            .decode(ciphertext.trim())
            .map_err(|_| TicketbotError::Config("encrypted token is not valid base64".to_string()))?;
        let plaintext = Zeroizing::new(open(&self.key, &sealed)?);
        String::from_utf8(plaintext.to_vec())
            .map_err(|_| TicketbotError::Config("decrypted token is not UTF-8".to_string()))
    }
}
