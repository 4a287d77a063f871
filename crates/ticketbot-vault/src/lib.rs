// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM encryption of bot tokens at rest.
//!
//! Credential rows only ever hold ciphertext. The 32-byte key is supplied
//! out of band through an environment variable and kept in zeroizing memory.

pub mod cipher;
pub mod crypto;
pub mod key;

pub use cipher::AesGcmTokenCipher;
pub use key::{generate_key_hex, load_key};

/// Mask a secret for display, keeping only a short prefix and suffix.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
