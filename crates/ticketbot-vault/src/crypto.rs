// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the system
//! CSPRNG and returns `nonce || ciphertext || tag` as one buffer, so a stored
//! token is a single opaque column.

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use ticketbot_core::TicketbotError;

fn cipher_key(key: &[u8; 32]) -> Result<LessSafeKey, TicketbotError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| TicketbotError::Config("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt plaintext. The output starts with the nonce.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, TicketbotError> {
    let key = cipher_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| TicketbotError::Internal("failed to generate random nonce".to_string()))?;

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(
        Nonce::assume_unique_for_key(nonce_bytes),
        Aad::empty(),
        &mut in_out,
    )
    .map_err(|_| TicketbotError::Internal("AES-256-GCM encryption failed".to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&in_out);
    Ok(sealed)
}

/// Decrypt a buffer produced by [`seal`].
///
/// Fails if the buffer is truncated, the key is wrong, or the data was tampered with.
pub fn open(key: &[u8; 32], sealed: &[u8]) -> Result<Vec<u8>, TicketbotError> {
    if sealed.len() < NONCE_LEN + AES_256_GCM.tag_len() {
        return Err(TicketbotError::Config(
            "encrypted token is truncated".to_string(),
        ));
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| TicketbotError::Config("encrypted token has a bad nonce".to_string()))?;

    let key = cipher_key(key)?;
    let mut in_out = ciphertext.to_vec();
    let plaintext = key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| {
            TicketbotError::Config(
                "token decryption failed: wrong key or corrupted data".to_string(),
            )
        })?;
    Ok(plaintext.to_vec())
}

/// Generate a random 32-byte key suitable for AES-256-GCM.
pub fn generate_random_key() -> Result<[u8; 32], TicketbotError> {
    let mut key = [0u8; 32];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| TicketbotError::Internal("failed to generate random key".to_string()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let key = generate_random_key().unwrap();
        let sealed = seal(&key, b"123456:bot-token").unwrap();
        assert_eq!(open(&key, &sealed).unwrap(), b"123456:bot-token");
    }

    #[test]
    fn same_plaintext_seals_differently() {
        let key = generate_random_key().unwrap();
        assert_ne!(seal(&key, b"same").unwrap(), seal(&key, b"same").unwrap());
    }

    #[test]
    fn sealed_length_includes_nonce_and_tag() {
        let key = generate_random_key().unwrap();
        let sealed = seal(&key, b"hello").unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + 5 + AES_256_GCM.tag_len());
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = seal(&generate_random_key().unwrap(), b"secret").unwrap();
        let err = open(&generate_random_key().unwrap(), &sealed).unwrap_err();
        assert!(matches!(err, TicketbotError::Config(_)));
    }

    #[test]
    fn tampered_or_truncated_input_fails() {
        let key = generate_random_key().unwrap();
        let mut sealed = seal(&key, b"do not tamper").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(open(&key, &sealed).is_err());
        assert!(open(&key, &sealed[..8]).is_err());
    }
}
