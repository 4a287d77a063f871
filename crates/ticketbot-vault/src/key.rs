// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token key acquisition from the environment.

use secrecy::{ExposeSecret, SecretString};
use ticketbot_config::model::VaultConfig;
use ticketbot_core::TicketbotError;
use zeroize::Zeroizing;

use crate::crypto::generate_random_key;

/// Read the hex-encoded 32-byte key from the variable named by `vault.key_env`.
pub fn load_key(config: &VaultConfig) -> Result<Zeroizing<[u8; 32]>, TicketbotError> {
    let raw = match std::env::var(&config.key_env) {
        Ok(value) if !value.trim().is_empty() => SecretString::from(value),
        _ => {
            return Err(TicketbotError::Config(format!(
                "token key not set: export {} with a 64-character hex key",
                config.key_env
            )));
        }
    };
    parse_key_hex(raw.expose_secret().trim())
}

/// Decode a 64-character hex string into a key.
pub fn parse_key_hex(encoded: &str) -> Result<Zeroizing<[u8; 32]>, TicketbotError> {
    let mut key = Zeroizing::new([0u8; 32]);
    hex::decode_to_slice(encoded, key.as_mut_slice()).map_err(|_| {
        TicketbotError::Config("token key must be 64 hex characters (32 bytes)".to_string())
    })?;
    Ok(key)
}

/// Generate a fresh key, hex-encoded, for `ticketbot keygen`.
pub fn generate_key_hex() -> Result<SecretString, TicketbotError> {
    let key = Zeroizing::new(generate_random_key()?);
    Ok(SecretString::from(hex::encode(key.as_slice())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV: &str = "TICKETBOT_TEST_TOKEN_KEY";

    fn config() -> VaultConfig {
        VaultConfig {
            key_env: ENV.to_string(),
        }
    }

    #[test]
    #[serial]
    fn loads_key_from_named_variable() {
        let hex_key = "11".repeat(32);
        // SAFETY: serialized test; no other thread reads this variable.
        unsafe { std::env::set_var(ENV, &hex_key) };
        let key = load_key(&config()).unwrap();
        assert_eq!(*key, [0x11u8; 32]);
        unsafe { std::env::remove_var(ENV) };
    }

    #[test]
    #[serial]
    fn missing_variable_is_config_error() {
        unsafe { std::env::remove_var(ENV) };
        let err = load_key(&config()).unwrap_err();
        assert!(err.to_string().contains(ENV));
    }

    #[test]
    fn rejects_wrong_length_and_non_hex() {
        assert!(parse_key_hex("abcd").is_err());
        assert!(parse_key_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn generated_keys_parse_back() {
        let generated = generate_key_hex().unwrap();
        assert_eq!(generated.expose_secret().len(), 64);
        assert!(parse_key_hex(generated.expose_secret()).is_ok());
    }
}
