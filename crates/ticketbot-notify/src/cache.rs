// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decrypted credential cache owned by the provider factory.

use std::sync::Arc;

use dashmap::DashMap;
use secrecy::SecretString;
use ticketbot_core::{Platform, TicketbotError, TokenCipher};
use ticketbot_storage::Database;
use ticketbot_storage::queries::credentials::get_credential;

/// A credential with its token decrypted.
pub struct CachedCredential {
    pub id: i64,
    pub platform: Platform,
    pub token: SecretString,
    pub extra: serde_json::Value,
}

impl std::fmt::Debug for CachedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedCredential")
            .field("id", &self.id)
            .field("platform", &self.platform)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Decrypted credentials keyed by id.
///
/// Entries live until [`invalidate`](Self::invalidate) or
/// [`clear`](Self::clear) is called, e.g. after a token rotation or a
/// credential being disabled.
#[derive(Default)]
pub struct CredentialCache {
    entries: DashMap<i64, Arc<CachedCredential>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached credential or load, check, and decrypt it.
    ///
    /// Missing, inactive, and undecryptable credentials are configuration
    /// errors and are not cached.
    pub async fn get_or_load(
        &self,
        db: &Database,
        cipher: &dyn TokenCipher,
        id: i64,
    ) -> Result<Arc<CachedCredential>, TicketbotError> {
        if let Some(hit) = self.entries.get(&id) {
            return Ok(hit.value().clone());
        }

        let credential = get_credential(db, id)
            .await?
            .ok_or_else(|| TicketbotError::Config(format!("credential {id} not found")))?;
        if !credential.is_active {
            return Err(TicketbotError::Config(format!("credential {id} is disabled")));
        }
        let token = cipher
            .decrypt(&credential.encrypted_token)
            .map_err(|e| TicketbotError::Config(format!("credential {id} cannot be decrypted: {e}")))?;

        let loaded = Arc::new(CachedCredential {
            id,
            platform: credential.platform,
            token: SecretString::from(token),
            extra: credential.extra,
        });
        self.entries.insert(id, loaded.clone());
        tracing::debug!(credential_id = id, platform = %loaded.platform, "credential cached");
        Ok(loaded)
    }

    /// Forget one credential.
    pub fn invalidate(&self, id: i64) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use ticketbot_storage::queries::credentials::{
        insert_credential, set_credential_active, update_credential_token,
    };
    use ticketbot_test_utils::{PlaintextCipher, TestDb};

    #[tokio::test]
    async fn loads_once_until_invalidated() {
        let test_db = TestDb::new().await.unwrap();
        let db = &test_db.db;
        let id = insert_credential(db, Platform::Slack, "plain:xoxb-1", &serde_json::json!({}))
            .await
            .unwrap();
        let cache = CredentialCache::new();

        let first = cache.get_or_load(db, &PlaintextCipher, id).await.unwrap();
        assert_eq!(first.token.expose_secret(), "xoxb-1");

        update_credential_token(db, id, "plain:xoxb-2").await.unwrap();
        let cached = cache.get_or_load(db, &PlaintextCipher, id).await.unwrap();
        assert_eq!(cached.token.expose_secret(), "xoxb-1");

        assert!(cache.invalidate(id));
        let fresh = cache.get_or_load(db, &PlaintextCipher, id).await.unwrap();
        assert_eq!(fresh.token.expose_secret(), "xoxb-2");
    }

    #[tokio::test]
    async fn unusable_credentials_are_config_errors() {
        let test_db = TestDb::new().await.unwrap();
        let db = &test_db.db;
        let cache = CredentialCache::new();

        let missing = cache.get_or_load(db, &PlaintextCipher, 99).await.unwrap_err();
        assert!(matches!(missing, TicketbotError::Config(_)));

        let garbled = insert_credential(db, Platform::Telegram, "garbled", &serde_json::json!({}))
            .await
            .unwrap();
        let err = cache.get_or_load(db, &PlaintextCipher, garbled).await.unwrap_err();
        assert!(err.to_string().contains("cannot be decrypted"));

        let disabled = insert_credential(db, Platform::Telegram, "plain:t", &serde_json::json!({}))
            .await
            .unwrap();
        set_credential_active(db, disabled, false).await.unwrap();
        let err = cache.get_or_load(db, &PlaintextCipher, disabled).await.unwrap_err();
        assert!(err.to_string().contains("disabled"));
        assert!(cache.is_empty());
    }

    #[test]
    fn debug_hides_token() {
        let credential = CachedCredential {
            id: 1,
            platform: Platform::Slack,
            token: SecretString::from("xoxb-secret"),
            extra: serde_json::Value::Null,
        };
        assert!(!format!("{credential:?}").contains("xoxb-secret"));
    }
}
