// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds platform providers from stored credentials.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use ticketbot_config::model::NotifyConfig;
use ticketbot_core::{ChannelRecord, NotificationProvider, Platform, TicketbotError, TokenCipher};
use ticketbot_storage::Database;

use crate::cache::CredentialCache;
use crate::providers::slack::SLACK_API_BASE;
use crate::providers::telegram::TELEGRAM_API_BASE;
use crate::providers::whatsapp::WHATSAPP_API_BASE;
use crate::providers::{
    DryRunProvider, SlackProvider, TelegramProvider, WebhookProvider, WhatsappProvider,
};

/// Where the worker gets a sender for a channel.
#[async_trait]
pub trait ProviderSource: Send + Sync {
    async fn provider_for(
        &self,
        channel: &ChannelRecord,
    ) -> Result<Arc<dyn NotificationProvider>, TicketbotError>;
}

/// Platform API base URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    pub telegram: String,
    pub slack: String,
    pub whatsapp: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            telegram: TELEGRAM_API_BASE.to_string(),
            slack: SLACK_API_BASE.to_string(),
            whatsapp: WHATSAPP_API_BASE.to_string(),
        }
    }
}

impl ApiEndpoints {
    pub fn from_config(config: &NotifyConfig) -> Self {
        let defaults = Self::default();
        Self {
            telegram: config.telegram_api_base.clone().unwrap_or(defaults.telegram),
            slack: config.slack_api_base.clone().unwrap_or(defaults.slack),
            whatsapp: config.whatsapp_api_base.clone().unwrap_or(defaults.whatsapp),
        }
    }
}

pub struct ProviderFactory {
    db: Database,
    cipher: Arc<dyn TokenCipher>,
    cache: CredentialCache,
    client: reqwest::Client,
    endpoints: ApiEndpoints,
    dry_run: bool,
}

impl ProviderFactory {
    pub fn new(
        db: Database,
        cipher: Arc<dyn TokenCipher>,
        client: reqwest::Client,
        endpoints: ApiEndpoints,
        dry_run: bool,
    ) -> Self {
        Self {
            db,
            cipher,
            cache: CredentialCache::new(),
            client,
            endpoints,
            dry_run,
        }
    }

    pub fn from_config(
        db: Database,
        cipher: Arc<dyn TokenCipher>,
        config: &NotifyConfig,
    ) -> Result<Self, TicketbotError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| TicketbotError::Config(format!("failed to build HTTP client: {e}")))?;
        if config.dry_run {
            tracing::warn!("notification dry run is on, nothing will be delivered");
        }
        Ok(Self::new(
            db,
            cipher,
            client,
            ApiEndpoints::from_config(config),
            config.dry_run,
        ))
    }

    /// The credential cache, for invalidation after rotation.
    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Build a sender for `platform` from the given credential.
    ///
    /// The credential must exist, be active, decrypt, and belong to the
    /// same platform. Under dry run the credential is still checked.
    pub async fn build(
        &self,
        platform: Platform,
        credential_id: Option<i64>,
    ) -> Result<Arc<dyn NotificationProvider>, TicketbotError> {
        let id = credential_id.ok_or_else(|| {
            TicketbotError::Config(format!("no credential configured for {platform} channel"))
        })?;
        let credential = self
            .cache
            .get_or_load(&self.db, self.cipher.as_ref(), id)
            .await?;
        if credential.platform != platform {
            return Err(TicketbotError::Config(format!(
                "credential {id} is for {}, not {platform}",
                credential.platform
            )));
        }

        if self.dry_run {
            return Ok(Arc::new(DryRunProvider::new(platform)));
        }
        let client = self.client.clone();
        let token = SecretString::from(credential.token.expose_secret());
        let provider: Arc<dyn NotificationProvider> = match platform {
            Platform::Telegram => Arc::new(TelegramProvider::new(
                client,
                &self.endpoints.telegram,
                token,
            )),
            Platform::Slack => Arc::new(SlackProvider::new(client, &self.endpoints.slack, token)),
            Platform::Whatsapp => Arc::new(WhatsappProvider::new(
                client,
                &self.endpoints.whatsapp,
                token,
                credential.extra.clone(),
            )),
            Platform::Webhook => Arc::new(WebhookProvider::new(
                client,
                token,
                credential.extra.clone(),
            )),
        };
        Ok(provider)
    }
}

#[async_trait]
impl ProviderSource for ProviderFactory {
    async fn provider_for(
        &self,
        channel: &ChannelRecord,
    ) -> Result<Arc<dyn NotificationProvider>, TicketbotError> {
        self.build(channel.platform, channel.credential_id).await
    }
}
