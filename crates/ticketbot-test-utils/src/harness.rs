// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temp-dir database fixture.
//!
//! `TestDb` owns a fresh SQLite database and an attachments root inside one
//! temporary directory, seeded with a single channel and (optionally) a
//! credential and intake settings.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use ticketbot_config::model::AttachmentsConfig;
use ticketbot_core::{ChannelRecord, Platform, StagedAttachment, TicketbotError, TokenCipher};
use ticketbot_storage::Database;
use ticketbot_storage::models::{
    SETTINGS_PRESET_CATALOGUE, SETTINGS_PRESET_SCHEMA, SETTINGS_QUESTIONNAIRE,
};
use ticketbot_storage::queries::{channels, credentials, settings};

use crate::cipher::PlaintextCipher;

/// Channel id seeded by default.
pub const TEST_CHANNEL: &str = "support";

/// Builder for creating seeded test databases.
pub struct TestDbBuilder {
    platform: Platform,
    token: Option<String>,
    credential_extra: serde_json::Value,
    catalogue: Option<serde_json::Value>,
    schema: Option<serde_json::Value>,
    questionnaire: Option<serde_json::Value>,
    question_template_id: Option<String>,
    rating_template_id: Option<String>,
}

impl TestDbBuilder {
    fn new() -> Self {
        Self {
            platform: Platform::Telegram,
            token: None,
            credential_extra: serde_json::json!({}),
            catalogue: None,
            schema: None,
            questionnaire: None,
            question_template_id: None,
            rating_template_id: None,
        }
    }

    /// Platform of the seeded channel.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Seed an active credential, stored through [`PlaintextCipher`].
    pub fn with_credential(mut self, token: &str, extra: serde_json::Value) -> Self {
        self.token = Some(token.to_string());
        self.credential_extra = extra;
        self
    }

    /// Seed the preset catalogue document.
    pub fn with_catalogue(mut self, catalogue: serde_json::Value) -> Self {
        self.catalogue = Some(catalogue);
        self
    }

    /// Seed the preset schema document.
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Seed the questionnaire document.
    pub fn with_questionnaire(mut self, questionnaire: serde_json::Value) -> Self {
        self.questionnaire = Some(questionnaire);
        self
    }

    /// Select templates on the seeded channel.
    pub fn with_channel_templates(mut self, question: Option<&str>, rating: Option<&str>) -> Self {
        self.question_template_id = question.map(str::to_string);
        self.rating_template_id = rating.map(str::to_string);
        self
    }

    /// Create the database and apply the seed.
    pub async fn build(self) -> Result<TestDb, TicketbotError> {
        let dir = TempDir::new().map_err(TicketbotError::storage)?;
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;

        let credential_id = match &self.token {
            Some(token) => Some(
                credentials::insert_credential(
                    &db,
                    self.platform,
                    &PlaintextCipher.encrypt(token)?,
                    &self.credential_extra,
                )
                .await?,
            ),
            None => None,
        };

        let channel = ChannelRecord {
            id: TEST_CHANNEL.to_string(),
            name: "Support".to_string(),
            platform: self.platform,
            credential_id,
            question_template_id: self.question_template_id,
            rating_template_id: self.rating_template_id,
            settings: serde_json::json!({}),
        };
        channels::upsert_channel(&db, &channel).await?;

        for (key, value) in [
            (SETTINGS_PRESET_CATALOGUE, &self.catalogue),
            (SETTINGS_PRESET_SCHEMA, &self.schema),
            (SETTINGS_QUESTIONNAIRE, &self.questionnaire),
        ] {
            if let Some(value) = value {
                settings::put_setting(&db, key, value).await?;
            }
        }

        Ok(TestDb {
            db,
            channel,
            credential_id,
            dir,
        })
    }
}

/// A seeded database living in a temporary directory.
pub struct TestDb {
    pub db: Database,
    pub channel: ChannelRecord,
    pub credential_id: Option<i64>,
    dir: TempDir,
}

impl TestDb {
    pub fn builder() -> TestDbBuilder {
        TestDbBuilder::new()
    }

    /// A database with the default channel and nothing else.
    pub async fn new() -> Result<Self, TicketbotError> {
        Self::builder().build().await
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Attachment settings rooted inside the temp directory.
    pub fn attachments(&self) -> AttachmentsConfig {
        AttachmentsConfig {
            root_dir: self.dir.path().join("attachments").to_string_lossy().into_owned(),
            temp_dir: None,
        }
    }

    /// Write a file into the staging area, as a platform adapter would.
    pub async fn stage_file(
        &self,
        file_name: &str,
        contents: &[u8],
    ) -> Result<StagedAttachment, TicketbotError> {
        let staging = self.attachments().temp_dir();
        tokio::fs::create_dir_all(&staging)
            .await
            .map_err(TicketbotError::storage)?;
        let temp_path: PathBuf = staging.join(format!(
            "{}-{file_name}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default()
        ));
        tokio::fs::write(&temp_path, contents)
            .await
            .map_err(TicketbotError::storage)?;
        Ok(StagedAttachment {
            file_name: file_name.to_string(),
            temp_path,
        })
    }
}
