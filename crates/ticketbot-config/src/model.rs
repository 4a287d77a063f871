// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Ticketbot backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Ticketbot configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TicketbotConfig {
    /// Process identity, logging, and HTTP gateway binding.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Attachment storage locations.
    #[serde(default)]
    pub attachments: AttachmentsConfig,

    /// Conversational intake settings.
    #[serde(default)]
    pub intake: IntakeConfig,

    /// Notification delivery settings.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Token-at-rest encryption settings.
    #[serde(default)]
    pub vault: VaultConfig,
}

/// Service identity and HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Address the inbound gateway binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port the inbound gateway listens on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_service_name() -> String {
    "ticketbot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8085
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// SQLite-level busy timeout before a statement reports SQLITE_BUSY.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// How many times a busy write transaction is retried.
    #[serde(default = "default_busy_retries")]
    pub busy_retries: u32,

    /// Base delay of the exponential backoff between busy retries.
    #[serde(default = "default_busy_backoff_ms")]
    pub busy_backoff_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
            busy_retries: default_busy_retries(),
            busy_backoff_ms: default_busy_backoff_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("ticketbot").join("ticketbot.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("ticketbot.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    1000
}

fn default_busy_retries() -> u32 {
    5
}

fn default_busy_backoff_ms() -> u64 {
    50
}

/// Attachment storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttachmentsConfig {
    /// Root directory; each ticket gets a subdirectory named after its id.
    #[serde(default = "default_attachments_root")]
    pub root_dir: String,

    /// Shared staging directory. Defaults to `<root_dir>/temp`.
    #[serde(default)]
    pub temp_dir: Option<String>,
}

impl AttachmentsConfig {
    /// Resolved staging directory.
    pub fn temp_dir(&self) -> std::path::PathBuf {
        match &self.temp_dir {
            Some(dir) => std::path::PathBuf::from(dir),
            None => std::path::Path::new(&self.root_dir).join("temp"),
        }
    }
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            root_dir: default_attachments_root(),
            temp_dir: None,
        }
    }
}

fn default_attachments_root() -> String {
    dirs::data_dir()
        .map(|p| p.join("ticketbot").join("attachments"))
        .unwrap_or_else(|| std::path::PathBuf::from("attachments"))
        .to_string_lossy()
        .into_owned()
}

/// Conversational intake configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IntakeConfig {
    /// Sessions idle for longer than this are dropped.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// How often the idle sweeper runs.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Option lists up to this size are offered as a quick-reply palette.
    #[serde(default = "default_quick_reply_limit")]
    pub quick_reply_limit: usize,

    /// Upper bound for rating scales.
    #[serde(default = "default_max_rating_scale")]
    pub max_rating_scale: u8,

    /// Case-insensitive keywords that abort the current intake.
    #[serde(default = "default_cancel_keywords")]
    pub cancel_keywords: Vec<String>,

    /// First message of a new conversation.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Prompt asking for the problem description.
    #[serde(default = "default_free_text_prompt")]
    pub free_text_prompt: String,

    /// Prefix of the re-prompt after an answer outside the option list.
    #[serde(default = "default_invalid_option_prompt")]
    pub invalid_option_prompt: String,

    /// Reply after a cancellation keyword.
    #[serde(default = "default_cancelled_message")]
    pub cancelled_message: String,

    /// Reply after ticket creation. `{ticket_id}` is substituted.
    #[serde(default = "default_ticket_created_message")]
    pub ticket_created_message: String,

    /// Notification text sent when staff resolve a ticket. `{ticket_id}` is substituted.
    #[serde(default = "default_resolved_message")]
    pub resolved_message: String,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            quick_reply_limit: default_quick_reply_limit(),
            max_rating_scale: default_max_rating_scale(),
            cancel_keywords: default_cancel_keywords(),
            greeting: default_greeting(),
            free_text_prompt: default_free_text_prompt(),
            invalid_option_prompt: default_invalid_option_prompt(),
            cancelled_message: default_cancelled_message(),
            ticket_created_message: default_ticket_created_message(),
            resolved_message: default_resolved_message(),
        }
    }
}

fn default_idle_timeout_secs() -> u64 {
    1800
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_quick_reply_limit() -> usize {
    10
}

fn default_max_rating_scale() -> u8 {
    10
}

fn default_cancel_keywords() -> Vec<String> {
    vec!["cancel".to_string(), "/cancel".to_string(), "stop".to_string()]
}

fn default_greeting() -> String {
    "Hello! Let's register your request.".to_string()
}

fn default_free_text_prompt() -> String {
    "Please describe the problem. You can attach photos or files.".to_string()
}

fn default_invalid_option_prompt() -> String {
    "Please pick one of the offered options.".to_string()
}

fn default_cancelled_message() -> String {
    "Request cancelled. Write again any time.".to_string()
}

fn default_ticket_created_message() -> String {
    "Thank you! Your request {ticket_id} has been registered.".to_string()
}

fn default_resolved_message() -> String {
    "Your request {ticket_id} has been resolved.".to_string()
}

/// Notification delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Log deliveries instead of calling platform APIs.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,

    /// Capacity of the in-memory notification queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Worker waits this long for an enqueued id before scanning storage.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum rows picked up per storage scan.
    #[serde(default = "default_scan_batch")]
    pub scan_batch: u32,

    /// Network timeout for a single provider call.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// An `in_progress` row older than this is treated as abandoned and
    /// may be claimed again. Must exceed `http_timeout_secs`.
    #[serde(default = "default_claim_lease_secs")]
    pub claim_lease_secs: u64,

    /// Telegram Bot API base URL override.
    #[serde(default)]
    pub telegram_api_base: Option<String>,

    /// Slack Web API base URL override.
    #[serde(default)]
    pub slack_api_base: Option<String>,

    /// WhatsApp Cloud API base URL override.
    #[serde(default)]
    pub whatsapp_api_base: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            dry_run: default_dry_run(),
            queue_capacity: default_queue_capacity(),
            poll_interval_ms: default_poll_interval_ms(),
            scan_batch: default_scan_batch(),
            http_timeout_secs: default_http_timeout_secs(),
            claim_lease_secs: default_claim_lease_secs(),
            telegram_api_base: None,
            slack_api_base: None,
            whatsapp_api_base: None,
        }
    }
}

fn default_dry_run() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_scan_batch() -> u32 {
    100
}

fn default_http_timeout_secs() -> u64 {
    15
}

fn default_claim_lease_secs() -> u64 {
    300
}

/// Token-at-rest encryption configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Name of the environment variable holding the hex-encoded 32-byte key.
    #[serde(default = "default_key_env")]
    pub key_env: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            key_env: default_key_env(),
        }
    }
}

fn default_key_env() -> String {
    "TICKETBOT_TOKEN_KEY".to_string()
}
