// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the intake, storage, and notification crates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Timestamp format shared with SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current UTC time in the storage timestamp format.
pub fn now_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// UTC time `age` ago in the storage timestamp format. Comparable as a
/// string with stored timestamps.
pub fn timestamp_ago(age: std::time::Duration) -> String {
    let now = chrono::Utc::now();
    chrono::TimeDelta::from_std(age)
        .ok()
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Chat platforms a channel can live on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Telegram,
    Slack,
    Whatsapp,
    Webhook,
}

/// What a platform can render, resolved once from a static table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Platform can show a palette of tappable answers next to the text.
    pub quick_replies: bool,
    /// Upper bound on palette entries the platform accepts.
    pub max_quick_replies: usize,
    /// Platform can deliver user files to the bot.
    pub attachments: bool,
    /// Longest text body accepted by a single send call.
    pub max_message_len: usize,
}

impl Platform {
    /// Returns the capability row for this platform.
    pub const fn capabilities(self) -> PlatformCapabilities {
        match self {
            Platform::Telegram => PlatformCapabilities {
                quick_replies: true,
                max_quick_replies: 12,
                attachments: true,
                max_message_len: 4096,
            },
            Platform::Slack => PlatformCapabilities {
                quick_replies: true,
                max_quick_replies: 25,
                attachments: true,
                max_message_len: 40_000,
            },
            Platform::Whatsapp => PlatformCapabilities {
                quick_replies: true,
                max_quick_replies: 3,
                attachments: true,
                max_message_len: 4096,
            },
            Platform::Webhook => PlatformCapabilities {
                quick_replies: false,
                max_quick_replies: 0,
                attachments: false,
                max_message_len: usize::MAX,
            },
        }
    }
}

/// Lifecycle status of a ticket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Pending,
    InProgress,
    Resolved,
}

/// Delivery status of a notification row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Retry,
    InProgress,
    Done,
    Failed,
}

impl NotificationStatus {
    /// Statuses the worker is allowed to pick up.
    pub const CLAIMABLE: [NotificationStatus; 3] = [
        NotificationStatus::Pending,
        NotificationStatus::Retry,
        NotificationStatus::InProgress,
    ];

    /// Returns `true` if a worker may claim a notification in this status.
    pub fn is_claimable(self) -> bool {
        Self::CLAIMABLE.contains(&self)
    }

    /// Returns `true` once no further processing will happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, NotificationStatus::Done | NotificationStatus::Failed)
    }
}

/// A persisted support ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub status: TicketStatus,
    pub created_at: String,
    pub resolved_at: Option<String>,
    pub resolved_by: Option<String>,
    pub reopen_count: i64,
    pub closed_count: i64,
    pub rating_pending: bool,
}

/// A persisted outbound notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub channel_id: String,
    pub recipient: String,
    pub payload: String,
    pub status: NotificationStatus,
    pub attempts: i64,
    pub scheduled_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub error: Option<String>,
}

/// A support channel: one bot on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    pub platform: Platform,
    pub credential_id: Option<i64>,
    pub question_template_id: Option<String>,
    pub rating_template_id: Option<String>,
    /// Free-form JSON settings (extra provider fields, texts).
    pub settings: serde_json::Value,
}

/// A stored bot credential. The token never leaves storage in clear text.
#[derive(Clone, PartialEq, Eq)]
pub struct BotCredential {
    pub id: i64,
    pub platform: Platform,
    pub encrypted_token: String,
    pub extra: serde_json::Value,
    pub is_active: bool,
}

impl std::fmt::Debug for BotCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotCredential")
            .field("id", &self.id)
            .field("platform", &self.platform)
            .field("encrypted_token", &"[REDACTED]")
            .field("is_active", &self.is_active)
            .finish()
    }
}

/// A file the platform adapter downloaded into the staging area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedAttachment {
    /// Original filename as sent by the user.
    pub file_name: String,
    /// Location under the shared `temp/` staging directory.
    pub temp_path: PathBuf,
}

/// A normalized inbound message from any platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub channel_id: String,
    pub platform_user_id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<StagedAttachment>,
}

impl InboundEvent {
    /// Convenience constructor for a text-only event.
    pub fn text(channel_id: &str, user_id: &str, text: &str) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            platform_user_id: user_id.to_string(),
            text: Some(text.to_string()),
            attachments: Vec::new(),
        }
    }

    /// Trimmed text, or `None` when the event has no non-blank text.
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// A message the engine wants delivered back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    /// Tappable answers offered next to the text. Empty when not applicable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<String>,
}

impl Reply {
    /// A plain text reply without a palette.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quick_replies: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn platform_parses_snake_case() {
        assert_eq!(Platform::from_str("telegram").unwrap(), Platform::Telegram);
        assert_eq!(Platform::from_str("whatsapp").unwrap(), Platform::Whatsapp);
        assert!(Platform::from_str("fax").is_err());
    }

    #[test]
    fn platform_display_roundtrips() {
        for platform in Platform::iter() {
            let parsed = Platform::from_str(&platform.to_string()).unwrap();
            assert_eq!(parsed, platform);
        }
    }

    #[test]
    fn webhook_has_no_quick_replies() {
        let caps = Platform::Webhook.capabilities();
        assert!(!caps.quick_replies);
        assert_eq!(caps.max_quick_replies, 0);
    }

    #[test]
    fn notification_status_strings_match_storage() {
        assert_eq!(NotificationStatus::InProgress.to_string(), "in_progress");
        assert_eq!(
            NotificationStatus::from_str("retry").unwrap(),
            NotificationStatus::Retry
        );
    }

    #[test]
    fn only_done_and_failed_are_terminal() {
        assert!(NotificationStatus::Done.is_terminal());
        assert!(NotificationStatus::Failed.is_terminal());
        assert!(!NotificationStatus::Retry.is_terminal());
        assert!(NotificationStatus::InProgress.is_claimable());
        assert!(!NotificationStatus::Done.is_claimable());
    }

    #[test]
    fn timestamp_ago_sorts_before_now() {
        let earlier = timestamp_ago(std::time::Duration::from_secs(60));
        assert!(earlier < now_timestamp());
        assert_eq!(earlier.len(), now_timestamp().len());
    }

    #[test]
    fn trimmed_text_ignores_whitespace() {
        let mut event = InboundEvent::text("c1", "u1", "   ");
        assert_eq!(event.trimmed_text(), None);
        event.text = Some("  hi ".into());
        assert_eq!(event.trimmed_text(), Some("hi"));
    }

    #[test]
    fn credential_debug_redacts_token() {
        let cred = BotCredential {
            id: 1,
            platform: Platform::Telegram,
            encrypted_token: "ciphertext".into(),
            extra: serde_json::Value::Null,
            is_active: true,
        };
        let debug = format!("{cred:?}");
        assert!(!debug.contains("ciphertext"));
        assert!(debug.contains("REDACTED"));
    }
}
