// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ticketbot.toml` > `~/.config/ticketbot/ticketbot.toml`
//! > `/etc/ticketbot/ticketbot.toml` with environment variable overrides via
//! the `TICKETBOT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::TicketbotConfig;

/// Config sections addressable from the environment.
const SECTIONS: [&str; 6] = [
    "service",
    "storage",
    "attachments",
    "intake",
    "notify",
    "vault",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ticketbot/ticketbot.toml` (system-wide)
/// 3. `~/.config/ticketbot/ticketbot.toml` (user XDG config)
/// 4. `./ticketbot.toml` (local directory)
/// 5. `TICKETBOT_*` environment variables
pub fn load_config() -> Result<TicketbotConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TicketbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TicketbotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TicketbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TicketbotConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TicketbotConfig::default()))
        .merge(Toml::file("/etc/ticketbot/ticketbot.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("ticketbot/ticketbot.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("ticketbot.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `TICKETBOT_NOTIFY_DRY_RUN` must map to `notify.dry_run`,
/// not `notify.dry.run`. Variables outside the known sections (such as the
/// token key itself) are ignored so `deny_unknown_fields` does not trip.
fn env_provider() -> Env {
    Env::prefixed("TICKETBOT_")
        .filter(|key| is_section_key(key.as_str()))
        .map(|key| map_env_key(key.as_str()).into())
}

fn is_section_key(key: &str) -> bool {
    SECTIONS.iter().any(|section| {
        key.strip_prefix(section)
            .is_some_and(|rest| rest.starts_with('_'))
    })
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("notify_dry_run"), "notify.dry_run");
        assert_eq!(
            map_env_key("storage_busy_timeout_ms"),
            "storage.busy_timeout_ms"
        );
        assert_eq!(map_env_key("attachments_temp_dir"), "attachments.temp_dir");
    }

    #[test]
    fn unknown_sections_pass_through() {
        assert_eq!(map_env_key("token_key"), "token_key");
    }

    #[test]
    fn only_section_keys_are_loaded() {
        assert!(is_section_key("notify_dry_run"));
        assert!(!is_section_key("token_key"));
        assert!(!is_section_key("notifyx"));
    }

    #[test]
    fn env_override_flips_dry_run() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TICKETBOT_NOTIFY_DRY_RUN", "false");
            jail.set_env("TICKETBOT_INTAKE_QUICK_REPLY_LIMIT", "4");
            jail.set_env("TICKETBOT_TOKEN_KEY", "00ff");
            let config: TicketbotConfig = Figment::new()
                .merge(Serialized::defaults(TicketbotConfig::default()))
                .merge(env_provider())
                .extract()?;
            assert!(!config.notify.dry_run);
            assert_eq!(config.intake.quick_reply_limit, 4);
            Ok(())
        });
    }
}
