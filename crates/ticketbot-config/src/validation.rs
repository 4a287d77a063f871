// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, bounded scales, and sane polling intervals.

use crate::diagnostic::ConfigError;
use crate::model::TicketbotConfig;

/// Hard upper bound for rating scales, regardless of configuration.
pub const RATING_SCALE_CEILING: u8 = 10;

/// Lowest accepted worker poll interval.
const MIN_POLL_INTERVAL_MS: u64 = 100;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TicketbotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let addr = config.service.bind_address.trim();
    if addr.is_empty() {
        fail("service.bind_address must not be empty".to_string());
    } else if addr.parse::<std::net::IpAddr>().is_err()
        && !addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        fail(format!(
            "service.bind_address `{addr}` is not a valid IP address or hostname"
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.attachments.root_dir.trim().is_empty() {
        fail("attachments.root_dir must not be empty".to_string());
    }

    if config.intake.quick_reply_limit == 0 {
        fail("intake.quick_reply_limit must be at least 1".to_string());
    }

    let scale = config.intake.max_rating_scale;
    if scale == 0 || scale > RATING_SCALE_CEILING {
        fail(format!(
            "intake.max_rating_scale must be between 1 and {RATING_SCALE_CEILING}, got {scale}"
        ));
    }

    if config.intake.idle_timeout_secs == 0 {
        fail("intake.idle_timeout_secs must be positive".to_string());
    }

    if !config.intake.ticket_created_message.contains("{ticket_id}") {
        fail("intake.ticket_created_message must contain `{ticket_id}`".to_string());
    }

    if config.notify.queue_capacity == 0 {
        fail("notify.queue_capacity must be at least 1".to_string());
    }

    if config.notify.poll_interval_ms < MIN_POLL_INTERVAL_MS {
        fail(format!(
            "notify.poll_interval_ms must be at least {MIN_POLL_INTERVAL_MS}, got {}",
            config.notify.poll_interval_ms
        ));
    }

    if config.notify.claim_lease_secs <= config.notify.http_timeout_secs {
        fail(format!(
            "notify.claim_lease_secs ({}) must exceed notify.http_timeout_secs ({})",
            config.notify.claim_lease_secs, config.notify.http_timeout_secs
        ));
    }

    if config.vault.key_env.trim().is_empty() {
        fail("vault.key_env must name an environment variable".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = TicketbotConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = TicketbotConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("database_path"));
    }

    #[test]
    fn rating_scale_above_ceiling_fails() {
        let mut config = TicketbotConfig::default();
        config.intake.max_rating_scale = 11;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("max_rating_scale"));
    }

    #[test]
    fn collects_every_error() {
        let mut config = TicketbotConfig::default();
        config.intake.quick_reply_limit = 0;
        config.notify.queue_capacity = 0;
        config.notify.poll_interval_ms = 10;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn ticket_message_needs_placeholder() {
        let mut config = TicketbotConfig::default();
        config.intake.ticket_created_message = "Thanks!".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn claim_lease_must_outlast_a_provider_call() {
        let mut config = TicketbotConfig::default();
        config.notify.http_timeout_secs = 30;
        config.notify.claim_lease_secs = 30;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("claim_lease_secs"));
    }

    #[test]
    fn bad_bind_address_is_reported() {
        let mut config = TicketbotConfig::default();
        config.service.bind_address = "not an address!".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("bind_address"));
    }
}
