// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Ticketbot support backend.
//!
//! This crate provides the error taxonomy, the domain types shared by the
//! intake and notification pipelines, and the seam traits that storage,
//! vault, and platform crates implement.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TicketbotError;
pub use traits::{NotificationProvider, TokenCipher};
pub use types::{
    BotCredential, ChannelRecord, InboundEvent, Notification, NotificationStatus, Platform,
    PlatformCapabilities, Reply, StagedAttachment, TIMESTAMP_FORMAT, Ticket, TicketStatus,
    now_timestamp, timestamp_ago,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_render_messages() {
        let err = TicketbotError::delivery("recipient is empty");
        assert_eq!(err.to_string(), "delivery failed: recipient is empty");

        let err = TicketbotError::StorageContention { attempts: 5 };
        assert_eq!(err.to_string(), "storage busy after 5 attempts");

        let err = TicketbotError::NotFound {
            entity: "ticket",
            id: "T-1".into(),
        };
        assert_eq!(err.to_string(), "ticket not found: T-1");
    }

    #[test]
    fn recognized_delivery_errors() {
        assert!(TicketbotError::delivery("x").is_recognized_delivery());
        assert!(TicketbotError::Config("bad token".into()).is_recognized_delivery());
        assert!(!TicketbotError::Internal("boom".into()).is_recognized_delivery());
        assert!(!TicketbotError::storage(std::io::Error::other("io")).is_recognized_delivery());
    }

    #[test]
    fn seam_traits_are_object_safe() {
        fn _cipher(_: &dyn TokenCipher) {}
        fn _provider(_: &dyn NotificationProvider) {}
    }
}
