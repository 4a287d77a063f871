// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational ticket intake for the Ticketbot support backend.
//!
//! An inbound message is routed by the [`ConversationEngine`] to the
//! sender's session, which walks the channel's question template. Preset
//! questions draw their options from the catalogue through the
//! [`PresetResolver`]; the final problem text hands the collected answers
//! to the [`TicketFinalizer`].

pub mod catalogue;
pub mod engine;
pub mod finalizer;
pub mod lifecycle;
pub mod resolver;
pub mod session;
pub mod templates;

pub use catalogue::Catalogue;
pub use engine::ConversationEngine;
pub use finalizer::{FinalizeRequest, TicketFinalizer};
pub use lifecycle::{Resolution, TicketLifecycle};
pub use resolver::{PresetResolver, PresetSchema};
pub use templates::{IntakeSnapshot, NormalizedSettings, TemplateStore, sanitize};
