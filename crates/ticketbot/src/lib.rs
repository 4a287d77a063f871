// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service wiring for the `ticketbot` binary: HTTP gateway, background
//! tasks, and shutdown handling.

pub mod gateway;
pub mod serve;
pub mod shutdown;
