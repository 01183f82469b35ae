// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the simgate SIM lifecycle engine.
//!
//! This crate provides the domain types, the error taxonomy, and the narrow
//! collaborator traits (persistence, carrier, gateway hardware, webhooks,
//! audit) that the orchestrators in `simgate-lifecycle` are written against.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ExternalErrorKind, ServiceKind, SimgateError};
pub use types::{Port, RunContext, Sim, SimPatch, SimStatus};

pub use traits::{AuditSink, CarrierApi, GatewayHardware, SimStore, WebhookSink};
