// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the lifecycle engine is written against.
//!
//! All traits use `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>` and swapped for mocks in tests.

pub mod audit;
pub mod carrier;
pub mod hardware;
pub mod store;
pub mod webhook;

pub use audit::AuditSink;
pub use carrier::CarrierApi;
pub use hardware::GatewayHardware;
pub use store::SimStore;
pub use webhook::WebhookSink;
