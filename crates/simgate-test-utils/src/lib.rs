// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for simgate integration tests.
//!
//! Provides scripted collaborators and a temp-database harness so the
//! lifecycle orchestrators can be exercised without a carrier, gateways,
//! or reseller endpoints.
//!
//! # Components
//!
//! - [`MockCarrier`] - scripted carrier with a call log
//! - [`MockHardware`] - in-memory gateway fleet
//! - [`RecordingWebhookSink`] - captures deliveries, deduplicated by message id
//! - [`TestHarness`] - temp SQLite store plus the mocks above

pub mod harness;
pub mod mock_carrier;
pub mod mock_hardware;
pub mod recording_webhook;

pub use harness::{TestHarness, port};
pub use mock_carrier::{CarrierCall, CarrierOp, MockCarrier};
pub use mock_hardware::MockHardware;
pub use recording_webhook::RecordingWebhookSink;
