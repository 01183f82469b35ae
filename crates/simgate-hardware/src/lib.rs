// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the SMS gateway fleet.
//!
//! Gateways report ports in dot notation (`06.01`). This crate is the only
//! place that form exists: snapshots leave it as canonical [`simgate_core::Port`]
//! values and `set_imei` converts back on the way in.

pub mod client;

pub use client::GatewayFleetClient;
