// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the carrier activation API.
//!
//! [`CarrierClient`] implements [`simgate_core::CarrierApi`]: it exchanges
//! client credentials for a cached bearer token, classifies failures into
//! auth / rate-limited / generic, and records every call in an audit sink.

pub mod client;
pub mod types;

pub use client::CarrierClient;
