// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared wiring for the lifecycle integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use simgate_core::{CarrierApi, GatewayHardware};
use simgate_lifecycle::{Configured, Engine, Services};
use simgate_test_utils::TestHarness;

pub const IMEI_A: &str = "356938035643809";
pub const IMEI_B: &str = "356938035643817";
pub const IMEI_C: &str = "356938035643825";

pub fn services(harness: &TestHarness) -> Services {
    Services::new(
        harness.store.clone(),
        Configured::Ready(harness.carrier.clone() as Arc<dyn CarrierApi>),
        Configured::Ready(harness.hardware.clone() as Arc<dyn GatewayHardware>),
        harness.webhooks.clone(),
        harness.orchestration.clone(),
    )
}

pub fn engine(harness: &TestHarness) -> Engine {
    Engine::new(services(harness))
}
