// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway hardware proxy.

use async_trait::async_trait;

use crate::error::SimgateError;
use crate::types::{GatewayPortSnapshot, Port};

/// Live port occupancy and IMEI programming on the gateway fleet.
///
/// Ports cross this trait in canonical [`Port`] form only.
#[async_trait]
pub trait GatewayHardware: Send + Sync + 'static {
    /// Ids of every gateway in the fleet.
    async fn gateway_ids(&self) -> Result<Vec<i64>, SimgateError>;

    /// Full port snapshot of one gateway, in the hardware's port order.
    async fn port_info(&self, gateway_id: i64) -> Result<Vec<GatewayPortSnapshot>, SimgateError>;

    /// Programs the IMEI presented by the given port.
    async fn set_imei(&self, gateway_id: i64, port: Port, imei: &str) -> Result<(), SimgateError>;
}
