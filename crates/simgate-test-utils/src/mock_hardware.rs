// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory gateway fleet.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use simgate_core::types::GatewayPortSnapshot;
use simgate_core::{ExternalErrorKind, GatewayHardware, Port, SimgateError};

struct Gateway {
    id: i64,
    ports: Vec<GatewayPortSnapshot>,
    failing: bool,
}

/// A fleet whose gateways are reported in the order they were first seated,
/// so callers that depend on ascending ids must sort for themselves.
#[derive(Default)]
pub struct MockHardware {
    gateways: Mutex<Vec<Gateway>>,
    set_imei_failures: Mutex<VecDeque<SimgateError>>,
    programmed: Mutex<Vec<(i64, Port, String)>>,
}

impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a port to `gateway_id`, creating the gateway on first use.
    pub async fn seat(&self, gateway_id: i64, port: Port, iccid: Option<&str>, imei: Option<&str>) {
        let mut gateways = self.gateways.lock().await;
        let index = match gateways.iter().position(|g| g.id == gateway_id) {
            Some(index) => index,
            None => {
                gateways.push(Gateway {
                    id: gateway_id,
                    ports: Vec::new(),
                    failing: false,
                });
                gateways.len() - 1
            }
        };
        gateways[index].ports.push(GatewayPortSnapshot {
            gateway_id,
            port,
            iccid: iccid.map(str::to_string),
            imei: imei.map(str::to_string),
        });
    }

    /// Make every `port_info` call on `gateway_id` fail.
    pub async fn fail_gateway(&self, gateway_id: i64) {
        let mut gateways = self.gateways.lock().await;
        match gateways.iter_mut().find(|g| g.id == gateway_id) {
            Some(gateway) => gateway.failing = true,
            None => gateways.push(Gateway {
                id: gateway_id,
                ports: Vec::new(),
                failing: true,
            }),
        }
    }

    /// Make the next `set_imei` fail with `error`.
    pub async fn fail_next_set_imei(&self, error: SimgateError) {
        self.set_imei_failures.lock().await.push_back(error);
    }

    /// Every successful `set_imei`, in call order.
    pub async fn programmed(&self) -> Vec<(i64, Port, String)> {
        self.programmed.lock().await.clone()
    }
}

#[async_trait]
impl GatewayHardware for MockHardware {
    async fn gateway_ids(&self) -> Result<Vec<i64>, SimgateError> {
        Ok(self.gateways.lock().await.iter().map(|g| g.id).collect())
    }

    async fn port_info(&self, gateway_id: i64) -> Result<Vec<GatewayPortSnapshot>, SimgateError> {
        let gateways = self.gateways.lock().await;
        let gateway = gateways
            .iter()
            .find(|g| g.id == gateway_id)
            .ok_or_else(|| SimgateError::NotFound {
                entity: "gateway",
                id: gateway_id.to_string(),
            })?;
        if gateway.failing {
            return Err(SimgateError::gateway(
                ExternalErrorKind::Generic,
                Some(503),
                format!("gateway {gateway_id} unavailable"),
            ));
        }
        Ok(gateway.ports.clone())
    }

    async fn set_imei(&self, gateway_id: i64, port: Port, imei: &str) -> Result<(), SimgateError> {
        if let Some(error) = self.set_imei_failures.lock().await.pop_front() {
            return Err(error);
        }
        let mut gateways = self.gateways.lock().await;
        if let Some(slot) = gateways
            .iter_mut()
            .filter(|g| g.id == gateway_id)
            .flat_map(|g| g.ports.iter_mut())
            .find(|p| p.port == port)
        {
            slot.imei = Some(imei.to_string());
        }
        self.programmed
            .lock()
            .await
            .push((gateway_id, port, imei.to_string()));
        Ok(())
    }
}
