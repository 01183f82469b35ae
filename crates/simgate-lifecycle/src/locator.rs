// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Finds the physical slot holding an ICCID across the gateway fleet.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use simgate_core::types::{GatewayPortSnapshot, SlotLocation};
use simgate_core::{GatewayHardware, SimStatus, SimStore, SimgateError};

/// Scans live port snapshots. Hardware is authoritative; the slot cached on
/// the SIM row is never consulted here.
#[derive(Clone)]
pub struct GatewayLocator {
    store: Arc<dyn SimStore>,
    hardware: Arc<dyn GatewayHardware>,
}

impl GatewayLocator {
    pub fn new(store: Arc<dyn SimStore>, hardware: Arc<dyn GatewayHardware>) -> Self {
        Self { store, hardware }
    }

    async fn fleet(&self) -> Result<Vec<i64>, SimgateError> {
        let mut ids = self.hardware.gateway_ids().await?;
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Snapshot of one gateway, or `None` when it could not be read.
    async fn snapshot(&self, gateway_id: i64) -> Option<Vec<GatewayPortSnapshot>> {
        match self.hardware.port_info(gateway_id).await {
            Ok(ports) => Some(ports),
            Err(e) => {
                warn!(gateway_id, error = %e, "gateway scan failed; skipping");
                None
            }
        }
    }

    /// First port holding `iccid`, by ascending gateway id and then the
    /// gateway's own port order.
    pub async fn locate(&self, iccid: &str) -> Result<Option<SlotLocation>, SimgateError> {
        for gateway_id in self.fleet().await? {
            let Some(ports) = self.snapshot(gateway_id).await else {
                continue;
            };
            if let Some(hit) = ports
                .into_iter()
                .find(|p| p.iccid.as_deref() == Some(iccid))
            {
                debug!(iccid, gateway_id, port = %hit.port, "sim located");
                return Ok(Some(SlotLocation {
                    gateway_id,
                    port: hit.port,
                    current_imei: hit.imei,
                }));
            }
        }
        debug!(iccid, "sim not seated in any reachable gateway");
        Ok(None)
    }

    /// ICCIDs of SIMs assumed to be physically seated.
    pub async fn occupied_iccids(&self) -> Result<HashSet<String>, SimgateError> {
        let iccids = self.store.iccids_in_statuses(&SimStatus::OCCUPYING).await?;
        Ok(iccids.into_iter().collect())
    }

    /// Every port whose seated ICCID is not in `occupied`, empty ports included.
    pub async fn unoccupied_candidates(
        &self,
        occupied: &HashSet<String>,
    ) -> Result<Vec<GatewayPortSnapshot>, SimgateError> {
        let mut candidates = Vec::new();
        for gateway_id in self.fleet().await? {
            let Some(ports) = self.snapshot(gateway_id).await else {
                continue;
            };
            candidates.extend(ports.into_iter().filter(|p| match &p.iccid {
                Some(iccid) => !occupied.contains(iccid),
                None => true,
            }));
        }
        Ok(candidates)
    }

    /// Candidate slots offered to an operator when `locate` finds nothing.
    pub async fn candidates(&self) -> Result<Vec<GatewayPortSnapshot>, SimgateError> {
        let occupied = self.occupied_iccids().await?;
        self.unoccupied_candidates(&occupied).await
    }
}
