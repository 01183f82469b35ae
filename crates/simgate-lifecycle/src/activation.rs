// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-SIM (re)activation with compensation.
//!
//! A retry moves a SIM out of `error` by seating a fresh pool identity on its
//! gateway port and activating it with the carrier:
//!
//! 1. resolve the slot (manual override, else a live fleet scan);
//! 2. refresh the cached slot on the SIM row;
//! 3. retire the identity of the superseded attempt;
//! 4. allocate a fresh identity;
//! 5. program it on the port; on failure release it and record the error;
//! 6. activate with the carrier; on failure retire it and record the attempt;
//! 7. commit `provisioning` with the new identity and subscription id.
//!
//! Every status transition is a conditional patch on `error`, so a concurrent
//! run that already moved the SIM turns into [`SimgateError::InvalidState`]
//! instead of a second identity.

use serde::{Deserialize, Serialize};
use tracing::{Instrument, info, warn};

use simgate_core::types::GatewayPortSnapshot;
use simgate_core::{Port, RunContext, Sim, SimPatch, SimStatus, SimgateError};

use crate::identity_pool::IdentityPool;
use crate::locator::GatewayLocator;
use crate::runner::BatchRunner;
use crate::services::Services;
use crate::summary::{BatchSummary, ItemResult, Outcome};

pub const JOB: &str = "retry-activation";

/// Operator-chosen slot. Only used when both parts are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualSlot {
    #[serde(default)]
    pub gateway_id: Option<i64>,
    #[serde(default)]
    pub port: Option<Port>,
}

impl ManualSlot {
    pub fn new(gateway_id: i64, port: Port) -> Self {
        Self {
            gateway_id: Some(gateway_id),
            port: Some(port),
        }
    }

    fn complete(&self) -> Option<(i64, Port)> {
        match (self.gateway_id, self.port) {
            (Some(gateway_id), Some(port)) => Some((gateway_id, port)),
            _ => None,
        }
    }

    fn is_partial(&self) -> bool {
        self.gateway_id.is_some() != self.port.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    Activated {
        imei: String,
        gateway_id: i64,
        port: Port,
        subscription_id: String,
    },
    /// No slot could be resolved. The SIM is untouched.
    SlotNotFound { candidates: Vec<GatewayPortSnapshot> },
}

/// Wire form of a single retry: `{ok, slot_not_found, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryReport {
    pub ok: bool,
    pub slot_not_found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imei: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<Port>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<GatewayPortSnapshot>,
}

impl From<RetryOutcome> for RetryReport {
    fn from(outcome: RetryOutcome) -> Self {
        match outcome {
            RetryOutcome::Activated {
                imei,
                gateway_id,
                port,
                subscription_id,
            } => Self {
                ok: true,
                slot_not_found: false,
                imei: Some(imei),
                gateway_id: Some(gateway_id),
                port: Some(port),
                subscription_id: Some(subscription_id),
                candidates: Vec::new(),
            },
            RetryOutcome::SlotNotFound { candidates } => Self {
                ok: false,
                slot_not_found: true,
                imei: None,
                gateway_id: None,
                port: None,
                subscription_id: None,
                candidates,
            },
        }
    }
}

#[derive(Clone)]
pub struct ActivationOrchestrator {
    services: Services,
    pool: IdentityPool,
}

impl ActivationOrchestrator {
    pub fn new(services: Services) -> Self {
        let pool = IdentityPool::new(services.store.clone());
        Self { services, pool }
    }

    /// Retry every SIM in `error`, oldest first, up to `limit`.
    pub async fn run_batch(&self, limit: Option<usize>) -> Result<BatchSummary, SimgateError> {
        let runner = BatchRunner::new(
            RunContext::new(JOB),
            self.services.orchestration.carrier_call_delay(),
        );
        let span = runner.span();
        self.run_with(&runner, self.services.orchestration.effective_limit(limit))
            .instrument(span)
            .await
    }

    async fn run_with(&self, runner: &BatchRunner, limit: usize) -> Result<BatchSummary, SimgateError> {
        // Resolved up front so a missing credential aborts before any item.
        self.services.carrier()?;
        self.services.hardware()?;

        let sims = self
            .services
            .store
            .list_sims_by_status(SimStatus::Error, limit)
            .await?;
        let ctx = runner.context();
        runner
            .run(sims, move |sim| async move {
                let outcome = self
                    .retry_activation(ctx, sim.id, ManualSlot::default())
                    .await?;
                Ok(item_result(&sim, outcome))
            })
            .await
    }

    /// Retry one SIM with its own run context.
    pub async fn retry_one(&self, sim_id: i64, manual: ManualSlot) -> Result<RetryOutcome, SimgateError> {
        let runner = BatchRunner::new(RunContext::new(JOB), self.services.orchestration.carrier_call_delay());
        self.retry_activation(runner.context(), sim_id, manual)
            .instrument(runner.span())
            .await
    }

    pub async fn retry_activation(
        &self,
        ctx: &RunContext,
        sim_id: i64,
        manual: ManualSlot,
    ) -> Result<RetryOutcome, SimgateError> {
        let carrier = self.services.carrier()?;
        let hardware = self.services.hardware()?;
        let store = &self.services.store;

        let sim = store.get_sim(sim_id).await?.ok_or_else(|| SimgateError::NotFound {
            entity: "sim",
            id: sim_id.to_string(),
        })?;
        if sim.status != SimStatus::Error {
            return Err(SimgateError::InvalidState {
                sim_id,
                status: sim.status,
                operation: "retry activation",
            });
        }

        let (gateway_id, port) = match manual.complete() {
            Some(slot) => slot,
            None => {
                if manual.is_partial() {
                    warn!(sim_id, ?manual, "incomplete manual slot ignored; scanning fleet");
                }
                let locator = GatewayLocator::new(store.clone(), hardware.clone());
                match locator.locate(&sim.iccid).await? {
                    Some(found) => (found.gateway_id, found.port),
                    None => {
                        let candidates = locator.candidates().await?;
                        info!(
                            sim_id,
                            iccid = %sim.iccid,
                            candidates = candidates.len(),
                            "slot not found; operator input needed"
                        );
                        return Ok(RetryOutcome::SlotNotFound { candidates });
                    }
                }
            }
        };

        let slot = SimPatch::default().slot(gateway_id, port);
        if !store.patch_sim(sim_id, Some(SimStatus::Error), &slot).await? {
            return Err(self.lost_race(sim_id).await);
        }

        self.pool.retire_held(sim_id, sim.current_imei_pool_id).await?;
        let entry = self.pool.allocate(sim_id).await?;

        if let Err(e) = hardware.set_imei(gateway_id, port, &entry.imei).await {
            warn!(sim_id, gateway_id, %port, error = %e, "imei programming failed");
            self.pool.release_quietly(entry.id, sim_id).await;
            self.record_failure(&sim, SimPatch::default().activation_error(Some(e.to_string())))
                .await;
            return Err(e);
        }

        let subscription_id = match carrier.activate(ctx, &sim.iccid, &entry.imei).await {
            Ok(id) => id,
            Err(e) => {
                warn!(sim_id, imei = %entry.imei, error = %e, "carrier activation failed");
                // The carrier has seen this identity; it must never be reused.
                self.pool.retire_quietly(entry.id, sim_id).await;
                let attempt = SimPatch::default()
                    .imei(entry.imei.clone())
                    .identity(Some(entry.id))
                    .activation_error(Some(e.to_string()));
                self.record_failure(&sim, attempt).await;
                return Err(e);
            }
        };

        let committed = SimPatch::default()
            .status(SimStatus::Provisioning)
            .imei(entry.imei.clone())
            .identity(Some(entry.id))
            .subscription(subscription_id.clone())
            .activation_error(None);
        if !store.patch_sim(sim_id, Some(SimStatus::Error), &committed).await? {
            // Keep the carrier bookkeeping even though the status moved on.
            let bookkeeping = SimPatch {
                status: None,
                ..committed
            };
            store.patch_sim(sim_id, None, &bookkeeping).await?;
            return Err(self.lost_race(sim_id).await);
        }

        info!(
            sim_id,
            gateway_id,
            %port,
            imei = %entry.imei,
            subscription_id = %subscription_id,
            "sim activated; provisioning"
        );
        Ok(RetryOutcome::Activated {
            imei: entry.imei,
            gateway_id,
            port,
            subscription_id,
        })
    }

    /// Persist failure bookkeeping without masking the original error.
    async fn record_failure(&self, sim: &Sim, patch: SimPatch) {
        if let Err(e) = self.services.store.patch_sim(sim.id, None, &patch).await {
            warn!(sim_id = sim.id, error = %e, "failed to record activation failure");
        }
    }

    async fn lost_race(&self, sim_id: i64) -> SimgateError {
        match self.services.store.get_sim(sim_id).await {
            Ok(Some(current)) => {
                warn!(sim_id, status = %current.status, "sim changed status during retry");
                SimgateError::InvalidState {
                    sim_id,
                    status: current.status,
                    operation: "retry activation",
                }
            }
            Ok(None) => SimgateError::NotFound {
                entity: "sim",
                id: sim_id.to_string(),
            },
            Err(e) => e,
        }
    }
}

fn item_result(sim: &Sim, outcome: RetryOutcome) -> ItemResult {
    let base = |outcome| ItemResult::new(outcome, Some(sim.id), Some(sim.iccid.clone()));
    match outcome {
        RetryOutcome::Activated {
            imei,
            gateway_id,
            port,
            subscription_id,
        } => base(Outcome::Processed)
            .imei(imei)
            .slot(gateway_id, port)
            .subscription(subscription_id),
        RetryOutcome::SlotNotFound { candidates } => base(Outcome::SlotNotFound)
            .detail(format!("{} candidate ports", candidates.len()))
            .candidates(candidates),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_slot_needs_both_parts() {
        let port: Port = "2B".parse().unwrap();
        assert_eq!(ManualSlot::new(3, port).complete(), Some((3, port)));
        let partial = ManualSlot {
            gateway_id: Some(3),
            port: None,
        };
        assert!(partial.complete().is_none());
        assert!(partial.is_partial());
        assert!(!ManualSlot::default().is_partial());
    }

    #[test]
    fn slot_not_found_report_shape() {
        let report = RetryReport::from(RetryOutcome::SlotNotFound {
            candidates: Vec::new(),
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["slot_not_found"], true);
        assert!(json.get("imei").is_none());
    }

    #[test]
    fn manual_slot_deserializes_canonical_port() {
        let slot: ManualSlot = serde_json::from_str(r#"{"gateway_id": 3, "port": "2B"}"#).unwrap();
        assert_eq!(slot, ManualSlot::new(3, "2B".parse().unwrap()));
        assert!(serde_json::from_str::<ManualSlot>(r#"{"port": "02.02"}"#).is_err());
    }
}
