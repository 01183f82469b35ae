// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cancellation: the terminal edge into `canceled`.
//!
//! After the carrier disconnects the subscription and the status is
//! committed, the SIM's current number is closed and its identity retired.
//! Those follow-ups are reported on the item but never undo the cancel.

use tracing::{Instrument, info, warn};

use simgate_core::{RunContext, Sim, SimPatch, SimStatus, SimgateError};

use crate::identity_pool::IdentityPool;
use crate::runner::BatchRunner;
use crate::services::Services;
use crate::summary::{BatchSummary, ItemResult, Outcome};
use crate::webhook::{WebhookDispatcher, WebhookEvent};

pub const JOB: &str = "cancel";

#[derive(Clone)]
pub struct CancellationOrchestrator {
    services: Services,
    pool: IdentityPool,
    webhooks: WebhookDispatcher,
}

impl CancellationOrchestrator {
    pub fn new(services: Services) -> Self {
        let pool = IdentityPool::new(services.store.clone());
        let webhooks = WebhookDispatcher::new(services.store.clone(), services.webhooks.clone());
        Self {
            services,
            pool,
            webhooks,
        }
    }

    pub async fn cancel(&self, sim_ids: Vec<i64>, reason: Option<String>) -> Result<BatchSummary, SimgateError> {
        let runner = BatchRunner::new(RunContext::new(JOB), self.services.orchestration.carrier_call_delay());
        let span = runner.span();
        self.cancel_with(&runner, sim_ids, reason.as_deref())
            .instrument(span)
            .await
    }

    async fn cancel_with(
        &self,
        runner: &BatchRunner,
        sim_ids: Vec<i64>,
        reason: Option<&str>,
    ) -> Result<BatchSummary, SimgateError> {
        self.services.carrier()?;
        let ctx = runner.context();
        runner
            .run(sim_ids, move |sim_id| async move {
                self.cancel_one(ctx, sim_id, reason).await
            })
            .await
    }

    pub async fn cancel_one(
        &self,
        ctx: &RunContext,
        sim_id: i64,
        reason: Option<&str>,
    ) -> Result<ItemResult, SimgateError> {
        let carrier = self.services.carrier()?;
        let store = &self.services.store;

        let sim = store.get_sim(sim_id).await?.ok_or_else(|| SimgateError::NotFound {
            entity: "sim",
            id: sim_id.to_string(),
        })?;
        if sim.status == SimStatus::Canceled {
            return Ok(ItemResult::new(Outcome::Skipped, Some(sim.id), Some(sim.iccid))
                .detail("already canceled"));
        }
        if !SimStatus::CANCELABLE.contains(&sim.status) {
            return Err(SimgateError::InvalidState {
                sim_id,
                status: sim.status,
                operation: "cancel",
            });
        }

        let phone = store.current_phone_number(sim_id).await?.ok_or_else(|| {
            SimgateError::Precondition(format!("sim {sim_id} has no current phone number"))
        })?;
        let subscription_id = sim.mobility_subscription_id.clone().ok_or_else(|| {
            SimgateError::Precondition(format!("sim {sim_id} has no carrier subscription"))
        })?;

        carrier.disconnect(ctx, &subscription_id).await?;

        let patch = SimPatch::default()
            .status(SimStatus::Canceled)
            .reason(reason.map(str::to_string));
        if !store.patch_sim(sim_id, Some(sim.status), &patch).await? {
            let current = store.get_sim(sim_id).await?.map(|s| s.status).unwrap_or(sim.status);
            warn!(sim_id, status = %current, "subscription disconnected but status moved concurrently");
            return Err(SimgateError::InvalidState {
                sim_id,
                status: current,
                operation: "cancel",
            });
        }
        info!(sim_id, from = %sim.status, subscription_id = %subscription_id, "sim canceled");

        let mut notes = Vec::new();
        if let Err(e) = store.close_phone_number(sim_id).await {
            warn!(sim_id, error = %e, "failed to close phone number");
            notes.push(format!("phone number not closed: {e}"));
        }
        if let Err(e) = self.pool.retire_held(sim_id, sim.current_imei_pool_id).await {
            warn!(sim_id, error = %e, "failed to retire identity");
            notes.push(format!("identity not retired: {e}"));
        }

        let committed = Sim {
            status: SimStatus::Canceled,
            status_reason: reason.map(str::to_string),
            ..sim.clone()
        };
        self.webhooks
            .notify(ctx, WebhookEvent::Canceled, &committed, Some(&phone.e164))
            .await;

        let result = ItemResult::new(Outcome::Processed, Some(sim.id), Some(sim.iccid))
            .subscription(subscription_id);
        Ok(if notes.is_empty() {
            result
        } else {
            result.detail(notes.join("; "))
        })
    }
}
