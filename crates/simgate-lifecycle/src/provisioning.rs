// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Finishes activations once the carrier has assigned a phone number.

use tracing::{Instrument, debug, info};

use simgate_core::{CarrierApi, RunContext, Sim, SimPatch, SimStatus, SimgateError};

use crate::runner::BatchRunner;
use crate::services::Services;
use crate::summary::{BatchSummary, ItemResult, Outcome};
use crate::webhook::{WebhookDispatcher, WebhookEvent};

pub const JOB: &str = "sync-provisioning";

#[derive(Clone)]
pub struct ProvisioningSync {
    services: Services,
    webhooks: WebhookDispatcher,
}

impl ProvisioningSync {
    pub fn new(services: Services) -> Self {
        let webhooks = WebhookDispatcher::new(services.store.clone(), services.webhooks.clone());
        Self { services, webhooks }
    }

    /// Poll every `provisioning` SIM, oldest first, up to `limit`.
    pub async fn run_batch(&self, limit: Option<usize>) -> Result<BatchSummary, SimgateError> {
        let runner = BatchRunner::new(RunContext::new(JOB), self.services.orchestration.carrier_call_delay());
        let span = runner.span();
        self.run_with(&runner, self.services.orchestration.effective_limit(limit))
            .instrument(span)
            .await
    }

    async fn run_with(&self, runner: &BatchRunner, limit: usize) -> Result<BatchSummary, SimgateError> {
        let carrier = self.services.carrier()?;
        let sims = self
            .services
            .store
            .list_sims_by_status(SimStatus::Provisioning, limit)
            .await?;
        let ctx = runner.context();
        let api = carrier.as_ref();
        runner
            .run(sims, move |sim| async move { self.sync_one(ctx, api, sim).await })
            .await
    }

    async fn sync_one(
        &self,
        ctx: &RunContext,
        carrier: &dyn CarrierApi,
        sim: Sim,
    ) -> Result<ItemResult, SimgateError> {
        let store = &self.services.store;
        let item = |outcome| ItemResult::new(outcome, Some(sim.id), Some(sim.iccid.clone()));

        let Some(subscription_id) = sim.mobility_subscription_id.clone() else {
            return Ok(item(Outcome::Skipped).detail("no carrier subscription"));
        };

        let details = carrier.subscriber_details(ctx, &subscription_id).await?;
        let Some(phone_number) = details.phone_number.filter(|p| !p.trim().is_empty()) else {
            debug!(sim_id = sim.id, subscription_id = %subscription_id, "still provisioning");
            return Ok(item(Outcome::Skipped).detail("still provisioning"));
        };

        store.rotate_phone_number(sim.id, &phone_number).await?;

        let patch = SimPatch::default().status(SimStatus::Active);
        if !store.patch_sim(sim.id, Some(SimStatus::Provisioning), &patch).await? {
            let current = store.get_sim(sim.id).await?.map(|s| s.status).unwrap_or(sim.status);
            return Err(SimgateError::InvalidState {
                sim_id: sim.id,
                status: current,
                operation: "complete provisioning",
            });
        }
        info!(sim_id = sim.id, phone_number = %phone_number, "sim active");

        let committed = Sim {
            status: SimStatus::Active,
            ..sim.clone()
        };
        self.webhooks
            .notify(ctx, WebhookEvent::Activated, &committed, Some(&phone_number))
            .await;

        Ok(item(Outcome::Processed)
            .subscription(subscription_id)
            .detail(phone_number))
    }
}
