// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Suspend and restore: the `active <-> suspended` edge.

use tracing::{Instrument, info};

use simgate_core::types::LineState;
use simgate_core::{ExternalErrorKind, RunContext, Sim, SimPatch, SimStatus, SimgateError};

use crate::runner::BatchRunner;
use crate::services::Services;
use crate::summary::{BatchSummary, ItemResult, Outcome};
use crate::webhook::{WebhookDispatcher, WebhookEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Suspend,
    Restore,
}

impl StatusChange {
    pub fn job(self) -> &'static str {
        match self {
            Self::Suspend => "suspend",
            Self::Restore => "restore",
        }
    }

    fn from_status(self) -> SimStatus {
        match self {
            Self::Suspend => SimStatus::Active,
            Self::Restore => SimStatus::Suspended,
        }
    }

    fn to_status(self) -> SimStatus {
        match self {
            Self::Suspend => SimStatus::Suspended,
            Self::Restore => SimStatus::Active,
        }
    }

    fn line_state(self) -> LineState {
        match self {
            Self::Suspend => LineState::Suspend,
            Self::Restore => LineState::Restore,
        }
    }

    fn event(self) -> WebhookEvent {
        match self {
            Self::Suspend => WebhookEvent::Suspended,
            Self::Restore => WebhookEvent::Restored,
        }
    }
}

#[derive(Clone)]
pub struct StatusChangeOrchestrator {
    services: Services,
    webhooks: WebhookDispatcher,
}

impl StatusChangeOrchestrator {
    pub fn new(services: Services) -> Self {
        let webhooks = WebhookDispatcher::new(services.store.clone(), services.webhooks.clone());
        Self { services, webhooks }
    }

    pub async fn suspend(&self, sim_ids: Vec<i64>, reason: Option<String>) -> Result<BatchSummary, SimgateError> {
        self.change(StatusChange::Suspend, sim_ids, reason).await
    }

    pub async fn restore(&self, sim_ids: Vec<i64>, reason: Option<String>) -> Result<BatchSummary, SimgateError> {
        self.change(StatusChange::Restore, sim_ids, reason).await
    }

    async fn change(
        &self,
        change: StatusChange,
        sim_ids: Vec<i64>,
        reason: Option<String>,
    ) -> Result<BatchSummary, SimgateError> {
        let runner = BatchRunner::new(
            RunContext::new(change.job()),
            self.services.orchestration.carrier_call_delay(),
        );
        let span = runner.span();
        self.change_with(&runner, change, sim_ids, reason.as_deref())
            .instrument(span)
            .await
    }

    async fn change_with(
        &self,
        runner: &BatchRunner,
        change: StatusChange,
        sim_ids: Vec<i64>,
        reason: Option<&str>,
    ) -> Result<BatchSummary, SimgateError> {
        self.services.carrier()?;
        let ctx = runner.context();
        runner
            .run(sim_ids, move |sim_id| async move {
                self.change_one(ctx, change, sim_id, reason).await
            })
            .await
    }

    /// Move one SIM across the edge. The status is written only after the
    /// carrier accepted the change.
    pub async fn change_one(
        &self,
        ctx: &RunContext,
        change: StatusChange,
        sim_id: i64,
        reason: Option<&str>,
    ) -> Result<ItemResult, SimgateError> {
        let carrier = self.services.carrier()?;
        let store = &self.services.store;

        let sim = store.get_sim(sim_id).await?.ok_or_else(|| SimgateError::NotFound {
            entity: "sim",
            id: sim_id.to_string(),
        })?;
        let item = |outcome| ItemResult::new(outcome, Some(sim.id), Some(sim.iccid.clone()));

        if sim.status == change.to_status() {
            return Ok(item(Outcome::Skipped).detail(format!("already {}", sim.status)));
        }
        if sim.status != change.from_status() {
            return Err(SimgateError::InvalidState {
                sim_id,
                status: sim.status,
                operation: change.job(),
            });
        }

        let phone = store.current_phone_number(sim_id).await?.ok_or_else(|| {
            SimgateError::Precondition(format!("sim {sim_id} has no current phone number"))
        })?;

        let response = carrier.change_state(ctx, &phone.e164, change.line_state()).await?;
        if !response.rejected.is_empty() {
            return Err(SimgateError::carrier(
                ExternalErrorKind::Generic,
                None,
                format!("carrier rejected {}: {}", change.line_state(), response.rejected.join(", ")),
            ));
        }

        let patch = SimPatch::default()
            .status(change.to_status())
            .reason(reason.map(str::to_string));
        if !store.patch_sim(sim_id, Some(change.from_status()), &patch).await? {
            let current = store.get_sim(sim_id).await?.map(|s| s.status).unwrap_or(sim.status);
            return Err(SimgateError::InvalidState {
                sim_id,
                status: current,
                operation: change.job(),
            });
        }
        info!(sim_id, from = %change.from_status(), to = %change.to_status(), "status changed");

        let committed = Sim {
            status: change.to_status(),
            status_reason: reason.map(str::to_string),
            ..sim.clone()
        };
        self.webhooks
            .notify(ctx, change.event(), &committed, Some(&phone.e164))
            .await;

        Ok(item(Outcome::Processed).detail(format!("{} -> {}", change.from_status(), change.to_status())))
    }
}
