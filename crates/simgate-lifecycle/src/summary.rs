// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-item outcomes and the summary every batch returns.

use serde::{Deserialize, Serialize};
use strum::Display;

use simgate_core::types::GatewayPortSnapshot;
use simgate_core::{Port, RunContext, SimgateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    /// The item's transition was committed.
    Processed,
    /// Nothing to do for this item.
    Skipped,
    /// The SIM is not seated anywhere; an operator must pick a slot.
    SlotNotFound,
    Failed,
    /// Left untouched after the batch stopped on a rate limit.
    Deferred,
}

/// What happened to one item of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sim_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iccid: Option<String>,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
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

impl ItemResult {
    pub fn new(outcome: Outcome, sim_id: Option<i64>, iccid: Option<String>) -> Self {
        Self {
            sim_id,
            iccid,
            outcome,
            detail: None,
            error_kind: None,
            imei: None,
            gateway_id: None,
            port: None,
            subscription_id: None,
            candidates: Vec::new(),
        }
    }

    pub fn failed(sim_id: Option<i64>, iccid: Option<String>, error: &SimgateError) -> Self {
        Self::new(Outcome::Failed, sim_id, iccid)
            .detail(error.to_string())
            .error_kind(error.kind_label())
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn error_kind(mut self, kind: &str) -> Self {
        self.error_kind = Some(kind.to_string());
        self
    }

    pub fn imei(mut self, imei: impl Into<String>) -> Self {
        self.imei = Some(imei.into());
        self
    }

    pub fn slot(mut self, gateway_id: i64, port: Port) -> Self {
        self.gateway_id = Some(gateway_id);
        self.port = Some(port);
        self
    }

    pub fn subscription(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }

    pub fn candidates(mut self, candidates: Vec<GatewayPortSnapshot>) -> Self {
        self.candidates = candidates;
        self
    }
}

/// JSON summary returned by every batch operation.
///
/// `results` holds exactly one entry per attempted item. `ok` is true when
/// no item failed and every bulk response item was reconciled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub ok: bool,
    pub run_id: String,
    pub job: String,
    pub attempted: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub stopped_early: bool,
    pub results: Vec<ItemResult>,
    /// Bulk response items that match no request item. Not part of `results`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reconciliation_errors: Vec<ItemResult>,
}

impl BatchSummary {
    pub fn from_results(
        ctx: &RunContext,
        results: Vec<ItemResult>,
        reconciliation_errors: Vec<ItemResult>,
        stopped_early: bool,
    ) -> Self {
        let count = |outcome: Outcome| results.iter().filter(|r| r.outcome == outcome).count();
        let processed = count(Outcome::Processed);
        let skipped = count(Outcome::Skipped);
        let errors = count(Outcome::Failed) + reconciliation_errors.len();
        Self {
            ok: errors == 0,
            run_id: ctx.run_id.to_string(),
            job: ctx.job.clone(),
            attempted: results.len(),
            processed,
            skipped,
            errors,
            stopped_early,
            results,
            reconciliation_errors,
        }
    }

    /// Summary of a run that had nothing to do.
    pub fn empty(ctx: &RunContext) -> Self {
        Self::from_results(ctx, Vec::new(), Vec::new(), false)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }
}
