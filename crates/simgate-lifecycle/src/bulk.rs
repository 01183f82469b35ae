// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bulk activation: one carrier call for many SIMs, reconciled item by item.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, warn};

use simgate_core::types::{BulkActivationItem, BulkActivationResponse};
use simgate_core::{ExternalErrorKind, RunContext, SimPatch, SimStatus, SimgateError};

use crate::identity_pool::validate_imei;
use crate::runner::BatchRunner;
use crate::services::Services;
use crate::summary::{BatchSummary, ItemResult, Outcome};

pub const JOB: &str = "bulk-activation";

/// One requested activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItem {
    pub iccid: String,
    pub imei: String,
    pub reseller_id: i64,
}

/// Response items mapped back onto positions of the submitted request.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Reconciled {
    pub successes: Vec<(usize, String)>,
    pub failures: Vec<(usize, String)>,
    /// Response items that could not be tied to any request item.
    pub unmatched: Vec<ItemResult>,
}

fn unreconciled(iccid: Option<&str>, message: String) -> ItemResult {
    ItemResult::failed(
        None,
        iccid.map(str::to_string),
        &SimgateError::Reconciliation(message),
    )
}

/// Map the carrier's `successful`/`failed` arrays back onto `requests`.
///
/// Items carrying an ICCID are matched by it. Items without one fall back to
/// their position: successes take indexes `0..s`, failures continue at `s`.
/// Any request item no response item claims is reported as failed.
pub(crate) fn reconcile(
    requests: &[BulkActivationItem],
    response: BulkActivationResponse,
) -> Reconciled {
    let by_iccid: HashMap<&str, usize> = requests
        .iter()
        .enumerate()
        .map(|(i, r)| (r.iccid.as_str(), i))
        .collect();

    enum Verdict {
        Success(Option<String>),
        Failure(Option<String>),
    }

    let success_count = response.successful.len();
    let entries = response
        .successful
        .into_iter()
        .enumerate()
        .map(|(i, s)| (i, s.iccid, Verdict::Success(s.subscription_id)))
        .chain(
            response
                .failed
                .into_iter()
                .enumerate()
                .map(|(j, f)| (success_count + j, f.iccid, Verdict::Failure(f.reason))),
        );

    // ICCID matches are settled first so a positional guess never steals a
    // slot an explicit match needs.
    let mut claimed = vec![false; requests.len()];
    let mut matched: Vec<(usize, Verdict)> = Vec::new();
    let mut positional: Vec<(usize, Verdict)> = Vec::new();
    let mut out = Reconciled::default();

    for (position, iccid, verdict) in entries {
        match iccid.as_deref().filter(|i| !i.is_empty()) {
            Some(iccid) => match by_iccid.get(iccid) {
                Some(&index) if !claimed[index] => {
                    claimed[index] = true;
                    matched.push((index, verdict));
                }
                Some(_) => out.unmatched.push(unreconciled(
                    Some(iccid),
                    format!("duplicate response item for iccid {iccid}"),
                )),
                None => out.unmatched.push(unreconciled(
                    Some(iccid),
                    format!("response item for unknown iccid {iccid}"),
                )),
            },
            None => positional.push((position, verdict)),
        }
    }

    for (position, verdict) in positional {
        if position < claimed.len() && !claimed[position] {
            claimed[position] = true;
            matched.push((position, verdict));
        } else {
            out.unmatched.push(unreconciled(
                None,
                format!("response item at position {position} matches no request"),
            ));
        }
    }

    for (index, verdict) in matched {
        match verdict {
            Verdict::Success(Some(id)) if !id.trim().is_empty() => out.successes.push((index, id)),
            Verdict::Success(_) => out
                .failures
                .push((index, "carrier reported success without a subscription id".into())),
            Verdict::Failure(reason) => out.failures.push((
                index,
                reason.unwrap_or_else(|| "carrier rejected activation".into()),
            )),
        }
    }

    for (index, seen) in claimed.iter().enumerate() {
        if !seen {
            out.failures
                .push((index, "carrier returned no result for this item".into()));
        }
    }

    out.successes.sort_by_key(|(i, _)| *i);
    out.failures.sort_by_key(|(i, _)| *i);
    out
}

#[derive(Clone)]
pub struct BulkActivationOrchestrator {
    services: Services,
}

impl BulkActivationOrchestrator {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub async fn activate_batch(&self, items: Vec<BulkItem>) -> Result<BatchSummary, SimgateError> {
        let runner = BatchRunner::new(RunContext::new(JOB), self.services.orchestration.carrier_call_delay());
        let span = runner.span();
        self.activate_with(runner.context(), items).instrument(span).await
    }

    async fn activate_with(
        &self,
        ctx: &RunContext,
        items: Vec<BulkItem>,
    ) -> Result<BatchSummary, SimgateError> {
        let carrier = self.services.carrier()?;
        let store = &self.services.store;
        info!(attempted = items.len(), "bulk activation started");

        let mut results: Vec<Option<ItemResult>> = vec![None; items.len()];
        let mut to_activate: Vec<usize> = Vec::new();
        let mut seen = HashSet::new();

        for (index, item) in items.iter().enumerate() {
            let iccid = item.iccid.trim();
            let invalid = if iccid.is_empty() {
                Some(SimgateError::Validation("iccid is empty".into()))
            } else if let Err(e) = validate_imei(&item.imei) {
                Some(e)
            } else if !seen.insert(iccid.to_string()) {
                Some(SimgateError::Validation(format!("iccid {iccid} appears twice in the batch")))
            } else {
                None
            };
            if let Some(e) = invalid {
                results[index] = Some(ItemResult::failed(None, Some(item.iccid.clone()), &e));
                continue;
            }

            match store.get_sim_by_iccid(iccid).await {
                Ok(Some(sim)) => match sim.mobility_subscription_id {
                    Some(subscription) => {
                        results[index] = Some(
                            ItemResult::new(Outcome::Skipped, Some(sim.id), Some(sim.iccid))
                                .detail("already activated")
                                .subscription(subscription),
                        );
                    }
                    None => to_activate.push(index),
                },
                Ok(None) => to_activate.push(index),
                Err(e) => {
                    warn!(iccid, error = %e, "lookup failed; item not submitted");
                    results[index] = Some(ItemResult::failed(None, Some(item.iccid.clone()), &e));
                }
            }
        }

        let mut stopped_early = false;
        let mut unmatched = Vec::new();

        if !to_activate.is_empty() {
            let requests: Vec<BulkActivationItem> = to_activate
                .iter()
                .map(|&i| BulkActivationItem {
                    iccid: items[i].iccid.trim().to_string(),
                    imei: items[i].imei.clone(),
                })
                .collect();

            match carrier.bulk_activate(ctx, &requests).await {
                Ok(response) => {
                    let reconciled = reconcile(&requests, response);
                    for (position, subscription_id) in reconciled.successes {
                        let index = to_activate[position];
                        results[index] = Some(self.commit_success(&items[index], subscription_id).await);
                    }
                    for (position, reason) in reconciled.failures {
                        let index = to_activate[position];
                        results[index] = Some(self.mark_failed(&items[index], reason).await);
                    }
                    for item in &reconciled.unmatched {
                        warn!(
                            iccid = item.iccid.as_deref().unwrap_or("-"),
                            detail = item.detail.as_deref().unwrap_or_default(),
                            "unreconciled bulk response item"
                        );
                    }
                    unmatched = reconciled.unmatched;
                }
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "bulk activation aborted");
                    return Err(e);
                }
                Err(e) if e.is_rate_limited() => {
                    warn!(error = %e, submitted = to_activate.len(), "rate limited; bulk items deferred");
                    stopped_early = true;
                    for &index in &to_activate {
                        results[index] = Some(ItemResult::new(
                            Outcome::Deferred,
                            None,
                            Some(items[index].iccid.clone()),
                        ));
                    }
                }
                Err(e) => {
                    warn!(error = %e, submitted = to_activate.len(), "bulk activation call failed");
                    for &index in &to_activate {
                        let result = self.mark_failed(&items[index], e.to_string()).await;
                        results[index] = Some(result.error_kind(e.kind_label()));
                    }
                }
            }
        }

        let results = results
            .into_iter()
            .zip(&items)
            .map(|(result, item)| {
                result.unwrap_or_else(|| {
                    // Every branch above fills its slot.
                    ItemResult::failed(
                        None,
                        Some(item.iccid.clone()),
                        &SimgateError::Internal("item left without an outcome".into()),
                    )
                })
            })
            .collect();

        let summary = BatchSummary::from_results(ctx, results, unmatched, stopped_early);
        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            errors = summary.errors,
            stopped_early,
            "bulk activation finished"
        );
        Ok(summary)
    }

    async fn commit_success(&self, item: &BulkItem, subscription_id: String) -> ItemResult {
        let store = &self.services.store;
        let iccid = item.iccid.trim();

        let sim = match store.ensure_sim(iccid).await {
            Ok(sim) => sim,
            Err(e) => {
                error!(iccid, subscription_id = %subscription_id, error = %e, "activated but not persisted");
                return ItemResult::failed(None, Some(item.iccid.clone()), &e).subscription(subscription_id);
            }
        };

        let patch = SimPatch::default()
            .status(SimStatus::Provisioning)
            .subscription(subscription_id.clone())
            .imei(item.imei.clone())
            .activation_error(None);
        if let Err(e) = store.patch_sim(sim.id, None, &patch).await {
            error!(sim_id = sim.id, subscription_id = %subscription_id, error = %e, "activated but not persisted");
            return ItemResult::failed(Some(sim.id), Some(sim.iccid), &e).subscription(subscription_id);
        }

        let result = ItemResult::new(Outcome::Processed, Some(sim.id), Some(sim.iccid.clone()))
            .imei(item.imei.clone())
            .subscription(subscription_id);
        match store.assign_reseller(sim.id, item.reseller_id).await {
            Ok(_) => result,
            Err(e) => {
                warn!(sim_id = sim.id, reseller_id = item.reseller_id, error = %e, "reseller assignment failed");
                result.detail(format!("reseller {} not assigned: {e}", item.reseller_id))
            }
        }
    }

    /// Mark the SIM `error`. Never propagates: a persistence failure is noted
    /// on the item and the batch goes on.
    async fn mark_failed(&self, item: &BulkItem, reason: String) -> ItemResult {
        let store = &self.services.store;
        let iccid = item.iccid.trim();
        let failure = SimgateError::carrier(ExternalErrorKind::Generic, None, reason.clone());
        let patch = SimPatch::default()
            .status(SimStatus::Error)
            .imei(item.imei.clone())
            .activation_error(Some(reason.clone()));

        let persisted = match store.ensure_sim(iccid).await {
            Ok(sim) => store
                .patch_sim(sim.id, None, &patch)
                .await
                .map(|_| sim.id),
            Err(e) => Err(e),
        };
        match persisted {
            Ok(sim_id) => {
                warn!(sim_id, iccid, reason = %reason, "bulk activation item failed");
                ItemResult::failed(Some(sim_id), Some(item.iccid.clone()), &failure).detail(reason)
            }
            Err(e) => {
                warn!(iccid, error = %e, "failed to record bulk activation failure");
                ItemResult::failed(None, Some(item.iccid.clone()), &failure)
                    .detail(format!("{reason}; error state not recorded: {e}"))
            }
        }
    }
}
