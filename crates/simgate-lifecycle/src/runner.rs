// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequential batch driver shared by every orchestrator.
//!
//! Items run one at a time with a fixed pause between them so the carrier's
//! rate limit is respected. Per-item failures are recorded and the batch
//! continues, with two exceptions:
//!
//! - a rate-limited item stops the batch; everything after it is `deferred`
//!   and left for the next run;
//! - a configuration error aborts the run with `Err`, since no later item
//!   could succeed either.

use std::future::Future;
use std::time::Duration;

use tracing::{Span, error, info, info_span, warn};

use simgate_core::{RunContext, Sim, SimgateError};

use crate::summary::{BatchSummary, ItemResult, Outcome};

/// Identifies an item in logs and in its result row.
pub trait BatchItem {
    fn sim_id(&self) -> Option<i64>;
    fn iccid(&self) -> Option<String>;
}

impl BatchItem for Sim {
    fn sim_id(&self) -> Option<i64> {
        Some(self.id)
    }

    fn iccid(&self) -> Option<String> {
        Some(self.iccid.clone())
    }
}

impl BatchItem for i64 {
    fn sim_id(&self) -> Option<i64> {
        Some(*self)
    }

    fn iccid(&self) -> Option<String> {
        None
    }
}

pub struct BatchRunner {
    ctx: RunContext,
    delay: Duration,
}

impl BatchRunner {
    pub fn new(ctx: RunContext, delay: Duration) -> Self {
        Self { ctx, delay }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Span carrying the run's correlation id. Orchestrators enter it for the
    /// whole run, item loading included.
    pub fn span(&self) -> Span {
        info_span!("run", run_id = %self.ctx.run_id, job = %self.ctx.job)
    }

    pub async fn run<T, F, Fut>(&self, items: Vec<T>, mut step: F) -> Result<BatchSummary, SimgateError>
    where
        T: BatchItem,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<ItemResult, SimgateError>>,
    {
        info!(attempted = items.len(), "run started");
        let mut results = Vec::with_capacity(items.len());
        let mut stopped_early = false;
        let mut remaining = items.into_iter();

        for (index, item) in remaining.by_ref().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let sim_id = item.sim_id();
            let iccid = item.iccid();
            match step(item).await {
                Ok(result) => results.push(result),
                Err(e) if e.is_fatal() => {
                    error!(?sim_id, error = %e, "run aborted");
                    return Err(e);
                }
                Err(e) if e.is_rate_limited() => {
                    warn!(?sim_id, error = %e, "rate limited; deferring the rest of the batch");
                    results.push(ItemResult::failed(sim_id, iccid, &e));
                    stopped_early = true;
                    break;
                }
                Err(e) => {
                    warn!(?sim_id, error = %e, "item failed");
                    results.push(ItemResult::failed(sim_id, iccid, &e));
                }
            }
        }

        for item in remaining {
            results.push(ItemResult::new(Outcome::Deferred, item.sim_id(), item.iccid()));
        }

        let summary = BatchSummary::from_results(&self.ctx, results, Vec::new(), stopped_early);
        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            errors = summary.errors,
            stopped_early,
            "run finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simgate_core::ExternalErrorKind;

    fn runner() -> BatchRunner {
        BatchRunner::new(RunContext::new("test"), Duration::ZERO)
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_batch() {
        let summary = runner()
            .run(vec![1i64, 2, 3], |id| async move {
                if id == 2 {
                    Err(SimgateError::PoolExhausted)
                } else {
                    Ok(ItemResult::new(Outcome::Processed, Some(id), None))
                }
            })
            .await
            .unwrap();
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.results[1].error_kind.as_deref(), Some("pool_exhausted"));
        assert!(!summary.stopped_early);
    }

    #[tokio::test]
    async fn rate_limit_defers_the_remainder() {
        let mut calls = Vec::new();
        let summary = runner()
            .run(vec![1i64, 2, 3, 4], |id| {
                calls.push(id);
                async move {
                    if id == 2 {
                        Err(SimgateError::carrier(ExternalErrorKind::RateLimited, Some(429), "slow"))
                    } else {
                        Ok(ItemResult::new(Outcome::Processed, Some(id), None))
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(calls, vec![1, 2]);
        assert!(summary.stopped_early);
        assert_eq!(summary.results.len(), 4);
        assert_eq!(summary.results[1].outcome, Outcome::Failed);
        assert_eq!(summary.results[2].outcome, Outcome::Deferred);
        assert_eq!(summary.results[3].outcome, Outcome::Deferred);
    }

    #[tokio::test]
    async fn configuration_error_aborts() {
        let err = runner()
            .run(vec![1i64, 2], |_| async {
                Err::<ItemResult, _>(SimgateError::Configuration("carrier.base_url is not set".into()))
            })
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn slot_not_found_is_not_an_error() {
        let summary = runner()
            .run(vec![7i64], |id| async move {
                Ok(ItemResult::new(Outcome::SlotNotFound, Some(id), Some("8901".into())))
            })
            .await
            .unwrap();
        assert_eq!(summary.results[0].outcome, Outcome::SlotNotFound);
        assert_eq!(summary.errors, 0);
        assert!(summary.ok);
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_between_items() {
        let started = tokio::time::Instant::now();
        BatchRunner::new(RunContext::new("test"), Duration::from_millis(1500))
            .run(vec![1i64, 2, 3], |id| async move {
                Ok(ItemResult::new(Outcome::Processed, Some(id), None))
            })
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(3000));
    }
}
