// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interval loops for the periodic jobs.
//!
//! Each job is an independent task. Cancellation is only observed between
//! runs, so a run in progress always finishes.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use simgate_core::SimgateError;
use simgate_lifecycle::BatchSummary;

pub fn spawn_job_loop<F, Fut>(
    job: &'static str,
    every: Duration,
    cancel: CancellationToken,
    mut run: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<BatchSummary, SimgateError>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first immediate tick.
        interval.tick().await;
        info!(job, interval_secs = every.as_secs(), "scheduler started");

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = cancel.cancelled() => {
                    info!(job, "scheduler stopped");
                    break;
                }
            }

            match run().await {
                Ok(summary) => info!(
                    job,
                    run_id = %summary.run_id,
                    processed = summary.processed,
                    errors = summary.errors,
                    stopped_early = summary.stopped_early,
                    "scheduled run finished"
                ),
                Err(e) if e.is_fatal() => error!(job, error = %e, "scheduled run aborted"),
                Err(e) => warn!(job, error = %e, "scheduled run failed"),
            }
        }
    })
}
