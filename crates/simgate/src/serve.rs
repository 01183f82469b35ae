// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `simgate serve`: admin server plus the periodic job scheduler.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use simgate_admin::{AdminAuth, AdminState};
use simgate_config::SimgateConfig;
use simgate_core::SimgateError;
use simgate_lifecycle::Engine;

use crate::scheduler::spawn_job_loop;
use crate::wiring;

/// Cancels the returned token on SIGINT or SIGTERM.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler; listening for Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

pub async fn run_serve(config: SimgateConfig) -> Result<(), SimgateError> {
    info!(version = env!("CARGO_PKG_VERSION"), "simgate starting");

    let runtime = wiring::build(&config).await?;
    let cancel = install_signal_handler();

    let mut jobs = Vec::new();
    if config.schedule.enabled {
        let engine = Engine::new(runtime.services.clone());

        let activation = engine.activation.clone();
        jobs.push(spawn_job_loop(
            "retry_activation",
            Duration::from_secs(config.schedule.retry_activation_interval_secs),
            cancel.clone(),
            move || {
                let activation = activation.clone();
                async move { activation.run_batch(None).await }
            },
        ));

        let provisioning = engine.provisioning.clone();
        jobs.push(spawn_job_loop(
            "sync_provisioning",
            Duration::from_secs(config.schedule.provisioning_sync_interval_secs),
            cancel.clone(),
            move || {
                let provisioning = provisioning.clone();
                async move { provisioning.run_batch(None).await }
            },
        ));
    } else {
        info!("scheduler disabled; jobs run only on demand");
    }

    let state = AdminState::new(
        runtime.services.clone(),
        AdminAuth::new(config.admin.shared_secret.clone()),
    );
    let shutdown = cancel.clone();
    let served = simgate_admin::serve(&config.admin, state, async move { shutdown.cancelled().await }).await;

    // The server can also stop on a bind error; make sure the loops see it.
    cancel.cancel();
    for job in jobs {
        if let Err(e) = job.await {
            warn!(error = %e, "scheduler task ended abnormally");
        }
    }

    runtime.shutdown().await?;
    info!("simgate stopped");
    served
}
