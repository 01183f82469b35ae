// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin HTTP server built on axum.

use std::future::Future;
use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use simgate_config::model::AdminConfig;
use simgate_core::SimgateError;
use simgate_lifecycle::{Engine, Services};

use crate::auth::{AdminAuth, auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AdminState {
    pub engine: Engine,
    /// Collaborators, read by the health route.
    pub services: Services,
    pub auth: AdminAuth,
    pub started: Instant,
}

impl AdminState {
    pub fn new(services: Services, auth: AdminAuth) -> Self {
        Self {
            engine: Engine::new(services.clone()),
            services,
            auth,
            started: Instant::now(),
        }
    }
}

/// Build the router: `/health` is public, every `/v1` route needs the secret.
pub fn router(state: AdminState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/jobs/retry-activation", post(handlers::post_retry_activation_job))
        .route("/v1/jobs/sync-provisioning", post(handlers::post_sync_provisioning_job))
        .route("/v1/sims/{id}/retry-activation", post(handlers::post_retry_activation))
        .route("/v1/activations/bulk", post(handlers::post_bulk_activation))
        .route("/v1/sims/suspend", post(handlers::post_suspend))
        .route("/v1/sims/restore", post(handlers::post_restore))
        .route("/v1/sims/cancel", post(handlers::post_cancel))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
}

/// Bind `host:port` and serve until `shutdown` resolves.
///
/// In-flight requests finish before this returns.
pub async fn serve(
    config: &AdminConfig,
    state: AdminState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), SimgateError> {
    if state.auth.shared_secret.is_none() {
        tracing::warn!("admin.shared_secret is not set; every trigger request will be rejected");
    }

    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SimgateError::Configuration(format!("failed to bind admin server to {addr}: {e}")))?;

    tracing::info!(%addr, "admin server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| SimgateError::Internal(format!("admin server error: {e}")))?;

    Ok(())
}
