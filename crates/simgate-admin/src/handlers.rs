// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the admin trigger surface.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use simgate_core::{SimStore, SimgateError};
use simgate_core::types::IdentityStatus;
use simgate_lifecycle::{BatchSummary, BulkItem, ManualSlot, RetryReport};

use crate::error::ApiError;
use crate::server::AdminState;

/// `?limit=N` on the job routes.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Body for POST /v1/activations/bulk.
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub items: Vec<BulkItem>,
}

/// Body for the suspend, restore, and cancel routes.
#[derive(Debug, Deserialize)]
pub struct SimBatchRequest {
    pub sim_ids: Vec<i64>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl SimBatchRequest {
    fn into_parts(self) -> Result<(Vec<i64>, Option<String>), SimgateError> {
        if self.sim_ids.is_empty() {
            return Err(SimgateError::Validation("sim_ids must not be empty".into()));
        }
        let reason = self.reason.filter(|r| !r.trim().is_empty());
        Ok((self.sim_ids, reason))
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub carrier_configured: bool,
    pub hardware_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identities_available: Option<usize>,
}

/// GET /health
///
/// Unauthenticated. Reports `degraded` with 503 when the store is unreachable.
pub async fn get_health(State(state): State<AdminState>) -> Response {
    let available = state
        .services
        .store
        .count_identities(IdentityStatus::Available)
        .await;
    let (status, code, identities_available) = match available {
        Ok(count) => ("ok", StatusCode::OK, Some(count)),
        Err(e) => {
            tracing::warn!(error = %e, "health check could not reach the store");
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, None)
        }
    };
    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started.elapsed().as_secs(),
        carrier_configured: state.services.carrier.is_ready(),
        hardware_configured: state.services.hardware.is_ready(),
        identities_available,
    };
    (code, Json(body)).into_response()
}

/// POST /v1/jobs/retry-activation
pub async fn post_retry_activation_job(
    State(state): State<AdminState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<BatchSummary>, ApiError> {
    Ok(Json(state.engine.activation.run_batch(query.limit).await?))
}

/// POST /v1/jobs/sync-provisioning
pub async fn post_sync_provisioning_job(
    State(state): State<AdminState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<BatchSummary>, ApiError> {
    Ok(Json(state.engine.provisioning.run_batch(query.limit).await?))
}

/// POST /v1/sims/{id}/retry-activation
///
/// The body is optional; when present it names a manual slot in canonical
/// port form, e.g. `{"gateway_id": 3, "port": "2B"}`.
pub async fn post_retry_activation(
    State(state): State<AdminState>,
    Path(sim_id): Path<i64>,
    body: Bytes,
) -> Result<Json<RetryReport>, ApiError> {
    let manual = if body.iter().all(u8::is_ascii_whitespace) {
        ManualSlot::default()
    } else {
        serde_json::from_slice::<ManualSlot>(&body)
            .map_err(|e| SimgateError::Validation(format!("invalid manual slot: {e}")))?
    };
    let outcome = state.engine.activation.retry_one(sim_id, manual).await?;
    Ok(Json(RetryReport::from(outcome)))
}

/// POST /v1/activations/bulk
pub async fn post_bulk_activation(
    State(state): State<AdminState>,
    Json(body): Json<BulkRequest>,
) -> Result<Json<BatchSummary>, ApiError> {
    if body.items.is_empty() {
        return Err(SimgateError::Validation("items must not be empty".into()).into());
    }
    let max = state.services.orchestration.max_batch_size;
    if body.items.len() > max {
        return Err(SimgateError::Validation(format!(
            "{} items exceeds the maximum batch size of {max}",
            body.items.len()
        ))
        .into());
    }
    Ok(Json(state.engine.bulk.activate_batch(body.items).await?))
}

/// POST /v1/sims/suspend
pub async fn post_suspend(
    State(state): State<AdminState>,
    Json(body): Json<SimBatchRequest>,
) -> Result<Json<BatchSummary>, ApiError> {
    let (sim_ids, reason) = body.into_parts()?;
    Ok(Json(state.engine.status.suspend(sim_ids, reason).await?))
}

/// POST /v1/sims/restore
pub async fn post_restore(
    State(state): State<AdminState>,
    Json(body): Json<SimBatchRequest>,
) -> Result<Json<BatchSummary>, ApiError> {
    let (sim_ids, reason) = body.into_parts()?;
    Ok(Json(state.engine.status.restore(sim_ids, reason).await?))
}

/// POST /v1/sims/cancel
pub async fn post_cancel(
    State(state): State<AdminState>,
    Json(body): Json<SimBatchRequest>,
) -> Result<Json<BatchSummary>, ApiError> {
    let (sim_ids, reason) = body.into_parts()?;
    Ok(Json(state.engine.cancellation.cancel(sim_ids, reason).await?))
}
