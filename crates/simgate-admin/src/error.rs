// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of engine errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use simgate_core::SimgateError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    pub kind: &'static str,
}

/// Wraps a [`SimgateError`] returned from a handler.
#[derive(Debug)]
pub struct ApiError(pub SimgateError);

impl From<SimgateError> for ApiError {
    fn from(err: SimgateError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &SimgateError) -> StatusCode {
    match err {
        SimgateError::Validation(_) | SimgateError::Precondition(_) => StatusCode::BAD_REQUEST,
        SimgateError::NotFound { .. } => StatusCode::NOT_FOUND,
        SimgateError::InvalidState { .. } => StatusCode::CONFLICT,
        SimgateError::PoolExhausted => StatusCode::SERVICE_UNAVAILABLE,
        SimgateError::ExternalService { .. } if err.is_rate_limited() => StatusCode::TOO_MANY_REQUESTS,
        SimgateError::ExternalService { .. } | SimgateError::Reconciliation(_) => StatusCode::BAD_GATEWAY,
        SimgateError::Configuration(_) | SimgateError::Storage { .. } | SimgateError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "admin request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "admin request rejected");
        }
        let body = ErrorResponse {
            ok: false,
            error: self.0.to_string(),
            kind: self.0.kind_label(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simgate_core::{ExternalErrorKind, SimStatus};

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            status_for(&SimgateError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&SimgateError::NotFound {
                entity: "sim",
                id: "1".into()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&SimgateError::InvalidState {
                sim_id: 1,
                status: SimStatus::Pending,
                operation: "retry activation",
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&SimgateError::Configuration("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&SimgateError::carrier(ExternalErrorKind::RateLimited, Some(429), "x")),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_for(&SimgateError::carrier(ExternalErrorKind::Auth, Some(401), "x")),
            StatusCode::BAD_GATEWAY
        );
    }
}
