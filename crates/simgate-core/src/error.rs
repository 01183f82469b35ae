// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy shared by every simgate crate.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SimStatus;

/// The external collaborator an [`SimgateError::ExternalService`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Carrier,
    Gateway,
    Webhook,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Carrier => f.write_str("carrier"),
            Self::Gateway => f.write_str("gateway"),
            Self::Webhook => f.write_str("webhook"),
        }
    }
}

/// Structured classification of an external-service failure.
///
/// Batch-abort decisions are made on this value, never on response wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalErrorKind {
    /// Credentials rejected (401/403 after a token refresh).
    Auth,
    /// The service asked us to slow down. Stops the current batch.
    RateLimited,
    /// Anything else: transport failures, 4xx/5xx, malformed bodies.
    Generic,
}

impl fmt::Display for ExternalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth => f.write_str("auth"),
            Self::RateLimited => f.write_str("rate_limited"),
            Self::Generic => f.write_str("generic"),
        }
    }
}

/// The primary error type used across the lifecycle engine and its collaborators.
#[derive(Debug, Error)]
pub enum SimgateError {
    /// Malformed input (bad ICCID, bad port notation, empty batch item).
    #[error("validation error: {0}")]
    Validation(String),

    /// A SIM, gateway, or reseller does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The operation is not valid for the SIM's current status.
    #[error("sim {sim_id} is {status}; cannot {operation}")]
    InvalidState {
        sim_id: i64,
        status: SimStatus,
        operation: &'static str,
    },

    /// No `available` identity left in the IMEI pool.
    #[error("imei pool exhausted")]
    PoolExhausted,

    /// A required piece of SIM state (phone number, subscription id) is missing.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A carrier, gateway, or webhook call failed.
    #[error("{service} error ({kind}): {message}")]
    ExternalService {
        service: ServiceKind,
        kind: ExternalErrorKind,
        status: Option<u16>,
        message: String,
    },

    /// A bulk response item could not be matched back to a request item.
    #[error("reconciliation error: {0}")]
    Reconciliation(String),

    /// Required external-service configuration is missing. Fatal to a run.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Storage backend errors (connection, query failure, constraint violation).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SimgateError {
    /// Shorthand for a carrier failure.
    pub fn carrier(kind: ExternalErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: ServiceKind::Carrier,
            kind,
            status,
            message: message.into(),
        }
    }

    /// Shorthand for a gateway hardware failure.
    pub fn gateway(kind: ExternalErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: ServiceKind::Gateway,
            kind,
            status,
            message: message.into(),
        }
    }

    /// Shorthand for a webhook delivery failure.
    pub fn webhook(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: ServiceKind::Webhook,
            kind: ExternalErrorKind::Generic,
            status,
            message: message.into(),
        }
    }

    /// Wrap any storage-layer error.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(source),
        }
    }

    /// True when an external service rate-limited us. Stops the remainder of a batch.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            Self::ExternalService {
                kind: ExternalErrorKind::RateLimited,
                ..
            }
        )
    }

    /// True when no further item in a batch could succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Stable snake_case code used in JSON results and audit rows.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::InvalidState { .. } => "invalid_state",
            Self::PoolExhausted => "pool_exhausted",
            Self::Precondition(_) => "precondition",
            Self::ExternalService { kind, .. } => match kind {
                ExternalErrorKind::Auth => "external_auth",
                ExternalErrorKind::RateLimited => "external_rate_limited",
                ExternalErrorKind::Generic => "external_generic",
            },
            Self::Reconciliation(_) => "reconciliation",
            Self::Configuration(_) => "configuration",
            Self::Storage { .. } => "storage",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_a_structured_property() {
        let err = SimgateError::carrier(ExternalErrorKind::RateLimited, Some(429), "slow down");
        assert!(err.is_rate_limited());
        assert!(!err.is_fatal());
        assert_eq!(err.kind_label(), "external_rate_limited");

        // Wording that merely mentions rate limits does not classify.
        let generic = SimgateError::carrier(
            ExternalErrorKind::Generic,
            Some(500),
            "Too many subrequests",
        );
        assert!(!generic.is_rate_limited());
    }

    #[test]
    fn only_configuration_is_fatal() {
        assert!(SimgateError::Configuration("carrier.client_id missing".into()).is_fatal());
        assert!(!SimgateError::PoolExhausted.is_fatal());
        assert!(!SimgateError::carrier(ExternalErrorKind::Auth, Some(401), "denied").is_fatal());
    }

    #[test]
    fn display_includes_service_and_kind() {
        let err = SimgateError::gateway(ExternalErrorKind::Generic, Some(502), "bad gateway");
        assert_eq!(err.to_string(), "gateway error (generic): bad gateway");

        let err = SimgateError::InvalidState {
            sim_id: 42,
            status: SimStatus::Active,
            operation: "retry activation",
        };
        assert_eq!(err.to_string(), "sim 42 is active; cannot retry activation");
    }
}
