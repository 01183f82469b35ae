// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The collaborator bundle every orchestrator is built from.

use std::sync::Arc;

use simgate_config::model::OrchestrationConfig;
use simgate_core::{CarrierApi, GatewayHardware, SimStore, SimgateError, WebhookSink};

/// A collaborator that may be absent because its configuration is incomplete.
///
/// The process still starts without carrier credentials or a gateway fleet;
/// any run that needs the missing collaborator fails with
/// [`SimgateError::Configuration`] before touching a single item.
pub enum Configured<T: ?Sized> {
    Ready(Arc<T>),
    Missing(String),
}

impl<T: ?Sized> Clone for Configured<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Ready(inner) => Self::Ready(Arc::clone(inner)),
            Self::Missing(reason) => Self::Missing(reason.clone()),
        }
    }
}

impl<T: ?Sized> Configured<T> {
    /// Keep the client, or remember why it could not be built.
    pub fn from_result(result: Result<Arc<T>, SimgateError>) -> Self {
        match result {
            Ok(inner) => Self::Ready(inner),
            Err(SimgateError::Configuration(reason)) => Self::Missing(reason),
            Err(other) => Self::Missing(other.to_string()),
        }
    }

    pub fn get(&self) -> Result<Arc<T>, SimgateError> {
        match self {
            Self::Ready(inner) => Ok(Arc::clone(inner)),
            Self::Missing(reason) => Err(SimgateError::Configuration(reason.clone())),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Immutable set of collaborators and tuning passed to each orchestrator.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn SimStore>,
    pub carrier: Configured<dyn CarrierApi>,
    pub hardware: Configured<dyn GatewayHardware>,
    pub webhooks: Arc<dyn WebhookSink>,
    pub orchestration: OrchestrationConfig,
}

impl Services {
    pub fn new(
        store: Arc<dyn SimStore>,
        carrier: Configured<dyn CarrierApi>,
        hardware: Configured<dyn GatewayHardware>,
        webhooks: Arc<dyn WebhookSink>,
        orchestration: OrchestrationConfig,
    ) -> Self {
        Self {
            store,
            carrier,
            hardware,
            webhooks,
            orchestration,
        }
    }

    pub fn carrier(&self) -> Result<Arc<dyn CarrierApi>, SimgateError> {
        self.carrier.get()
    }

    pub fn hardware(&self) -> Result<Arc<dyn GatewayHardware>, SimgateError> {
        self.hardware.get()
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("carrier_ready", &self.carrier.is_ready())
            .field("hardware_ready", &self.hardware.is_ready())
            .field("orchestration", &self.orchestration)
            .finish()
    }
}
