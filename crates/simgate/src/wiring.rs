// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds the collaborator bundle from configuration.
//!
//! Storage is required. The carrier client and the gateway fleet are built
//! when their configuration allows; otherwise they are recorded as missing
//! and only the runs that need them fail.

use std::sync::Arc;

use tracing::{info, warn};

use simgate_carrier::CarrierClient;
use simgate_config::SimgateConfig;
use simgate_core::{AuditSink, CarrierApi, GatewayHardware, SimgateError};
use simgate_hardware::GatewayFleetClient;
use simgate_lifecycle::{Configured, HttpWebhookSink, Services};
use simgate_storage::SqliteSimStore;

pub struct Runtime {
    pub store: Arc<SqliteSimStore>,
    pub services: Services,
}

impl Runtime {
    pub async fn shutdown(self) -> Result<(), SimgateError> {
        self.store.close().await
    }
}

pub async fn open_store(config: &SimgateConfig) -> Result<Arc<SqliteSimStore>, SimgateError> {
    let store = SqliteSimStore::open(&config.storage).await?;
    info!(path = %config.storage.database_path, "storage opened");
    Ok(Arc::new(store))
}

pub async fn build(config: &SimgateConfig) -> Result<Runtime, SimgateError> {
    let store = open_store(config).await?;
    let audit: Arc<dyn AuditSink> = store.clone();

    let carrier = Configured::from_result(
        CarrierClient::from_config(&config.carrier, audit).map(|c| Arc::new(c) as Arc<dyn CarrierApi>),
    );
    if let Configured::Missing(reason) = &carrier {
        warn!(%reason, "carrier client unavailable; carrier-bound runs will abort");
    }

    let hardware = Configured::from_result(
        GatewayFleetClient::from_config(&config.hardware).map(|c| Arc::new(c) as Arc<dyn GatewayHardware>),
    );
    if let Configured::Missing(reason) = &hardware {
        warn!(%reason, "gateway fleet unavailable; activation retries will abort");
    }

    let webhooks = Arc::new(HttpWebhookSink::from_config(&config.webhook, store.clone())?);

    let services = Services::new(
        store.clone(),
        carrier,
        hardware,
        webhooks,
        config.orchestration.clone(),
    );
    Ok(Runtime { store, services })
}
