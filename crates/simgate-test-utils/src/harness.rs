// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for orchestrator integration tests.
//!
//! `TestHarness` opens a temp SQLite store with migrations applied, seeds the
//! identity pool, and pairs it with a mock carrier, a mock fleet, and a
//! recording webhook sink.

use std::str::FromStr;
use std::sync::Arc;

use rusqlite::params;

use simgate_config::model::{OrchestrationConfig, StorageConfig};
use simgate_core::types::Reseller;
use simgate_core::{Port, Sim, SimStatus, SimStore, SimgateError};
use simgate_storage::SqliteSimStore;

use crate::mock_carrier::MockCarrier;
use crate::mock_hardware::MockHardware;
use crate::recording_webhook::RecordingWebhookSink;

/// Parse a canonical port such as `2B`.
///
/// # Panics
///
/// Panics on anything that is not a canonical port; test input only.
pub fn port(canonical: &str) -> Port {
    Port::from_str(canonical).unwrap_or_else(|e| panic!("bad test port {canonical:?}: {e}"))
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    identities: Vec<String>,
    carrier_call_delay_ms: u64,
    max_batch_size: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            identities: Vec::new(),
            carrier_call_delay_ms: 0,
            max_batch_size: 100,
        }
    }

    /// Seed the identity pool with these IMEIs, in allocation order.
    pub fn with_identities(mut self, imeis: &[&str]) -> Self {
        self.identities = imeis.iter().map(|i| i.to_string()).collect();
        self
    }

    /// Pause between carrier calls. Zero by default.
    pub fn with_carrier_call_delay_ms(mut self, delay_ms: u64) -> Self {
        self.carrier_call_delay_ms = delay_ms;
        self
    }

    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }

    pub async fn build(self) -> Result<TestHarness, SimgateError> {
        let temp_dir = tempfile::TempDir::new().map_err(SimgateError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let storage_config = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        let store = Arc::new(SqliteSimStore::open(&storage_config).await?);
        if !self.identities.is_empty() {
            store.add_identities(&self.identities).await?;
        }

        let orchestration = OrchestrationConfig {
            default_batch_size: self.max_batch_size.min(10),
            max_batch_size: self.max_batch_size,
            carrier_call_delay_ms: self.carrier_call_delay_ms,
        };

        Ok(TestHarness {
            store,
            carrier: Arc::new(MockCarrier::new()),
            hardware: Arc::new(MockHardware::new()),
            webhooks: Arc::new(RecordingWebhookSink::new()),
            orchestration,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock collaborators and temp storage.
pub struct TestHarness {
    pub store: Arc<SqliteSimStore>,
    pub carrier: Arc<MockCarrier>,
    pub hardware: Arc<MockHardware>,
    pub webhooks: Arc<RecordingWebhookSink>,
    pub orchestration: OrchestrationConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Insert a SIM with an explicit id and status.
    pub async fn insert_sim(&self, id: i64, iccid: &str, status: &str) -> Result<Sim, SimgateError> {
        let status = SimStatus::from_str(status)
            .map_err(|_| SimgateError::Validation(format!("unknown status {status}")))?;
        let iccid_owned = iccid.to_string();
        let status_text = status.to_string();
        self.store
            .database()
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO sims (id, iccid, status) VALUES (?1, ?2, ?3)",
                    params![id, iccid_owned, status_text],
                )?;
                Ok(())
            })
            .await
            .map_err(SimgateError::storage)?;
        self.store
            .get_sim(id)
            .await?
            .ok_or_else(|| SimgateError::Internal(format!("sim {id} missing after insert")))
    }

    /// Register a reseller and make it the SIM's active one.
    pub async fn assign_reseller(
        &self,
        sim_id: i64,
        reseller_id: i64,
        webhook_url: Option<&str>,
    ) -> Result<(), SimgateError> {
        self.add_reseller(reseller_id, webhook_url).await?;
        self.store.assign_reseller(sim_id, reseller_id).await?;
        Ok(())
    }

    pub async fn add_reseller(&self, reseller_id: i64, webhook_url: Option<&str>) -> Result<(), SimgateError> {
        self.store
            .upsert_reseller(&Reseller {
                id: reseller_id,
                name: format!("reseller-{reseller_id}"),
                webhook_url: webhook_url.map(str::to_string),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simgate_core::types::IdentityStatus;

    #[tokio::test]
    async fn builds_with_seeded_pool() {
        let harness = TestHarness::builder()
            .with_identities(&["356938035643809", "356938035643817"])
            .build()
            .await
            .unwrap();
        assert_eq!(
            harness.store.count_identities(IdentityStatus::Available).await.unwrap(),
            2
        );
        assert_eq!(harness.orchestration.carrier_call_delay_ms, 0);
    }

    #[tokio::test]
    async fn inserts_sims_with_explicit_ids() {
        let harness = TestHarness::builder().build().await.unwrap();
        let sim = harness.insert_sim(42, "8901", "error").await.unwrap();
        assert_eq!(sim.id, 42);
        assert_eq!(sim.status, SimStatus::Error);
        assert!(harness.insert_sim(43, "8902", "bogus").await.is_err());
    }
}
