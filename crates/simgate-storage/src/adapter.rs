// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`SimStore`] and [`AuditSink`] traits.

use async_trait::async_trait;
use tracing::debug;

use simgate_config::model::StorageConfig;
use simgate_core::types::{
    CarrierAuditEntry, IdentityPoolEntry, IdentityStatus, PhoneNumberAssignment, Reseller,
    WebhookDelivery,
};
use simgate_core::{AuditSink, Sim, SimPatch, SimStatus, SimStore, SimgateError};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store. Delegates every operation to the typed query modules.
#[derive(Clone)]
pub struct SqliteSimStore {
    db: Database,
}

impl SqliteSimStore {
    /// Wrap an already-open database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the database described by `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self, SimgateError> {
        let db = Database::open_with(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite store initialized");
        Ok(Self { db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn health_check(&self) -> Result<(), SimgateError> {
        self.db.ping().await
    }

    /// Checkpoint the WAL before shutdown.
    pub async fn close(&self) -> Result<(), SimgateError> {
        self.db.checkpoint().await
    }
}

#[async_trait]
impl SimStore for SqliteSimStore {
    // --- SIMs ---

    async fn get_sim(&self, id: i64) -> Result<Option<Sim>, SimgateError> {
        queries::sims::get_sim(&self.db, id).await
    }

    async fn get_sim_by_iccid(&self, iccid: &str) -> Result<Option<Sim>, SimgateError> {
        queries::sims::get_sim_by_iccid(&self.db, iccid).await
    }

    async fn list_sims_by_status(
        &self,
        status: SimStatus,
        limit: usize,
    ) -> Result<Vec<Sim>, SimgateError> {
        queries::sims::list_sims_by_status(&self.db, status, limit).await
    }

    async fn iccids_in_statuses(&self, statuses: &[SimStatus]) -> Result<Vec<String>, SimgateError> {
        queries::sims::iccids_in_statuses(&self.db, statuses).await
    }

    async fn ensure_sim(&self, iccid: &str) -> Result<Sim, SimgateError> {
        queries::sims::ensure_sim(&self.db, iccid).await
    }

    async fn patch_sim(
        &self,
        id: i64,
        expected: Option<SimStatus>,
        patch: &SimPatch,
    ) -> Result<bool, SimgateError> {
        queries::sims::patch_sim(&self.db, id, expected, patch).await
    }

    // --- Identity pool ---

    async fn add_identities(&self, imeis: &[String]) -> Result<usize, SimgateError> {
        queries::identities::add_identities(&self.db, imeis).await
    }

    async fn get_identity(&self, id: i64) -> Result<Option<IdentityPoolEntry>, SimgateError> {
        queries::identities::get_identity(&self.db, id).await
    }

    async fn allocate_identity(&self, sim_id: i64) -> Result<IdentityPoolEntry, SimgateError> {
        queries::identities::allocate_identity(&self.db, sim_id).await
    }

    async fn release_identity(&self, entry_id: i64, sim_id: i64) -> Result<(), SimgateError> {
        queries::identities::release_identity(&self.db, entry_id, sim_id).await
    }

    async fn retire_identity(&self, entry_id: i64, sim_id: i64) -> Result<(), SimgateError> {
        queries::identities::retire_identity(&self.db, entry_id, sim_id).await
    }

    async fn count_identities(&self, status: IdentityStatus) -> Result<usize, SimgateError> {
        queries::identities::count_identities(&self.db, status).await
    }

    async fn allocated_identities(&self, sim_id: i64) -> Result<Vec<IdentityPoolEntry>, SimgateError> {
        queries::identities::allocated_for_sim(&self.db, sim_id).await
    }

    // --- Phone numbers ---

    async fn current_phone_number(
        &self,
        sim_id: i64,
    ) -> Result<Option<PhoneNumberAssignment>, SimgateError> {
        queries::phone_numbers::current_phone_number(&self.db, sim_id).await
    }

    async fn rotate_phone_number(&self, sim_id: i64, e164: &str) -> Result<bool, SimgateError> {
        queries::phone_numbers::rotate_phone_number(&self.db, sim_id, e164).await
    }

    async fn close_phone_number(&self, sim_id: i64) -> Result<(), SimgateError> {
        queries::phone_numbers::close_phone_number(&self.db, sim_id).await
    }

    async fn phone_history(&self, sim_id: i64) -> Result<Vec<PhoneNumberAssignment>, SimgateError> {
        queries::phone_numbers::phone_history(&self.db, sim_id).await
    }

    // --- Resellers ---

    async fn upsert_reseller(&self, reseller: &Reseller) -> Result<(), SimgateError> {
        queries::resellers::upsert_reseller(&self.db, reseller).await
    }

    async fn assign_reseller(&self, sim_id: i64, reseller_id: i64) -> Result<bool, SimgateError> {
        queries::resellers::assign_reseller(&self.db, sim_id, reseller_id).await
    }

    async fn active_reseller(&self, sim_id: i64) -> Result<Option<Reseller>, SimgateError> {
        queries::resellers::active_reseller(&self.db, sim_id).await
    }

    // --- Webhook deliveries ---

    async fn record_webhook(&self, delivery: &WebhookDelivery) -> Result<bool, SimgateError> {
        queries::webhooks::record_webhook(&self.db, delivery).await
    }

    async fn finish_webhook(
        &self,
        message_id: &str,
        delivered: bool,
        response_code: Option<u16>,
    ) -> Result<(), SimgateError> {
        queries::webhooks::finish_webhook(&self.db, message_id, delivered, response_code).await
    }
}

#[async_trait]
impl AuditSink for SqliteSimStore {
    async fn record(&self, entry: &CarrierAuditEntry) -> Result<(), SimgateError> {
        queries::audit::insert_audit(&self.db, entry).await
    }
}
