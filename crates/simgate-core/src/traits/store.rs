// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence façade for SIM state, identities, numbers, and resellers.

use async_trait::async_trait;

use crate::error::SimgateError;
use crate::types::{
    IdentityPoolEntry, PhoneNumberAssignment, Reseller, Sim, SimPatch, SimStatus,
    WebhookDelivery,
};

/// The persistence contract the lifecycle engine needs.
///
/// Implementations enforce the SIM invariants: at most one allocated identity,
/// one current phone number, and one active reseller per SIM.
#[async_trait]
pub trait SimStore: Send + Sync + 'static {
    // --- SIMs ---

    async fn get_sim(&self, id: i64) -> Result<Option<Sim>, SimgateError>;

    async fn get_sim_by_iccid(&self, iccid: &str) -> Result<Option<Sim>, SimgateError>;

    /// Oldest-updated first, at most `limit` rows.
    async fn list_sims_by_status(
        &self,
        status: SimStatus,
        limit: usize,
    ) -> Result<Vec<Sim>, SimgateError>;

    /// ICCIDs of every SIM in any of `statuses`.
    async fn iccids_in_statuses(&self, statuses: &[SimStatus]) -> Result<Vec<String>, SimgateError>;

    /// Returns the SIM with this ICCID, creating it as `pending` if absent.
    async fn ensure_sim(&self, iccid: &str) -> Result<Sim, SimgateError>;

    /// Applies `patch` only if the SIM's status still equals `expected`
    /// (when given). Returns `false` when the guard did not match.
    async fn patch_sim(
        &self,
        id: i64,
        expected: Option<SimStatus>,
        patch: &SimPatch,
    ) -> Result<bool, SimgateError>;

    // --- Identity pool ---

    /// Appends `available` identities; already-known IMEIs are ignored.
    /// Returns the number inserted.
    async fn add_identities(&self, imeis: &[String]) -> Result<usize, SimgateError>;

    async fn get_identity(&self, id: i64) -> Result<Option<IdentityPoolEntry>, SimgateError>;

    /// Atomically moves one `available` identity to `allocated` for `sim_id`.
    async fn allocate_identity(&self, sim_id: i64) -> Result<IdentityPoolEntry, SimgateError>;

    /// Returns an `allocated` identity owned by `sim_id` to `available`.
    /// No-op when it is already available or not owned by the SIM.
    async fn release_identity(&self, entry_id: i64, sim_id: i64) -> Result<(), SimgateError>;

    /// Marks an identity owned by `sim_id` as `retired`. Idempotent.
    async fn retire_identity(&self, entry_id: i64, sim_id: i64) -> Result<(), SimgateError>;

    async fn count_identities(
        &self,
        status: crate::types::IdentityStatus,
    ) -> Result<usize, SimgateError>;

    /// Every identity currently `allocated` to `sim_id`, whether or not the
    /// SIM row records it.
    async fn allocated_identities(&self, sim_id: i64) -> Result<Vec<IdentityPoolEntry>, SimgateError>;

    // --- Phone numbers ---

    async fn current_phone_number(
        &self,
        sim_id: i64,
    ) -> Result<Option<PhoneNumberAssignment>, SimgateError>;

    /// Closes the current number and inserts `e164` as the new one.
    /// Returns `false` when `e164` is already current.
    async fn rotate_phone_number(&self, sim_id: i64, e164: &str) -> Result<bool, SimgateError>;

    /// Closes the current number, if any.
    async fn close_phone_number(&self, sim_id: i64) -> Result<(), SimgateError>;

    async fn phone_history(&self, sim_id: i64) -> Result<Vec<PhoneNumberAssignment>, SimgateError>;

    // --- Resellers ---

    async fn upsert_reseller(&self, reseller: &Reseller) -> Result<(), SimgateError>;

    /// Makes `reseller_id` the SIM's only active reseller.
    /// Returns `false` when that pair was already active.
    async fn assign_reseller(&self, sim_id: i64, reseller_id: i64) -> Result<bool, SimgateError>;

    async fn active_reseller(&self, sim_id: i64) -> Result<Option<Reseller>, SimgateError>;

    // --- Webhook deliveries ---

    /// Records a delivery. Returns `false` if `message_id` was already recorded.
    async fn record_webhook(&self, delivery: &WebhookDelivery) -> Result<bool, SimgateError>;

    async fn finish_webhook(
        &self,
        message_id: &str,
        delivered: bool,
        response_code: Option<u16>,
    ) -> Result<(), SimgateError>;
}
