// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! IMEI identity pool.
//!
//! An identity that has been presented to the carrier is retired and never
//! handed out again. Only an identity that failed before reaching the carrier
//! may be released back to `available`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use simgate_core::types::IdentityPoolEntry;
use simgate_core::{SimStore, SimgateError};

/// IMEIs are exactly 15 decimal digits.
pub const IMEI_LEN: usize = 15;

#[derive(Clone)]
pub struct IdentityPool {
    store: Arc<dyn SimStore>,
}

impl IdentityPool {
    pub fn new(store: Arc<dyn SimStore>) -> Self {
        Self { store }
    }

    /// Bind one available identity to `sim_id`.
    pub async fn allocate(&self, sim_id: i64) -> Result<IdentityPoolEntry, SimgateError> {
        match self.store.allocate_identity(sim_id).await {
            Ok(entry) => {
                debug!(sim_id, entry_id = entry.id, imei = %entry.imei, "identity allocated");
                Ok(entry)
            }
            Err(e) => {
                if matches!(e, SimgateError::PoolExhausted) {
                    warn!(sim_id, "imei pool exhausted");
                }
                Err(e)
            }
        }
    }

    /// Return an identity that never reached the carrier.
    pub async fn release(&self, entry_id: i64, sim_id: i64) -> Result<(), SimgateError> {
        self.store.release_identity(entry_id, sim_id).await?;
        debug!(sim_id, entry_id, "identity released");
        Ok(())
    }

    /// Permanently take an identity out of rotation.
    pub async fn retire(&self, entry_id: i64, sim_id: i64) -> Result<(), SimgateError> {
        self.store.retire_identity(entry_id, sim_id).await?;
        debug!(sim_id, entry_id, "identity retired");
        Ok(())
    }

    /// Retire every identity still bound to `sim_id` before a new attempt.
    ///
    /// Covers the one the SIM records as current and any left allocated by
    /// an interrupted attempt. Whether those reached the carrier is unknown,
    /// so they are never released.
    pub async fn retire_held(&self, sim_id: i64, recorded: Option<i64>) -> Result<usize, SimgateError> {
        let mut held: Vec<i64> = self
            .store
            .allocated_identities(sim_id)
            .await?
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        for &entry_id in &held {
            if Some(entry_id) != recorded {
                warn!(sim_id, entry_id, "retiring identity the sim never recorded");
            }
        }
        if let Some(id) = recorded {
            if !held.contains(&id) {
                held.push(id);
            }
        }
        for &entry_id in &held {
            self.retire(entry_id, sim_id).await?;
        }
        Ok(held.len())
    }

    /// Compensating release. Logs instead of failing so the caller's
    /// original error is the one that surfaces.
    pub async fn release_quietly(&self, entry_id: i64, sim_id: i64) {
        if let Err(e) = self.release(entry_id, sim_id).await {
            warn!(sim_id, entry_id, error = %e, "failed to release identity");
        }
    }

    /// Compensating retire. Same contract as [`Self::release_quietly`].
    pub async fn retire_quietly(&self, entry_id: i64, sim_id: i64) {
        if let Err(e) = self.retire(entry_id, sim_id).await {
            warn!(sim_id, entry_id, error = %e, "failed to retire identity");
        }
    }

    /// Validate and append IMEIs. Returns how many were new.
    pub async fn import(&self, imeis: &[String]) -> Result<usize, SimgateError> {
        for imei in imeis {
            validate_imei(imei)?;
        }
        let added = self.store.add_identities(imeis).await?;
        info!(submitted = imeis.len(), added, "identities imported");
        Ok(added)
    }
}

pub fn validate_imei(imei: &str) -> Result<(), SimgateError> {
    if imei.len() == IMEI_LEN && imei.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(SimgateError::Validation(format!(
            "`{imei}` is not a {IMEI_LEN}-digit imei"
        )))
    }
}

/// Parse an import file: one IMEI per line, blank lines and `#` comments ignored.
pub fn parse_imei_list(text: &str) -> Result<Vec<String>, SimgateError> {
    let mut imeis = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = match line.split_once('#') {
            Some((before, _)) => before,
            None => line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }
        validate_imei(line)
            .map_err(|e| SimgateError::Validation(format!("line {}: {e}", index + 1)))?;
        imeis.push(line.to_string());
    }
    Ok(imeis)
}
