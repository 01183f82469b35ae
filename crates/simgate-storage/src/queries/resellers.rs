// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reseller records and SIM assignments.

use rusqlite::{params, OptionalExtension};
use simgate_core::types::Reseller;
use simgate_core::SimgateError;

use crate::database::{map_tr_err, Database};
use crate::models::reseller_from_row;
use crate::queries::NOW;

pub async fn upsert_reseller(db: &Database, reseller: &Reseller) -> Result<(), SimgateError> {
    let reseller = reseller.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO resellers (id, name, webhook_url) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, webhook_url = excluded.webhook_url",
                params![reseller.id, reseller.name, reseller.webhook_url],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Make `reseller_id` the SIM's only active reseller.
///
/// Deactivation of the prior row and activation of the new one happen in one
/// transaction. Returns `false` when the pair was already active.
pub async fn assign_reseller(db: &Database, sim_id: i64, reseller_id: i64) -> Result<bool, SimgateError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let already_active: bool = tx
                .query_row(
                    "SELECT 1 FROM reseller_assignments
                     WHERE sim_id = ?1 AND reseller_id = ?2 AND active = 1",
                    params![sim_id, reseller_id],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);
            if already_active {
                tx.commit()?;
                return Ok(false);
            }

            tx.execute(
                &format!(
                    "UPDATE reseller_assignments SET active = 0, updated_at = {NOW}
                     WHERE sim_id = ?1 AND active = 1"
                ),
                params![sim_id],
            )?;
            tx.execute(
                &format!(
                    "INSERT INTO reseller_assignments (reseller_id, sim_id, active) VALUES (?1, ?2, 1)
                     ON CONFLICT(reseller_id, sim_id) DO UPDATE SET active = 1, updated_at = {NOW}"
                ),
                params![reseller_id, sim_id],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn active_reseller(db: &Database, sim_id: i64) -> Result<Option<Reseller>, SimgateError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT r.id, r.name, r.webhook_url
                 FROM reseller_assignments a JOIN resellers r ON r.id = a.reseller_id
                 WHERE a.sim_id = ?1 AND a.active = 1",
                params![sim_id],
                reseller_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Number of active assignment rows for a SIM. At most one by schema.
pub async fn active_assignment_count(db: &Database, sim_id: i64) -> Result<usize, SimgateError> {
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM reseller_assignments WHERE sim_id = ?1 AND active = 1",
                params![sim_id],
                |row| row.get(0),
            )?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sims::ensure_sim;

    fn reseller(id: i64) -> Reseller {
        Reseller {
            id,
            name: format!("reseller-{id}"),
            webhook_url: Some(format!("https://r{id}.example/hook")),
        }
    }

    #[tokio::test]
    async fn reassignment_keeps_one_active_row() {
        let db = Database::open_in_memory().await.unwrap();
        let sim = ensure_sim(&db, "8901").await.unwrap();
        upsert_reseller(&db, &reseller(1)).await.unwrap();
        upsert_reseller(&db, &reseller(2)).await.unwrap();

        assert!(assign_reseller(&db, sim.id, 1).await.unwrap());
        assert!(!assign_reseller(&db, sim.id, 1).await.unwrap());
        assert!(assign_reseller(&db, sim.id, 2).await.unwrap());
        assert_eq!(active_assignment_count(&db, sim.id).await.unwrap(), 1);
        assert_eq!(active_reseller(&db, sim.id).await.unwrap().unwrap().id, 2);

        // Flipping back reactivates the existing (1, sim) row.
        assert!(assign_reseller(&db, sim.id, 1).await.unwrap());
        assert_eq!(active_assignment_count(&db, sim.id).await.unwrap(), 1);
        assert_eq!(active_reseller(&db, sim.id).await.unwrap().unwrap().id, 1);
    }

    #[tokio::test]
    async fn upsert_updates_webhook_url() {
        let db = Database::open_in_memory().await.unwrap();
        let sim = ensure_sim(&db, "8901").await.unwrap();
        upsert_reseller(&db, &reseller(1)).await.unwrap();
        let mut changed = reseller(1);
        changed.webhook_url = None;
        upsert_reseller(&db, &changed).await.unwrap();
        assign_reseller(&db, sim.id, 1).await.unwrap();
        assert!(active_reseller(&db, sim.id).await.unwrap().unwrap().webhook_url.is_none());
    }

    #[tokio::test]
    async fn unknown_reseller_is_rejected() {
        let db = Database::open_in_memory().await.unwrap();
        let sim = ensure_sim(&db, "8901").await.unwrap();
        assert!(assign_reseller(&db, sim.id, 77).await.is_err());
        assert!(active_reseller(&db, sim.id).await.unwrap().is_none());
    }
}
