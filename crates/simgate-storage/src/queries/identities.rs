// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! IMEI identity pool queries.
//!
//! An entry moves `available -> allocated -> retired`, or back to `available`
//! on release. The schema allows at most one `allocated` entry per SIM.

use rusqlite::{params, OptionalExtension};
use simgate_core::types::{IdentityPoolEntry, IdentityStatus};
use simgate_core::SimgateError;

use crate::database::{map_tr_err, Database};
use crate::models::{identity_from_row, IDENTITY_COLUMNS};
use crate::queries::NOW;

/// Insert `available` entries, ignoring IMEIs already in the pool.
pub async fn add_identities(db: &Database, imeis: &[String]) -> Result<usize, SimgateError> {
    let imeis = imeis.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO imei_pool (imei) VALUES (?1) ON CONFLICT(imei) DO NOTHING",
                )?;
                for imei in &imeis {
                    inserted += stmt.execute(params![imei])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_identity(db: &Database, id: i64) -> Result<Option<IdentityPoolEntry>, SimgateError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {IDENTITY_COLUMNS} FROM imei_pool WHERE id = ?1"),
                params![id],
                identity_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Move the oldest `available` entry to `allocated` for `sim_id`, in one transaction.
pub async fn allocate_identity(db: &Database, sim_id: i64) -> Result<IdentityPoolEntry, SimgateError> {
    let allocated = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let candidate: Option<i64> = tx
                .query_row(
                    "SELECT id FROM imei_pool WHERE status = 'available' ORDER BY id LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(entry_id) = candidate else {
                tx.commit()?;
                return Ok(None);
            };

            tx.execute(
                &format!(
                    "UPDATE imei_pool SET status = 'allocated', sim_id = ?1, updated_at = {NOW}
                     WHERE id = ?2 AND status = 'available'"
                ),
                params![sim_id, entry_id],
            )?;
            let entry = tx.query_row(
                &format!("SELECT {IDENTITY_COLUMNS} FROM imei_pool WHERE id = ?1"),
                params![entry_id],
                identity_from_row,
            )?;
            tx.commit()?;
            Ok(Some(entry))
        })
        .await
        .map_err(map_tr_err)?;

    allocated.ok_or(SimgateError::PoolExhausted)
}

/// Return an `allocated` entry owned by `sim_id` to `available`. No-op otherwise.
pub async fn release_identity(db: &Database, entry_id: i64, sim_id: i64) -> Result<(), SimgateError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE imei_pool SET status = 'available', sim_id = NULL, updated_at = {NOW}
                     WHERE id = ?1 AND sim_id = ?2 AND status = 'allocated'"
                ),
                params![entry_id, sim_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an entry owned by `sim_id` as `retired`. The owner is kept for history.
pub async fn retire_identity(db: &Database, entry_id: i64, sim_id: i64) -> Result<(), SimgateError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE imei_pool SET status = 'retired', updated_at = {NOW}
                     WHERE id = ?1 AND sim_id = ?2 AND status <> 'retired'"
                ),
                params![entry_id, sim_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_identities(db: &Database, status: IdentityStatus) -> Result<usize, SimgateError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM imei_pool WHERE status = ?1",
                params![status],
                |row| row.get(0),
            )?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
        .await
        .map_err(map_tr_err)
}

/// Entries currently `allocated` to `sim_id`. At most one by schema.
pub async fn allocated_for_sim(
    db: &Database,
    sim_id: i64,
) -> Result<Vec<IdentityPoolEntry>, SimgateError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {IDENTITY_COLUMNS} FROM imei_pool
                 WHERE sim_id = ?1 AND status = 'allocated' ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![sim_id], identity_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sims::ensure_sim;

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let sim = ensure_sim(&db, "8901").await.unwrap();
        (db, sim.id)
    }

    #[tokio::test]
    async fn add_ignores_duplicates() {
        let (db, _) = setup().await;
        let imeis = vec!["356938035643809".to_string(), "356938035643817".to_string()];
        assert_eq!(add_identities(&db, &imeis).await.unwrap(), 2);
        assert_eq!(add_identities(&db, &imeis).await.unwrap(), 0);
        assert_eq!(count_identities(&db, IdentityStatus::Available).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn allocate_until_exhausted() {
        let (db, sim_id) = setup().await;
        add_identities(&db, &["356938035643809".to_string()]).await.unwrap();

        let entry = allocate_identity(&db, sim_id).await.unwrap();
        assert_eq!(entry.status, IdentityStatus::Allocated);
        assert_eq!(entry.sim_id, Some(sim_id));

        let other = ensure_sim(&db, "8902").await.unwrap();
        let err = allocate_identity(&db, other.id).await.unwrap_err();
        assert!(matches!(err, SimgateError::PoolExhausted));
    }

    #[tokio::test]
    async fn second_allocation_for_same_sim_is_rejected() {
        let (db, sim_id) = setup().await;
        add_identities(&db, &["356938035643809".to_string(), "356938035643817".to_string()])
            .await
            .unwrap();
        allocate_identity(&db, sim_id).await.unwrap();
        assert!(allocate_identity(&db, sim_id).await.is_err());
        assert_eq!(allocated_for_sim(&db, sim_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn release_and_retire_are_idempotent() {
        let (db, sim_id) = setup().await;
        add_identities(&db, &["356938035643809".to_string(), "356938035643817".to_string()])
            .await
            .unwrap();

        let first = allocate_identity(&db, sim_id).await.unwrap();
        release_identity(&db, first.id, sim_id).await.unwrap();
        release_identity(&db, first.id, sim_id).await.unwrap();
        let released = get_identity(&db, first.id).await.unwrap().unwrap();
        assert_eq!(released.status, IdentityStatus::Available);
        assert_eq!(released.sim_id, None);

        let second = allocate_identity(&db, sim_id).await.unwrap();
        retire_identity(&db, second.id, sim_id).await.unwrap();
        retire_identity(&db, second.id, sim_id).await.unwrap();
        let retired = get_identity(&db, second.id).await.unwrap().unwrap();
        assert_eq!(retired.status, IdentityStatus::Retired);

        // A retired entry is never released back.
        release_identity(&db, second.id, sim_id).await.unwrap();
        let still = get_identity(&db, second.id).await.unwrap().unwrap();
        assert_eq!(still.status, IdentityStatus::Retired);
    }
}
