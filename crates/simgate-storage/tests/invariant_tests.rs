// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema-level invariants exercised through the `SimStore` trait.

use simgate_core::types::IdentityStatus;
use simgate_core::{SimPatch, SimStore};
use simgate_storage::{Database, SqliteSimStore};
use tempfile::tempdir;

async fn file_store() -> (SqliteSimStore, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("invariants.db");
    let db = Database::open(path.to_str().unwrap()).await.unwrap();
    (SqliteSimStore::new(db), dir)
}

async fn allocated_rows(store: &SqliteSimStore, sim_id: i64) -> Vec<i64> {
    store
        .database()
        .connection()
        .call(move |conn| -> Result<Vec<i64>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id FROM imei_pool WHERE sim_id = ?1 AND status = 'allocated'",
            )?;
            let rows = stmt.query_map([sim_id], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .unwrap()
}

/// Repeated retire-then-allocate cycles keep exactly one allocated entry,
/// and it is the one recorded on the SIM.
#[tokio::test]
async fn one_allocated_identity_matches_current_pool_id() {
    let (store, _dir) = file_store().await;
    let imeis: Vec<String> = (0..6).map(|i| format!("35693803564380{i}")).collect();
    store.add_identities(&imeis).await.unwrap();
    let sim = store.ensure_sim("8901260000000000042").await.unwrap();

    let mut current: Option<i64> = None;
    for _ in 0..4 {
        if let Some(prev) = current {
            store.retire_identity(prev, sim.id).await.unwrap();
        }
        let entry = store.allocate_identity(sim.id).await.unwrap();
        store
            .patch_sim(sim.id, None, &SimPatch::default().identity(Some(entry.id)))
            .await
            .unwrap();
        current = Some(entry.id);

        let allocated = allocated_rows(&store, sim.id).await;
        let stored = store.get_sim(sim.id).await.unwrap().unwrap();
        assert_eq!(allocated, vec![entry.id]);
        assert_eq!(stored.current_imei_pool_id, Some(entry.id));
    }

    assert_eq!(store.count_identities(IdentityStatus::Retired).await.unwrap(), 3);
    assert_eq!(store.count_identities(IdentityStatus::Available).await.unwrap(), 2);
}

/// Rotation across many numbers leaves one open row.
#[tokio::test]
async fn one_current_phone_number() {
    let (store, _dir) = file_store().await;
    let sim = store.ensure_sim("8901").await.unwrap();
    for n in ["+15550000001", "+15550000002", "+15550000002", "+15550000003"] {
        store.rotate_phone_number(sim.id, n).await.unwrap();
    }
    let history = store.phone_history(sim.id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history.iter().filter(|p| p.valid_to.is_none()).count(), 1);
}

/// Data survives reopening the same file.
#[tokio::test]
async fn state_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("persist.db");
    let path = path.to_str().unwrap();

    let sim_id = {
        let store = SqliteSimStore::new(Database::open(path).await.unwrap());
        let sim = store.ensure_sim("8901").await.unwrap();
        store.close().await.unwrap();
        sim.id
    };

    let store = SqliteSimStore::new(Database::open(path).await.unwrap());
    let sim = store.get_sim_by_iccid("8901").await.unwrap().unwrap();
    assert_eq!(sim.id, sim_id);
}
