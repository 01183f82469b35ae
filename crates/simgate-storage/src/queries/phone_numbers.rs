// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone number history. Rows are closed and replaced, never edited in place.

use rusqlite::{params, OptionalExtension};
use simgate_core::types::PhoneNumberAssignment;
use simgate_core::SimgateError;

use crate::database::{map_tr_err, Database};
use crate::models::{phone_from_row, PHONE_COLUMNS};
use crate::queries::NOW;

pub async fn current_phone_number(
    db: &Database,
    sim_id: i64,
) -> Result<Option<PhoneNumberAssignment>, SimgateError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {PHONE_COLUMNS} FROM phone_numbers
                     WHERE sim_id = ?1 AND valid_to IS NULL"
                ),
                params![sim_id],
                phone_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Close the current number and open `e164` in one transaction.
///
/// Returns `false` without writing when `e164` is already current.
pub async fn rotate_phone_number(db: &Database, sim_id: i64, e164: &str) -> Result<bool, SimgateError> {
    let e164 = e164.trim().to_string();
    if e164.is_empty() {
        return Err(SimgateError::Validation("phone number must not be empty".into()));
    }
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current: Option<String> = tx
                .query_row(
                    "SELECT e164 FROM phone_numbers WHERE sim_id = ?1 AND valid_to IS NULL",
                    params![sim_id],
                    |row| row.get(0),
                )
                .optional()?;

            if current.as_deref() == Some(e164.as_str()) {
                tx.commit()?;
                return Ok(false);
            }

            tx.execute(
                &format!(
                    "UPDATE phone_numbers SET valid_to = {NOW}
                     WHERE sim_id = ?1 AND valid_to IS NULL"
                ),
                params![sim_id],
            )?;
            tx.execute(
                "INSERT INTO phone_numbers (sim_id, e164) VALUES (?1, ?2)",
                params![sim_id, e164],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn close_phone_number(db: &Database, sim_id: i64) -> Result<(), SimgateError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE phone_numbers SET valid_to = {NOW}
                     WHERE sim_id = ?1 AND valid_to IS NULL"
                ),
                params![sim_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Every number the SIM has held, oldest first.
pub async fn phone_history(db: &Database, sim_id: i64) -> Result<Vec<PhoneNumberAssignment>, SimgateError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PHONE_COLUMNS} FROM phone_numbers WHERE sim_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![sim_id], phone_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sims::ensure_sim;

    #[tokio::test]
    async fn rotation_closes_previous_row() {
        let db = Database::open_in_memory().await.unwrap();
        let sim = ensure_sim(&db, "8901").await.unwrap();

        assert!(rotate_phone_number(&db, sim.id, "+18545551234").await.unwrap());
        assert!(!rotate_phone_number(&db, sim.id, "+18545551234").await.unwrap());
        assert!(rotate_phone_number(&db, sim.id, "+18545559999").await.unwrap());

        let history = phone_history(&db, sim.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].e164, "+18545551234");
        assert!(history[0].valid_to.is_some());
        assert!(history[1].valid_to.is_none());

        let current = current_phone_number(&db, sim.id).await.unwrap().unwrap();
        assert_eq!(current.e164, "+18545559999");
    }

    #[tokio::test]
    async fn close_leaves_no_current_number() {
        let db = Database::open_in_memory().await.unwrap();
        let sim = ensure_sim(&db, "8901").await.unwrap();
        rotate_phone_number(&db, sim.id, "+18545551234").await.unwrap();

        close_phone_number(&db, sim.id).await.unwrap();
        close_phone_number(&db, sim.id).await.unwrap();
        assert!(current_phone_number(&db, sim.id).await.unwrap().is_none());
        assert_eq!(phone_history(&db, sim.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn schema_rejects_two_current_numbers() {
        let db = Database::open_in_memory().await.unwrap();
        let sim = ensure_sim(&db, "8901").await.unwrap();
        let sim_id = sim.id;
        let result = db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO phone_numbers (sim_id, e164) VALUES (?1, '+1'), (?1, '+2')",
                    params![sim_id],
                )?;
                Ok(())
            })
            .await;
        assert!(result.is_err());
    }
}
