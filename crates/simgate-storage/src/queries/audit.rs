// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only carrier call audit trail.

use rusqlite::params;
use simgate_core::types::CarrierAuditEntry;
use simgate_core::SimgateError;

use crate::database::{map_tr_err, Database};

pub async fn insert_audit(db: &Database, entry: &CarrierAuditEntry) -> Result<(), SimgateError> {
    let e = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO carrier_audit (run_id, operation, request_ref, status_code, body)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![e.run_id, e.operation, e.request_ref, e.status_code, e.body],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All audit rows of one run, in call order.
pub async fn entries_for_run(db: &Database, run_id: &str) -> Result<Vec<CarrierAuditEntry>, SimgateError> {
    let run_id = run_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT run_id, operation, request_ref, status_code, body
                 FROM carrier_audit WHERE run_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![run_id], |row| {
                Ok(CarrierAuditEntry {
                    run_id: row.get(0)?,
                    operation: row.get(1)?,
                    request_ref: row.get(2)?,
                    status_code: row.get(3)?,
                    body: row.get(4)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}
