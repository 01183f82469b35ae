// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SIM record queries, including the status-guarded patch.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension};
use simgate_core::{Sim, SimPatch, SimStatus, SimgateError};

use crate::database::{map_tr_err, Database};
use crate::models::{sim_from_row, SIM_COLUMNS};
use crate::queries::NOW;

pub async fn get_sim(db: &Database, id: i64) -> Result<Option<Sim>, SimgateError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SIM_COLUMNS} FROM sims WHERE id = ?1"),
                params![id],
                sim_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_sim_by_iccid(db: &Database, iccid: &str) -> Result<Option<Sim>, SimgateError> {
    let iccid = iccid.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SIM_COLUMNS} FROM sims WHERE iccid = ?1"),
                params![iccid],
                sim_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// SIMs in `status`, least recently touched first.
pub async fn list_sims_by_status(
    db: &Database,
    status: SimStatus,
    limit: usize,
) -> Result<Vec<Sim>, SimgateError> {
    let status = status.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SIM_COLUMNS} FROM sims WHERE status = ?1
                 ORDER BY updated_at ASC, id ASC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![status, limit], sim_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn iccids_in_statuses(
    db: &Database,
    statuses: &[SimStatus],
) -> Result<Vec<String>, SimgateError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let statuses: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
    db.connection()
        .call(move |conn| {
            let placeholders = (1..=statuses.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT iccid FROM sims WHERE status IN ({placeholders}) ORDER BY id"
            ))?;
            let rows = stmt.query_map(params_from_iter(statuses.iter()), |row| row.get(0))?;
            rows.collect::<Result<Vec<String>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch the SIM with `iccid`, inserting it as `pending` when absent.
pub async fn ensure_sim(db: &Database, iccid: &str) -> Result<Sim, SimgateError> {
    let iccid = iccid.trim().to_string();
    if iccid.is_empty() {
        return Err(SimgateError::Validation("iccid must not be empty".into()));
    }
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sims (iccid) VALUES (?1) ON CONFLICT(iccid) DO NOTHING",
                params![iccid],
            )?;
            conn.query_row(
                &format!("SELECT {SIM_COLUMNS} FROM sims WHERE iccid = ?1"),
                params![iccid],
                sim_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Build the SET clause and bound values for a patch. `updated_at` is always bumped.
fn patch_assignments(patch: &SimPatch) -> (Vec<String>, Vec<Value>) {
    fn text(v: Option<String>) -> Value {
        v.map(Value::Text).unwrap_or(Value::Null)
    }
    fn int(v: Option<i64>) -> Value {
        v.map(Value::Integer).unwrap_or(Value::Null)
    }

    let mut columns: Vec<(&str, Value)> = Vec::new();
    if let Some(status) = patch.status {
        columns.push(("status", Value::Text(status.to_string())));
    }
    if let Some(gateway_id) = patch.gateway_id {
        columns.push(("gateway_id", Value::Integer(gateway_id)));
    }
    if let Some(port) = patch.port {
        columns.push(("port", Value::Text(port.to_string())));
    }
    if let Some(imei) = &patch.imei {
        columns.push(("imei", Value::Text(imei.clone())));
    }
    if let Some(pool_id) = patch.current_imei_pool_id {
        columns.push(("current_imei_pool_id", int(pool_id)));
    }
    if let Some(subscription) = &patch.mobility_subscription_id {
        columns.push(("mobility_subscription_id", Value::Text(subscription.clone())));
    }
    if let Some(error) = &patch.last_activation_error {
        columns.push(("last_activation_error", text(error.clone())));
    }
    if let Some(reason) = &patch.status_reason {
        columns.push(("status_reason", text(reason.clone())));
    }

    let mut sets = Vec::with_capacity(columns.len() + 1);
    let mut values = Vec::with_capacity(columns.len());
    for (i, (column, value)) in columns.into_iter().enumerate() {
        sets.push(format!("{column} = ?{}", i + 1));
        values.push(value);
    }
    sets.push(format!("updated_at = {NOW}"));
    (sets, values)
}

/// Apply `patch` to SIM `id`, guarded on the current status when `expected` is
/// given. Returns `true` when a row was updated.
pub async fn patch_sim(
    db: &Database,
    id: i64,
    expected: Option<SimStatus>,
    patch: &SimPatch,
) -> Result<bool, SimgateError> {
    let (sets, mut values) = patch_assignments(patch);
    let mut sql = format!("UPDATE sims SET {} WHERE id = ?{}", sets.join(", "), values.len() + 1);
    values.push(Value::Integer(id));
    if let Some(expected) = expected {
        sql.push_str(&format!(" AND status = ?{}", values.len() + 1));
        values.push(Value::Text(expected.to_string()));
    }

    db.connection()
        .call(move |conn| {
            let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
