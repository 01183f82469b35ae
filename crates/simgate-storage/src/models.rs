// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row-to-domain mapping shared by the query modules.

use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::Row;
use simgate_core::types::{IdentityPoolEntry, IdentityStatus, PhoneNumberAssignment, Reseller};
use simgate_core::{Port, Sim, SimStatus};

/// Column list matching [`sim_from_row`].
pub(crate) const SIM_COLUMNS: &str = "id, iccid, status, gateway_id, port, imei, \
     current_imei_pool_id, mobility_subscription_id, last_activation_error, \
     status_reason, created_at, updated_at";

pub(crate) const IDENTITY_COLUMNS: &str = "id, imei, sim_id, status, updated_at";

pub(crate) const PHONE_COLUMNS: &str = "id, sim_id, e164, valid_from, valid_to";

/// Parse a TEXT column through `FromStr`, surfacing failures as conversion errors.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn sim_from_row(row: &Row<'_>) -> rusqlite::Result<Sim> {
    let port: Option<String> = row.get(4)?;
    let port = match port {
        Some(raw) => Some(raw.parse::<Port>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(Sim {
        id: row.get(0)?,
        iccid: row.get(1)?,
        status: parse_column::<SimStatus>(row, 2)?,
        gateway_id: row.get(3)?,
        port,
        imei: row.get(5)?,
        current_imei_pool_id: row.get(6)?,
        mobility_subscription_id: row.get(7)?,
        last_activation_error: row.get(8)?,
        status_reason: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub(crate) fn identity_from_row(row: &Row<'_>) -> rusqlite::Result<IdentityPoolEntry> {
    Ok(IdentityPoolEntry {
        id: row.get(0)?,
        imei: row.get(1)?,
        sim_id: row.get(2)?,
        status: parse_column::<IdentityStatus>(row, 3)?,
        updated_at: row.get(4)?,
    })
}

pub(crate) fn phone_from_row(row: &Row<'_>) -> rusqlite::Result<PhoneNumberAssignment> {
    Ok(PhoneNumberAssignment {
        id: row.get(0)?,
        sim_id: row.get(1)?,
        e164: row.get(2)?,
        valid_from: row.get(3)?,
        valid_to: row.get(4)?,
    })
}

pub(crate) fn reseller_from_row(row: &Row<'_>) -> rusqlite::Result<Reseller> {
    Ok(Reseller {
        id: row.get(0)?,
        name: row.get(1)?,
        webhook_url: row.get(2)?,
    })
}
