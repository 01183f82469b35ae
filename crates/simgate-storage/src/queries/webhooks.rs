// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook delivery records, unique by message id.

use rusqlite::{params, OptionalExtension};
use simgate_core::types::WebhookDelivery;
use simgate_core::SimgateError;

use crate::database::{map_tr_err, Database};
use crate::queries::NOW;

/// Stored state of one delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRecord {
    pub message_id: String,
    pub sim_id: i64,
    pub event_type: String,
    pub url: String,
    pub payload: String,
    pub status: String,
    pub response_code: Option<u16>,
}

/// Insert a `pending` delivery. Returns `false` if the message id already exists.
pub async fn record_webhook(db: &Database, delivery: &WebhookDelivery) -> Result<bool, SimgateError> {
    let d = delivery.clone();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO webhook_deliveries
                    (message_id, reseller_id, sim_id, event_type, url, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(message_id) DO NOTHING",
                params![d.message_id, d.reseller_id, d.sim_id, d.event_type, d.url, d.payload],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn finish_webhook(
    db: &Database,
    message_id: &str,
    delivered: bool,
    response_code: Option<u16>,
) -> Result<(), SimgateError> {
    let message_id = message_id.to_string();
    let status = if delivered { "delivered" } else { "failed" };
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE webhook_deliveries SET status = ?1, response_code = ?2, updated_at = {NOW}
                     WHERE message_id = ?3"
                ),
                params![status, response_code, message_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_delivery(db: &Database, message_id: &str) -> Result<Option<DeliveryRecord>, SimgateError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT message_id, sim_id, event_type, url, payload, status, response_code
                 FROM webhook_deliveries WHERE message_id = ?1",
                params![message_id],
                |row| {
                    Ok(DeliveryRecord {
                        message_id: row.get(0)?,
                        sim_id: row.get(1)?,
                        event_type: row.get(2)?,
                        url: row.get(3)?,
                        payload: row.get(4)?,
                        status: row.get(5)?,
                        response_code: row.get(6)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Count deliveries recorded for a SIM and event type.
pub async fn count_deliveries(db: &Database, sim_id: i64, event_type: &str) -> Result<usize, SimgateError> {
    let event_type = event_type.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM webhook_deliveries WHERE sim_id = ?1 AND event_type = ?2",
                params![sim_id, event_type],
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

    fn delivery(message_id: &str) -> WebhookDelivery {
        WebhookDelivery {
            message_id: message_id.to_string(),
            reseller_id: 1,
            sim_id: 7,
            event_type: "sim.suspended".to_string(),
            url: "https://reseller.example/hook".to_string(),
            payload: "{}".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_message_id_is_ignored() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(record_webhook(&db, &delivery("sim.suspended-7-run")).await.unwrap());
        assert!(!record_webhook(&db, &delivery("sim.suspended-7-run")).await.unwrap());
        assert_eq!(count_deliveries(&db, 7, "sim.suspended").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn finish_records_outcome() {
        let db = Database::open_in_memory().await.unwrap();
        record_webhook(&db, &delivery("m1")).await.unwrap();
        finish_webhook(&db, "m1", false, Some(503)).await.unwrap();

        let record = get_delivery(&db, "m1").await.unwrap().unwrap();
        assert_eq!(record.status, "failed");
        assert_eq!(record.response_code, Some(503));
    }
}
