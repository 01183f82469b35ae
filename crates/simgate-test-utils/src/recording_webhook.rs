// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook sink that keeps deliveries in memory.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use simgate_core::types::WebhookDelivery;
use simgate_core::{SimgateError, WebhookSink};

/// Records deliveries, ignoring repeats of a `message_id` like the real sink.
#[derive(Default)]
pub struct RecordingWebhookSink {
    deliveries: Mutex<Vec<WebhookDelivery>>,
    failing: AtomicBool,
}

impl RecordingWebhookSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every delivery fails and nothing is recorded.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn deliveries(&self) -> Vec<WebhookDelivery> {
        self.deliveries.lock().await.clone()
    }

    /// Event types delivered for one SIM, in order.
    pub async fn events_for(&self, sim_id: i64) -> Vec<String> {
        self.deliveries
            .lock()
            .await
            .iter()
            .filter(|d| d.sim_id == sim_id)
            .map(|d| d.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl WebhookSink for RecordingWebhookSink {
    async fn deliver(&self, delivery: &WebhookDelivery) -> Result<(), SimgateError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SimgateError::webhook(
                Some(500),
                format!("{} unavailable", delivery.url),
            ));
        }
        let mut deliveries = self.deliveries.lock().await;
        if deliveries.iter().all(|d| d.message_id != delivery.message_id) {
            deliveries.push(delivery.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(message_id: &str) -> WebhookDelivery {
        WebhookDelivery {
            message_id: message_id.into(),
            reseller_id: 1,
            sim_id: 7,
            event_type: "sim.suspended".into(),
            url: "http://reseller.test/hooks".into(),
            payload: "{}".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_message_ids_are_recorded_once() {
        let sink = RecordingWebhookSink::new();
        sink.deliver(&delivery("m1")).await.unwrap();
        sink.deliver(&delivery("m1")).await.unwrap();
        sink.deliver(&delivery("m2")).await.unwrap();
        assert_eq!(sink.deliveries().await.len(), 2);
        assert_eq!(sink.events_for(7).await, vec!["sim.suspended", "sim.suspended"]);
    }

    #[tokio::test]
    async fn failing_sink_records_nothing() {
        let sink = RecordingWebhookSink::new();
        sink.set_failing(true);
        assert!(sink.deliver(&delivery("m1")).await.is_err());
        assert!(sink.deliveries().await.is_empty());
    }
}
