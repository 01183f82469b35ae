// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reseller lifecycle notifications.
//!
//! [`WebhookDispatcher`] is what orchestrators call after a status change has
//! been committed. It never fails: a delivery problem is logged and the
//! committed change stands. [`HttpWebhookSink`] is the production sink that
//! records each delivery and POSTs it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use strum::{Display, EnumString};
use tracing::{debug, warn};

use simgate_config::model::WebhookConfig;
use simgate_core::types::WebhookDelivery;
use simgate_core::{RunContext, Sim, SimStatus, SimStore, SimgateError, WebhookSink};

pub const MESSAGE_ID_HEADER: &str = "X-Simgate-Message-Id";
pub const EVENT_HEADER: &str = "X-Simgate-Event";
pub const SIGNATURE_HEADER: &str = "X-Simgate-Signature";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum WebhookEvent {
    #[strum(serialize = "sim.activated")]
    #[serde(rename = "sim.activated")]
    Activated,
    #[strum(serialize = "sim.suspended")]
    #[serde(rename = "sim.suspended")]
    Suspended,
    #[strum(serialize = "sim.restored")]
    #[serde(rename = "sim.restored")]
    Restored,
    #[strum(serialize = "sim.canceled")]
    #[serde(rename = "sim.canceled")]
    Canceled,
}

/// JSON body sent to resellers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event_type: WebhookEvent,
    pub sim_id: i64,
    pub iccid: String,
    pub status: SimStatus,
    pub status_reason: Option<String>,
    pub phone_number: Option<String>,
    pub occurred_at: String,
}

/// Deterministic per run, so a replayed notification within one run is
/// recognized as a duplicate by the sink.
pub fn message_id(event: WebhookEvent, sim_id: i64, ctx: &RunContext) -> String {
    format!("{event}-{sim_id}-{}", ctx.run_id)
}

#[derive(Clone)]
pub struct WebhookDispatcher {
    store: Arc<dyn SimStore>,
    sink: Arc<dyn WebhookSink>,
}

impl WebhookDispatcher {
    pub fn new(store: Arc<dyn SimStore>, sink: Arc<dyn WebhookSink>) -> Self {
        Self { store, sink }
    }

    /// Best-effort notification of the SIM's active reseller.
    ///
    /// `sim` must already reflect the committed state.
    pub async fn notify(
        &self,
        ctx: &RunContext,
        event: WebhookEvent,
        sim: &Sim,
        phone_number: Option<&str>,
    ) {
        match self.try_notify(ctx, event, sim, phone_number).await {
            Ok(true) => debug!(sim_id = sim.id, %event, "webhook dispatched"),
            Ok(false) => debug!(sim_id = sim.id, %event, "no reseller webhook configured"),
            Err(e) => warn!(sim_id = sim.id, %event, error = %e, "webhook dispatch failed"),
        }
    }

    async fn try_notify(
        &self,
        ctx: &RunContext,
        event: WebhookEvent,
        sim: &Sim,
        phone_number: Option<&str>,
    ) -> Result<bool, SimgateError> {
        let Some(reseller) = self.store.active_reseller(sim.id).await? else {
            return Ok(false);
        };
        let Some(url) = reseller.webhook_url.filter(|u| !u.trim().is_empty()) else {
            return Ok(false);
        };

        let payload = WebhookPayload {
            event_type: event,
            sim_id: sim.id,
            iccid: sim.iccid.clone(),
            status: sim.status,
            status_reason: sim.status_reason.clone(),
            phone_number: phone_number.map(str::to_string),
            occurred_at: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_string(&payload)
            .map_err(|e| SimgateError::Internal(format!("webhook payload: {e}")))?;

        let delivery = WebhookDelivery {
            message_id: message_id(event, sim.id, ctx),
            reseller_id: reseller.id,
            sim_id: sim.id,
            event_type: event.to_string(),
            url,
            payload,
        };
        self.sink.deliver(&delivery).await?;
        Ok(true)
    }
}

type HmacSha256 = Hmac<Sha256>;

/// `sha256=<hex>` HMAC of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, SimgateError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SimgateError::Internal(format!("webhook signing key: {e}")))?;
    mac.update(body);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// Records every delivery in the store, then POSTs it.
pub struct HttpWebhookSink {
    client: reqwest::Client,
    store: Arc<dyn SimStore>,
    signing_secret: Option<String>,
}

impl HttpWebhookSink {
    pub fn from_config(config: &WebhookConfig, store: Arc<dyn SimStore>) -> Result<Self, SimgateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SimgateError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            store,
            signing_secret: config.signing_secret.clone().filter(|s| !s.is_empty()),
        })
    }
}

#[async_trait]
impl WebhookSink for HttpWebhookSink {
    async fn deliver(&self, delivery: &WebhookDelivery) -> Result<(), SimgateError> {
        if !self.store.record_webhook(delivery).await? {
            debug!(message_id = %delivery.message_id, "duplicate delivery ignored");
            return Ok(());
        }

        let mut request = self
            .client
            .post(&delivery.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(MESSAGE_ID_HEADER, &delivery.message_id)
            .header(EVENT_HEADER, &delivery.event_type)
            .body(delivery.payload.clone());
        if let Some(secret) = &self.signing_secret {
            request = request.header(SIGNATURE_HEADER, sign(secret, delivery.payload.as_bytes())?);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.store
                    .finish_webhook(&delivery.message_id, false, None)
                    .await?;
                return Err(SimgateError::webhook(None, format!("{}: {e}", delivery.url)));
            }
        };

        let status = response.status();
        let delivered = status.is_success();
        self.store
            .finish_webhook(&delivery.message_id, delivered, Some(status.as_u16()))
            .await?;
        if !delivered {
            return Err(SimgateError::webhook(
                Some(status.as_u16()),
                format!("{} returned {status}", delivery.url),
            ));
        }
        debug!(message_id = %delivery.message_id, status = status.as_u16(), "webhook delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simgate_core::types::Reseller;
    use simgate_storage::{Database, SqliteSimStore};
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn store() -> Arc<SqliteSimStore> {
        Arc::new(SqliteSimStore::new(Database::open_in_memory().await.unwrap()))
    }

    fn delivery(url: String) -> WebhookDelivery {
        WebhookDelivery {
            message_id: "sim.suspended-7-run".into(),
            reseller_id: 1,
            sim_id: 7,
            event_type: "sim.suspended".into(),
            url,
            payload: r#"{"event_type":"sim.suspended"}"#.into(),
        }
    }

    #[test]
    fn event_names_are_dotted() {
        assert_eq!(WebhookEvent::Suspended.to_string(), "sim.suspended");
        assert_eq!("sim.canceled".parse::<WebhookEvent>().unwrap(), WebhookEvent::Canceled);
        let json = serde_json::to_string(&WebhookEvent::Activated).unwrap();
        assert_eq!(json, "\"sim.activated\"");
    }

    #[test]
    fn message_id_is_stable_within_a_run() {
        let ctx = RunContext::new("suspend");
        let a = message_id(WebhookEvent::Suspended, 7, &ctx);
        assert_eq!(a, message_id(WebhookEvent::Suspended, 7, &ctx));
        assert!(a.starts_with("sim.suspended-7-"));
        assert_ne!(a, message_id(WebhookEvent::Suspended, 7, &RunContext::new("suspend")));
    }

    #[test]
    fn signature_is_hex_hmac() {
        let sig = sign("secret", b"{}").unwrap();
        assert!(sig.starts_with("sha256="));
        assert_eq!(sig.len(), "sha256=".len() + 64);
        assert_eq!(sig, sign("secret", b"{}").unwrap());
        assert_ne!(sig, sign("other", b"{}").unwrap());
    }

    #[tokio::test]
    async fn delivers_signed_once_per_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks"))
            .and(header("x-simgate-event", "sim.suspended"))
            .and(header("x-simgate-message-id", "sim.suspended-7-run"))
            .and(header_exists("x-simgate-signature"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let store = store().await;
        let config = WebhookConfig {
            timeout_secs: 5,
            signing_secret: Some("shh".into()),
        };
        let sink = HttpWebhookSink::from_config(&config, store.clone()).unwrap();
        let delivery = delivery(format!("{}/hooks", server.uri()));

        sink.deliver(&delivery).await.unwrap();
        sink.deliver(&delivery).await.unwrap();

        let record = simgate_storage::queries::webhooks::get_delivery(store.database(), &delivery.message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, "delivered");
        assert_eq!(record.response_code, Some(204));
    }

    #[tokio::test]
    async fn non_success_is_recorded_and_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = store().await;
        let sink = HttpWebhookSink::from_config(&WebhookConfig::default(), store.clone()).unwrap();
        let delivery = delivery(format!("{}/hooks", server.uri()));
        let err = sink.deliver(&delivery).await.unwrap_err();
        assert!(matches!(
            err,
            SimgateError::ExternalService { status: Some(500), .. }
        ));

        let record = simgate_storage::queries::webhooks::get_delivery(store.database(), &delivery.message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, "failed");
    }

    #[tokio::test]
    async fn dispatcher_skips_sims_without_reseller_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let store = store().await;
        let sim = store.ensure_sim("8901").await.unwrap();
        store
            .upsert_reseller(&Reseller {
                id: 1,
                name: "quiet".into(),
                webhook_url: None,
            })
            .await
            .unwrap();
        store.assign_reseller(sim.id, 1).await.unwrap();

        let sink = Arc::new(HttpWebhookSink::from_config(&WebhookConfig::default(), store.clone()).unwrap());
        let dispatcher = WebhookDispatcher::new(store.clone(), sink);
        dispatcher
            .notify(&RunContext::new("suspend"), WebhookEvent::Suspended, &sim, None)
            .await;
    }
}
