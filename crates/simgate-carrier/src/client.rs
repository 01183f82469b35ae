// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the carrier activation API.
//!
//! Every call obtains a bearer token from the in-memory cache, retries once
//! with a fresh token on 401, and records the outcome in the audit sink.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use simgate_config::model::CarrierConfig;
use simgate_core::types::{
    BulkActivationItem, BulkActivationResponse, CarrierAuditEntry, ChangeStateResponse, LineState,
    RunContext, SubscriberDetails,
};
use simgate_core::{AuditSink, CarrierApi, ExternalErrorKind, SimgateError};

use crate::types::{
    ActivationRequest, ActivationResponse, ApiErrorResponse, BulkActivationRequest,
    ChangeStateRequest, TokenRequest, TokenResponse,
};

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// HTTP client for the carrier API.
pub struct CarrierClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    refresh_margin: Duration,
    token: Mutex<Option<CachedToken>>,
    audit: Arc<dyn AuditSink>,
}

impl fmt::Debug for CarrierClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CarrierClient")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

impl CarrierClient {
    /// Build a client from configuration.
    ///
    /// Missing base URL or credentials is a [`SimgateError::Configuration`],
    /// which aborts any run that needs the carrier.
    pub fn from_config(config: &CarrierConfig, audit: Arc<dyn AuditSink>) -> Result<Self, SimgateError> {
        let creds = config.credentials()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SimgateError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: creds.base_url.trim_end_matches('/').to_string(),
            client_id: creds.client_id.to_string(),
            client_secret: creds.client_secret.to_string(),
            refresh_margin: Duration::from_secs(config.token_refresh_margin_secs),
            token: Mutex::new(None),
            audit,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn audit(
        &self,
        ctx: &RunContext,
        operation: &str,
        request_ref: Option<&str>,
        status_code: Option<u16>,
        body: &str,
    ) {
        let entry = CarrierAuditEntry {
            run_id: ctx.run_id.to_string(),
            operation: operation.to_string(),
            request_ref: request_ref.map(str::to_string),
            status_code,
            body: body.to_string(),
        };
        if let Err(e) = self.audit.record(&entry).await {
            warn!(run_id = %ctx.run_id, operation, error = %e, "failed to record carrier audit entry");
        }
    }

    /// Return the cached token, exchanging credentials when it is missing,
    /// inside the refresh margin, or `force`d.
    async fn bearer(&self, ctx: &RunContext, force: bool) -> Result<String, SimgateError> {
        let mut cached = self.token.lock().await;
        if !force {
            if let Some(token) = cached.as_ref() {
                if Instant::now() < token.refresh_at {
                    return Ok(token.value.clone());
                }
            }
        }

        let request = TokenRequest {
            grant_type: "client_credentials",
            client_id: &self.client_id,
            client_secret: &self.client_secret,
        };
        let response = self
            .client
            .post(self.url("/oauth/token"))
            .json(&request)
            .send()
            .await;
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                self.audit(ctx, "token", None, None, &e.to_string()).await;
                return Err(transport_error(e));
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            self.audit(ctx, "token", None, Some(status.as_u16()), &body).await;
            // The token endpoint rejecting us is an auth failure whatever the code.
            let kind = match classify(status) {
                ExternalErrorKind::RateLimited => ExternalErrorKind::RateLimited,
                _ if status.is_client_error() => ExternalErrorKind::Auth,
                other => other,
            };
            return Err(SimgateError::carrier(
                kind,
                Some(status.as_u16()),
                format!("token exchange failed: {}", error_message(status, &body)),
            ));
        }
        self.audit(ctx, "token", None, Some(status.as_u16()), "[REDACTED]").await;

        let token: TokenResponse = parse_body(status, &body)?;
        let lifetime = Duration::from_secs(token.expires_in);
        let refresh_at = Instant::now() + lifetime.saturating_sub(self.refresh_margin);
        debug!(expires_in = token.expires_in, "carrier token refreshed");
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at,
        });
        Ok(token.access_token)
    }

    /// Send an authorized request, retrying once with a fresh token on 401.
    /// Returns the success body, or a classified carrier error.
    async fn send<B: Serialize + Sync + ?Sized>(
        &self,
        ctx: &RunContext,
        operation: &str,
        request_ref: Option<&str>,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(StatusCode, String), SimgateError> {
        let mut force_refresh = false;
        loop {
            let token = self.bearer(ctx, force_refresh).await?;
            let mut request = self
                .client
                .request(method.clone(), self.url(path))
                .bearer_auth(&token);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    self.audit(ctx, operation, request_ref, None, &e.to_string()).await;
                    return Err(transport_error(e));
                }
            };

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            self.audit(ctx, operation, request_ref, Some(status.as_u16()), &text)
                .await;
            debug!(run_id = %ctx.run_id, operation, status = status.as_u16(), "carrier call completed");

            if status.is_success() {
                return Ok((status, text));
            }
            if status == StatusCode::UNAUTHORIZED && !force_refresh {
                warn!(operation, "carrier rejected token, refreshing once");
                force_refresh = true;
                continue;
            }
            return Err(SimgateError::carrier(
                classify(status),
                Some(status.as_u16()),
                format!("{operation} failed: {}", error_message(status, &text)),
            ));
        }
    }
}

/// Map an HTTP status onto the structured error kind.
pub(crate) fn classify(status: StatusCode) -> ExternalErrorKind {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ExternalErrorKind::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ExternalErrorKind::Auth,
        _ => ExternalErrorKind::Generic,
    }
}

fn transport_error(e: reqwest::Error) -> SimgateError {
    SimgateError::carrier(ExternalErrorKind::Generic, None, format!("HTTP request failed: {e}"))
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(body) {
        if let Some(message) = api_err.message {
            return match api_err.code {
                Some(code) => format!("carrier error {code} ({status}): {message}"),
                None => format!("carrier error ({status}): {message}"),
            };
        }
    }
    let mut body = body.trim().to_string();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    format!("API returned {status}: {body}")
}

fn parse_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, SimgateError> {
    serde_json::from_str(body).map_err(|e| {
        SimgateError::carrier(
            ExternalErrorKind::Generic,
            Some(status.as_u16()),
            format!("failed to parse carrier response: {e}"),
        )
    })
}

#[async_trait]
impl CarrierApi for CarrierClient {
    async fn token(&self, ctx: &RunContext) -> Result<String, SimgateError> {
        self.bearer(ctx, false).await
    }

    async fn activate(&self, ctx: &RunContext, iccid: &str, imei: &str) -> Result<String, SimgateError> {
        let request = ActivationRequest { iccid, imei };
        let (status, body) = self
            .send(ctx, "activate", Some(iccid), Method::POST, "/v1/activations", Some(&request))
            .await?;
        let response: ActivationResponse = parse_body(status, &body)?;
        response
            .subscription_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                SimgateError::carrier(
                    ExternalErrorKind::Generic,
                    Some(status.as_u16()),
                    "activation response carried no subscription id",
                )
            })
    }

    async fn bulk_activate(
        &self,
        ctx: &RunContext,
        items: &[BulkActivationItem],
    ) -> Result<BulkActivationResponse, SimgateError> {
        let request = BulkActivationRequest { items };
        let request_ref = format!("{} items", items.len());
        let (status, body) = self
            .send(
                ctx,
                "bulk_activate",
                Some(&request_ref),
                Method::POST,
                "/v1/activations/bulk",
                Some(&request),
            )
            .await?;
        parse_body(status, &body)
    }

    async fn subscriber_details(
        &self,
        ctx: &RunContext,
        subscription_id: &str,
    ) -> Result<SubscriberDetails, SimgateError> {
        let path = format!("/v1/subscriptions/{subscription_id}");
        let (status, body) = self
            .send::<()>(ctx, "subscriber_details", Some(subscription_id), Method::GET, &path, None)
            .await?;
        parse_body(status, &body)
    }

    async fn disconnect(&self, ctx: &RunContext, subscription_id: &str) -> Result<(), SimgateError> {
        let path = format!("/v1/subscriptions/{subscription_id}");
        self.send::<()>(ctx, "disconnect", Some(subscription_id), Method::DELETE, &path, None)
            .await?;
        Ok(())
    }

    async fn change_state(
        &self,
        ctx: &RunContext,
        mdn: &str,
        state: LineState,
    ) -> Result<ChangeStateResponse, SimgateError> {
        let request = ChangeStateRequest { mdn, state };
        let (status, body) = self
            .send(ctx, "change_state", Some(mdn), Method::POST, "/v1/lines/state", Some(&request))
            .await?;
        if body.trim().is_empty() {
            return Ok(ChangeStateResponse::default());
        }
        parse_body(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingAudit {
        entries: StdMutex<Vec<CarrierAuditEntry>>,
    }

    #[async_trait]
    impl AuditSink for RecordingAudit {
        async fn record(&self, entry: &CarrierAuditEntry) -> Result<(), SimgateError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    fn config(base_url: &str) -> CarrierConfig {
        CarrierConfig {
            base_url: Some(base_url.to_string()),
            client_id: Some("client".into()),
            client_secret: Some("secret".into()),
            timeout_secs: 5,
            token_refresh_margin_secs: 60,
        }
    }

    fn test_client(base_url: &str) -> (CarrierClient, Arc<RecordingAudit>) {
        let audit = Arc::new(RecordingAudit::default());
        let client = CarrierClient::from_config(&config(base_url), audit.clone()).unwrap();
        (client, audit)
    }

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "tok-1", "expires_in": 3600})),
            )
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test]
    fn missing_credentials_is_configuration_error() {
        let audit: Arc<dyn AuditSink> = Arc::new(RecordingAudit::default());
        let err = CarrierClient::from_config(&CarrierConfig::default(), audit).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn debug_redacts_secret() {
        let (client, _) = test_client("http://localhost:1");
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret\""));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn classification_is_by_status() {
        assert_eq!(classify(StatusCode::TOO_MANY_REQUESTS), ExternalErrorKind::RateLimited);
        assert_eq!(classify(StatusCode::FORBIDDEN), ExternalErrorKind::Auth);
        assert_eq!(classify(StatusCode::BAD_GATEWAY), ExternalErrorKind::Generic);
    }

    #[tokio::test]
    async fn activate_returns_subscription_id_and_caches_token() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1/activations"))
            .and(header("authorization", "Bearer tok-1"))
            .and(body_json(serde_json::json!({"iccid": "8901", "imei": "356938035643809"})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"subscription_id": "778899"})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let (client, audit) = test_client(&server.uri());
        let ctx = RunContext::new("test");
        assert_eq!(client.activate(&ctx, "8901", "356938035643809").await.unwrap(), "778899");
        assert_eq!(client.activate(&ctx, "8901", "356938035643809").await.unwrap(), "778899");

        let entries = audit.entries.lock().unwrap();
        let ops: Vec<&str> = entries.iter().map(|e| e.operation.as_str()).collect();
        assert_eq!(ops, vec!["token", "activate", "activate"]);
        assert!(entries.iter().all(|e| e.run_id == ctx.run_id.to_string()));
        assert_eq!(entries[0].body, "[REDACTED]");
        assert_eq!(entries[1].request_ref.as_deref(), Some("8901"));
    }

    #[tokio::test]
    async fn rate_limit_is_classified_structurally() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1/activations"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let (client, _) = test_client(&server.uri());
        let err = client
            .activate(&RunContext::new("test"), "8901", "356938035643809")
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn unauthorized_refreshes_token_once() {
        let server = MockServer::start().await;
        mount_token(&server, 2).await;
        Mock::given(method("POST"))
            .and(path("/v1/lines/state"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/lines/state"))
            .and(body_json(serde_json::json!({"mdn": "+18545551234", "state": "Suspend"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"rejected": []})))
            .mount(&server)
            .await;

        let (client, _) = test_client(&server.uri());
        let response = client
            .change_state(&RunContext::new("test"), "+18545551234", LineState::Suspend)
            .await
            .unwrap();
        assert!(response.rejected.is_empty());
    }

    #[tokio::test]
    async fn repeated_unauthorized_is_auth_failure() {
        let server = MockServer::start().await;
        mount_token(&server, 2).await;
        Mock::given(method("DELETE"))
            .and(path("/v1/subscriptions/778899"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let (client, _) = test_client(&server.uri());
        let err = client
            .disconnect(&RunContext::new("test"), "778899")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SimgateError::ExternalService {
                kind: ExternalErrorKind::Auth,
                status: Some(401),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn rejected_token_exchange_is_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"code": "invalid_client", "message": "bad secret"})),
            )
            .mount(&server)
            .await;

        let (client, _) = test_client(&server.uri());
        let err = client.token(&RunContext::new("test")).await.unwrap_err();
        assert_eq!(err.kind_label(), "external_auth");
        assert!(err.to_string().contains("bad secret"));
    }

    #[tokio::test]
    async fn bulk_and_details_parse_responses() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1/activations/bulk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "successful": [{"iccid": "8901", "subscription_id": "s1"}],
                "failed": [{"reason": "bad imei"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/subscriptions/s1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"phone_number": "+18545551234"})),
            )
            .mount(&server)
            .await;

        let (client, _) = test_client(&server.uri());
        let ctx = RunContext::new("test");
        let items = vec![
            BulkActivationItem { iccid: "8901".into(), imei: "356938035643809".into() },
            BulkActivationItem { iccid: "8902".into(), imei: "356938035643817".into() },
        ];
        let response = client.bulk_activate(&ctx, &items).await.unwrap();
        assert_eq!(response.successful.len(), 1);
        assert_eq!(response.failed[0].iccid, None);

        let details = client.subscriber_details(&ctx, "s1").await.unwrap();
        assert_eq!(details.phone_number.as_deref(), Some("+18545551234"));
    }

    #[tokio::test]
    async fn server_error_is_generic_with_message() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1/activations"))
            .respond_with(ResponseTemplate::new(500).set_body_json(
                serde_json::json!({"code": "E42", "message": "Too many subrequests"}),
            ))
            .mount(&server)
            .await;

        let (client, _) = test_client(&server.uri());
        let err = client
            .activate(&RunContext::new("test"), "8901", "356938035643809")
            .await
            .unwrap_err();
        // Wording alone never makes a rate limit.
        assert!(!err.is_rate_limited());
        assert!(err.to_string().contains("E42"));
    }
}
