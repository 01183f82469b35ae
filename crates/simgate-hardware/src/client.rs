// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-gateway HTTP client implementing [`GatewayHardware`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use simgate_config::model::HardwareConfig;
use simgate_core::types::GatewayPortSnapshot;
use simgate_core::{ExternalErrorKind, GatewayHardware, Port, SimgateError};

/// One gateway's connection details.
#[derive(Clone)]
struct GatewayEndpoint {
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

/// Port listing as the device reports it.
#[derive(Debug, Deserialize)]
struct PortListResponse {
    #[serde(default)]
    ports: Vec<RawPort>,
}

#[derive(Debug, Deserialize)]
struct RawPort {
    port: String,
    #[serde(default)]
    iccid: Option<String>,
    #[serde(default)]
    imei: Option<String>,
}

#[derive(Debug, Serialize)]
struct SetImeiRequest<'a> {
    port: String,
    imei: &'a str,
}

/// HTTP client for every gateway in the configured fleet.
#[derive(Clone)]
pub struct GatewayFleetClient {
    client: reqwest::Client,
    gateways: BTreeMap<i64, GatewayEndpoint>,
}

impl std::fmt::Debug for GatewayFleetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayFleetClient")
            .field("gateways", &self.gateways.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl GatewayFleetClient {
    /// Build a client for the configured fleet. An empty fleet is a configuration error.
    pub fn from_config(config: &HardwareConfig) -> Result<Self, SimgateError> {
        if config.gateways.is_empty() {
            return Err(SimgateError::Configuration(
                "no [[hardware.gateways]] configured".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SimgateError::Internal(format!("failed to build HTTP client: {e}")))?;

        let gateways = config
            .gateways
            .iter()
            .map(|g| {
                (
                    g.id,
                    GatewayEndpoint {
                        base_url: g.base_url.trim_end_matches('/').to_string(),
                        username: g.username.clone(),
                        password: g.password.clone(),
                    },
                )
            })
            .collect();

        Ok(Self { client, gateways })
    }

    fn endpoint(&self, gateway_id: i64) -> Result<&GatewayEndpoint, SimgateError> {
        self.gateways.get(&gateway_id).ok_or_else(|| SimgateError::NotFound {
            entity: "gateway",
            id: gateway_id.to_string(),
        })
    }

    fn request(
        &self,
        endpoint: &GatewayEndpoint,
        method: reqwest::Method,
        path: &str,
    ) -> reqwest::RequestBuilder {
        let request = self
            .client
            .request(method, format!("{}{}", endpoint.base_url, path));
        match &endpoint.username {
            Some(user) => request.basic_auth(user, endpoint.password.as_deref()),
            None => request,
        }
    }
}

fn gateway_error(gateway_id: i64, status: StatusCode, body: &str) -> SimgateError {
    let kind = match status {
        StatusCode::TOO_MANY_REQUESTS => ExternalErrorKind::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ExternalErrorKind::Auth,
        _ => ExternalErrorKind::Generic,
    };
    SimgateError::gateway(
        kind,
        Some(status.as_u16()),
        format!("gateway {gateway_id} returned {status}: {}", body.trim()),
    )
}

fn transport_error(gateway_id: i64, e: reqwest::Error) -> SimgateError {
    SimgateError::gateway(
        ExternalErrorKind::Generic,
        None,
        format!("gateway {gateway_id} unreachable: {e}"),
    )
}

/// Convert the device listing into canonical snapshots.
///
/// Ports whose notation cannot be parsed are dropped with a warning rather
/// than failing the whole listing.
fn canonicalize(gateway_id: i64, raw: Vec<RawPort>) -> Vec<GatewayPortSnapshot> {
    fn present(value: Option<String>) -> Option<String> {
        value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    raw.into_iter()
        .filter_map(|p| match Port::from_hardware(&p.port) {
            Ok(port) => Some(GatewayPortSnapshot {
                gateway_id,
                port,
                iccid: present(p.iccid),
                imei: present(p.imei),
            }),
            Err(e) => {
                warn!(gateway_id, raw_port = %p.port, error = %e, "skipping unparseable port");
                None
            }
        })
        .collect()
}

#[async_trait]
impl GatewayHardware for GatewayFleetClient {
    async fn gateway_ids(&self) -> Result<Vec<i64>, SimgateError> {
        // BTreeMap keys are already ascending.
        Ok(self.gateways.keys().copied().collect())
    }

    async fn port_info(&self, gateway_id: i64) -> Result<Vec<GatewayPortSnapshot>, SimgateError> {
        let endpoint = self.endpoint(gateway_id)?;
        let response = self
            .request(endpoint, reqwest::Method::GET, "/api/ports")
            .send()
            .await
            .map_err(|e| transport_error(gateway_id, e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(gateway_error(gateway_id, status, &body));
        }

        let listing: PortListResponse = serde_json::from_str(&body).map_err(|e| {
            SimgateError::gateway(
                ExternalErrorKind::Generic,
                Some(status.as_u16()),
                format!("gateway {gateway_id} sent a malformed port listing: {e}"),
            )
        })?;
        let snapshot = canonicalize(gateway_id, listing.ports);
        debug!(gateway_id, ports = snapshot.len(), "port snapshot fetched");
        Ok(snapshot)
    }

    async fn set_imei(&self, gateway_id: i64, port: Port, imei: &str) -> Result<(), SimgateError> {
        let endpoint = self.endpoint(gateway_id)?;
        let request = SetImeiRequest {
            port: port.to_hardware(),
            imei,
        };
        let response = self
            .request(endpoint, reqwest::Method::POST, "/api/ports/imei")
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(gateway_id, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(gateway_error(gateway_id, status, &body));
        }
        debug!(gateway_id, %port, "imei programmed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simgate_config::model::GatewayEndpointConfig;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fleet(gateways: &[(i64, &str)]) -> GatewayFleetClient {
        let config = HardwareConfig {
            timeout_secs: 5,
            gateways: gateways
                .iter()
                .map(|(id, url)| GatewayEndpointConfig {
                    id: *id,
                    base_url: url.to_string(),
                    username: None,
                    password: None,
                })
                .collect(),
        };
        GatewayFleetClient::from_config(&config).unwrap()
    }

    #[test]
    fn empty_fleet_is_configuration_error() {
        let err = GatewayFleetClient::from_config(&HardwareConfig::default()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn gateway_ids_are_ascending() {
        let client = fleet(&[(7, "http://gw7"), (3, "http://gw3")]);
        assert_eq!(client.gateway_ids().await.unwrap(), vec![3, 7]);
    }

    #[tokio::test]
    async fn port_info_converts_dot_notation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ports"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ports": [
                    {"port": "06.01", "iccid": "8901", "imei": "356938035643809"},
                    {"port": "02.02", "iccid": "", "imei": null},
                    {"port": "garbage", "iccid": "8909"}
                ]
            })))
            .mount(&server)
            .await;

        let client = fleet(&[(3, &server.uri())]);
        let ports = client.port_info(3).await.unwrap();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].port.to_string(), "6A");
        assert_eq!(ports[0].iccid.as_deref(), Some("8901"));
        assert_eq!(ports[1].port.to_string(), "2B");
        assert_eq!(ports[1].iccid, None);
        assert!(ports.iter().all(|p| p.gateway_id == 3));
    }

    #[tokio::test]
    async fn set_imei_sends_hardware_port_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ports/imei"))
            .and(body_json(serde_json::json!({"port": "02.02", "imei": "356938035643809"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = fleet(&[(3, &server.uri())]);
        let port: Port = "2B".parse().unwrap();
        client.set_imei(3, port, "356938035643809").await.unwrap();
    }

    #[tokio::test]
    async fn basic_auth_is_sent_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ports"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ports": []})))
            .expect(1)
            .mount(&server)
            .await;

        let config = HardwareConfig {
            timeout_secs: 5,
            gateways: vec![GatewayEndpointConfig {
                id: 1,
                base_url: server.uri(),
                username: Some("admin".into()),
                password: Some("pw".into()),
            }],
        };
        let client = GatewayFleetClient::from_config(&config).unwrap();
        assert!(client.port_info(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failures_are_gateway_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ports/imei"))
            .respond_with(ResponseTemplate::new(502).set_body_string("port busy"))
            .mount(&server)
            .await;

        let client = fleet(&[(3, &server.uri())]);
        let err = client
            .set_imei(3, "1A".parse().unwrap(), "356938035643809")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("port busy"));
        assert!(matches!(
            client.port_info(99).await.unwrap_err(),
            SimgateError::NotFound { entity: "gateway", .. }
        ));
    }
}
