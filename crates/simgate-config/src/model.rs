// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for simgate.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use simgate_core::SimgateError;

/// Top-level simgate configuration.
///
/// Built once at process start and shared immutably with every component.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SimgateConfig {
    /// Log level and format.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Carrier activation API settings.
    #[serde(default)]
    pub carrier: CarrierConfig,

    /// Gateway fleet settings.
    #[serde(default)]
    pub hardware: HardwareConfig,

    /// Batch sizing and pacing.
    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// Administrative trigger endpoint.
    #[serde(default)]
    pub admin: AdminConfig,

    /// Reseller webhook delivery.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Periodic job scheduling.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("simgate").join("simgate.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("simgate.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Carrier activation API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CarrierConfig {
    /// Base URL of the carrier API.
    #[serde(default)]
    pub base_url: Option<String>,

    /// OAuth client id for the token exchange.
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth client secret for the token exchange.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,

    /// Refresh the cached token this many seconds before it expires.
    #[serde(default = "default_token_refresh_margin_secs")]
    pub token_refresh_margin_secs: u64,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            client_id: None,
            client_secret: None,
            timeout_secs: default_http_timeout_secs(),
            token_refresh_margin_secs: default_token_refresh_margin_secs(),
        }
    }
}

/// Resolved carrier credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierCredentials<'a> {
    pub base_url: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

impl CarrierConfig {
    /// Resolve the settings a carrier client cannot run without.
    pub fn credentials(&self) -> Result<CarrierCredentials<'_>, SimgateError> {
        fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str, SimgateError> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| SimgateError::Configuration(format!("{key} is not set")))
        }

        Ok(CarrierCredentials {
            base_url: required(&self.base_url, "carrier.base_url")?,
            client_id: required(&self.client_id, "carrier.client_id")?,
            client_secret: required(&self.client_secret, "carrier.client_secret")?,
        })
    }
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_token_refresh_margin_secs() -> u64 {
    60
}

/// Gateway fleet configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HardwareConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_hardware_timeout_secs")]
    pub timeout_secs: u64,

    /// The gateways making up the fleet.
    #[serde(default)]
    pub gateways: Vec<GatewayEndpointConfig>,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_hardware_timeout_secs(),
            gateways: Vec::new(),
        }
    }
}

fn default_hardware_timeout_secs() -> u64 {
    15
}

/// One gateway device.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayEndpointConfig {
    /// Fleet-unique gateway id.
    pub id: i64,

    /// Base URL of the device's HTTP API.
    pub base_url: String,

    /// Basic-auth username, if the device requires it.
    #[serde(default)]
    pub username: Option<String>,

    /// Basic-auth password, if the device requires it.
    #[serde(default)]
    pub password: Option<String>,
}

/// Batch sizing and carrier pacing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestrationConfig {
    /// Items pulled per run when no limit is given.
    #[serde(default = "default_batch_size")]
    pub default_batch_size: usize,

    /// Upper bound for caller-supplied limits.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Fixed delay between carrier calls within a batch, in milliseconds.
    #[serde(default = "default_carrier_call_delay_ms")]
    pub carrier_call_delay_ms: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            default_batch_size: default_batch_size(),
            max_batch_size: default_max_batch_size(),
            carrier_call_delay_ms: default_carrier_call_delay_ms(),
        }
    }
}

impl OrchestrationConfig {
    /// Clamp a caller-supplied limit into `1..=max_batch_size`.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_batch_size)
            .clamp(1, self.max_batch_size.max(1))
    }

    pub fn carrier_call_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.carrier_call_delay_ms)
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_max_batch_size() -> usize {
    100
}

fn default_carrier_call_delay_ms() -> u64 {
    1500
}

/// Administrative HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    /// Host address to bind.
    #[serde(default = "default_admin_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_admin_port")]
    pub port: u16,

    /// Shared secret required on every trigger request. `None` rejects all.
    #[serde(default)]
    pub shared_secret: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: default_admin_host(),
            port: default_admin_port(),
            shared_secret: None,
        }
    }
}

fn default_admin_host() -> String {
    "127.0.0.1".to_string()
}

fn default_admin_port() -> u16 {
    8470
}

/// Webhook delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Per-delivery timeout in seconds.
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,

    /// HMAC-SHA256 key used to sign payloads. `None` sends unsigned.
    #[serde(default)]
    pub signing_secret: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_webhook_timeout_secs(),
            signing_secret: None,
        }
    }
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

/// Periodic job scheduling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Run the periodic jobs inside `simgate serve`.
    #[serde(default)]
    pub enabled: bool,

    /// Interval between retry-activation runs, in seconds.
    #[serde(default = "default_retry_activation_interval_secs")]
    pub retry_activation_interval_secs: u64,

    /// Interval between provisioning-sync runs, in seconds.
    #[serde(default = "default_provisioning_sync_interval_secs")]
    pub provisioning_sync_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            retry_activation_interval_secs: default_retry_activation_interval_secs(),
            provisioning_sync_interval_secs: default_provisioning_sync_interval_secs(),
        }
    }
}

fn default_retry_activation_interval_secs() -> u64 {
    900
}

fn default_provisioning_sync_interval_secs() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_require_all_three_values() {
        let mut carrier = CarrierConfig::default();
        let err = carrier.credentials().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("carrier.base_url"));

        carrier.base_url = Some("https://carrier.example".into());
        carrier.client_id = Some("id".into());
        carrier.client_secret = Some("  ".into());
        let err = carrier.credentials().unwrap_err();
        assert!(err.to_string().contains("carrier.client_secret"));

        carrier.client_secret = Some("secret".into());
        let creds = carrier.credentials().unwrap();
        assert_eq!(creds.client_id, "id");
    }

    #[test]
    fn effective_limit_clamps() {
        let orch = OrchestrationConfig {
            default_batch_size: 10,
            max_batch_size: 50,
            carrier_call_delay_ms: 0,
        };
        assert_eq!(orch.effective_limit(None), 10);
        assert_eq!(orch.effective_limit(Some(0)), 1);
        assert_eq!(orch.effective_limit(Some(500)), 50);
        assert_eq!(orch.effective_limit(Some(25)), 25);
    }
}
