// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, batch bounds, and a well-formed gateway fleet.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::SimgateConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
///
/// Missing carrier credentials are not a validation error here: they are
/// reported as a configuration failure when a run needs the carrier.
pub fn validate_config(config: &SimgateConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    let orch = &config.orchestration;
    if orch.default_batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "orchestration.default_batch_size must be at least 1".to_string(),
        });
    }
    if orch.max_batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "orchestration.max_batch_size must be at least 1".to_string(),
        });
    }
    if orch.default_batch_size > orch.max_batch_size {
        errors.push(ConfigError::Validation {
            message: format!(
                "orchestration.default_batch_size ({}) exceeds max_batch_size ({})",
                orch.default_batch_size, orch.max_batch_size
            ),
        });
    }

    if config.admin.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "admin.host must not be empty".to_string(),
        });
    } else {
        let host = config.admin.host.trim();
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("admin.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    let mut seen_ids = HashSet::new();
    for (i, gateway) in config.hardware.gateways.iter().enumerate() {
        if !seen_ids.insert(gateway.id) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate gateway id {} in [[hardware.gateways]]", gateway.id),
            });
        }
        if gateway.base_url.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("hardware.gateways[{i}].base_url must not be empty"),
            });
        }
    }

    if config.schedule.enabled
        && (config.schedule.retry_activation_interval_secs == 0
            || config.schedule.provisioning_sync_interval_secs == 0)
    {
        errors.push(ConfigError::Validation {
            message: "schedule intervals must be at least 1 second".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GatewayEndpointConfig;

    fn gateway(id: i64, url: &str) -> GatewayEndpointConfig {
        GatewayEndpointConfig {
            id,
            base_url: url.to_string(),
            username: None,
            password: None,
        }
    }

    #[test]
    fn default_config_validates() {
        let config = SimgateConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = SimgateConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn default_batch_above_max_fails() {
        let mut config = SimgateConfig::default();
        config.orchestration.default_batch_size = 200;
        config.orchestration.max_batch_size = 50;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("exceeds"))));
    }

    #[test]
    fn duplicate_gateway_ids_fail() {
        let mut config = SimgateConfig::default();
        config.hardware.gateways = vec![gateway(3, "http://gw3"), gateway(3, "http://gw3b")];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("duplicate gateway id 3"))
        ));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = SimgateConfig::default();
        config.storage.database_path = " ".to_string();
        config.hardware.gateways = vec![gateway(1, "")];
        config.admin.host = "bad host!".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn enabled_schedule_needs_nonzero_intervals() {
        let mut config = SimgateConfig::default();
        config.schedule.enabled = true;
        config.schedule.provisioning_sync_interval_secs = 0;
        assert!(validate_config(&config).is_err());
    }
}
