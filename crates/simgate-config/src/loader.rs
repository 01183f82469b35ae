// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./simgate.toml` > `~/.config/simgate/simgate.toml` > `/etc/simgate/simgate.toml`
//! with environment variable overrides via `SIMGATE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SimgateConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/simgate/simgate.toml` (system-wide)
/// 3. `~/.config/simgate/simgate.toml` (user XDG config)
/// 4. `./simgate.toml` (local directory)
/// 5. `SIMGATE_*` environment variables
pub fn load_config() -> Result<SimgateConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<SimgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SimgateConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SimgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SimgateConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SimgateConfig::default()))
        .merge(Toml::file("/etc/simgate/simgate.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("simgate/simgate.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("simgate.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")`: `SIMGATE_CARRIER_CLIENT_SECRET`
/// must map to `carrier.client_secret`, not `carrier.client.secret`.
fn env_provider() -> Env {
    Env::prefixed("SIMGATE_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to its dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 8] = [
        "logging",
        "storage",
        "carrier",
        "hardware",
        "orchestration",
        "admin",
        "webhook",
        "schedule",
    ];
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_first_underscore_only() {
        assert_eq!(map_env_key("carrier_client_secret"), "carrier.client_secret");
        assert_eq!(
            map_env_key("orchestration_carrier_call_delay_ms"),
            "orchestration.carrier_call_delay_ms"
        );
        assert_eq!(map_env_key("admin_shared_secret"), "admin.shared_secret");
        assert_eq!(map_env_key("unknown_key"), "unknown_key");
    }
}
