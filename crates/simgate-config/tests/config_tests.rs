// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the simgate configuration system.

use simgate_config::diagnostic::ConfigError;
use simgate_config::model::SimgateConfig;
use simgate_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with every section deserializes successfully.
#[test]
fn valid_toml_deserializes_into_simgate_config() {
    let toml = r#"
[logging]
level = "debug"
json = true

[storage]
database_path = "/tmp/simgate-test.db"
wal_mode = false

[carrier]
base_url = "https://carrier.example"
client_id = "client"
client_secret = "secret"
timeout_secs = 5

[hardware]
timeout_secs = 3

[[hardware.gateways]]
id = 1
base_url = "http://10.0.0.1"

[[hardware.gateways]]
id = 2
base_url = "http://10.0.0.2"
username = "admin"
password = "pw"

[orchestration]
default_batch_size = 5
max_batch_size = 20
carrier_call_delay_ms = 0

[admin]
host = "0.0.0.0"
port = 9000
shared_secret = "s3cret"

[webhook]
signing_secret = "hook-key"

[schedule]
enabled = true
retry_activation_interval_secs = 60
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
    assert_eq!(config.storage.database_path, "/tmp/simgate-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.carrier.client_id.as_deref(), Some("client"));
    assert_eq!(config.carrier.timeout_secs, 5);
    assert_eq!(config.hardware.gateways.len(), 2);
    assert_eq!(config.hardware.gateways[1].username.as_deref(), Some("admin"));
    assert_eq!(config.orchestration.max_batch_size, 20);
    assert_eq!(config.admin.port, 9000);
    assert_eq!(config.webhook.signing_secret.as_deref(), Some("hook-key"));
    assert!(config.schedule.enabled);
    assert_eq!(config.schedule.retry_activation_interval_secs, 60);
    assert_eq!(config.schedule.provisioning_sync_interval_secs, 300);
}

/// Missing sections use defaults without error.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.logging.level, "info");
    assert!(config.storage.wal_mode);
    assert!(config.storage.database_path.ends_with("simgate.db"));
    assert!(config.carrier.base_url.is_none());
    assert!(config.hardware.gateways.is_empty());
    assert_eq!(config.orchestration.default_batch_size, 10);
    assert_eq!(config.orchestration.carrier_call_delay_ms, 1500);
    assert_eq!(config.admin.host, "127.0.0.1");
    assert!(config.admin.shared_secret.is_none());
    assert!(!config.schedule.enabled);
}

/// Missing carrier credentials load fine and surface only when resolved.
#[test]
fn missing_credentials_are_a_runtime_configuration_error() {
    let config = load_and_validate_str("").expect("defaults should validate");
    let err = config.carrier.credentials().unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.kind_label(), "configuration");
}

/// Dotted overrides (as produced by the SIMGATE_ env mapping) land on the right key.
#[test]
fn override_maps_to_underscored_key() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let toml_content = r#"
[carrier]
client_secret = "from-toml"
"#;

    let config: SimgateConfig = Figment::new()
        .merge(Serialized::defaults(SimgateConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("carrier.client_secret", "from-env"))
        .merge(("orchestration.carrier_call_delay_ms", 250))
        .extract()
        .expect("should merge override");

    assert_eq!(config.carrier.client_secret.as_deref(), Some("from-env"));
    assert_eq!(config.orchestration.carrier_call_delay_ms, 250);
}

/// Missing config files are silently skipped.
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: SimgateConfig = Figment::new()
        .merge(Serialized::defaults(SimgateConfig::default()))
        .merge(Toml::file("/nonexistent/path/simgate.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.logging.level, "info");
}

/// Unknown top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[telemetry]
enabled = true
"#;

    let err = load_config_from_str(toml).expect_err("unknown section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("telemetry"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Typo in [carrier] produces an UnknownKey diagnostic with a suggestion.
#[test]
fn diagnostic_suggests_carrier_key() {
    let toml = r#"
[carrier]
client_sceret = "x"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "client_sceret"
                && suggestion.as_deref() == Some("client_secret")
                && valid_keys.contains("base_url")
        })
    });
    assert!(has_unknown_key, "got: {errors:?}");
}

/// Wrong value type is reported.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[orchestration]
max_batch_size = "lots"
"#;

    let err = load_config_from_str(toml).expect_err("should reject invalid type");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("invalid type") || err_str.contains("max_batch_size"),
        "got: {err_str}"
    );
}

/// A gateway without its required id is reported as a missing key.
#[test]
fn gateway_requires_id() {
    let toml = r#"
[[hardware.gateways]]
base_url = "http://gw"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject gateway without id");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::MissingKey { key } if key.ends_with("id"))),
        "got: {errors:?}"
    );
}

/// Validation errors flow through load_and_validate_str.
#[test]
fn validation_runs_after_parse() {
    let toml = r#"
[orchestration]
default_batch_size = 50
max_batch_size = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { .. })));
}

/// ConfigError renders with miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "client_sceret".to_string(),
        suggestion: Some("client_secret".to_string()),
        valid_keys: "base_url, client_id, client_secret".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().expect("help text").to_string();
    assert!(help.contains("did you mean `client_secret`"));

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("client_sceret"));
}
