// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot CLI commands.

use std::path::Path;

use simgate_config::SimgateConfig;
use simgate_core::types::IdentityStatus;
use simgate_core::{SimStore, SimgateError};
use simgate_lifecycle::{BatchSummary, Engine, IdentityPool, parse_imei_list};

use crate::Job;
use crate::wiring;

/// Run one job and print its summary.
pub async fn run_job(config: &SimgateConfig, job: Job, limit: Option<usize>) -> Result<(), SimgateError> {
    let runtime = wiring::build(config).await?;
    let engine = Engine::new(runtime.services.clone());

    let summary = match job {
        Job::RetryActivation => engine.activation.run_batch(limit).await,
        Job::SyncProvisioning => engine.provisioning.run_batch(limit).await,
    };
    let closed = runtime.shutdown().await;
    let summary = summary?;
    closed?;

    println!("{}", render_summary(&summary)?);
    Ok(())
}

fn render_summary(summary: &BatchSummary) -> Result<String, SimgateError> {
    serde_json::to_string_pretty(summary)
        .map_err(|e| SimgateError::Internal(format!("failed to encode summary: {e}")))
}

/// Append IMEIs from `file` to the pool. Needs storage only.
pub async fn pool_import(config: &SimgateConfig, file: &Path) -> Result<(), SimgateError> {
    let (added, available) = import_file(config, file).await?;
    println!("imported {added} new identities ({available} available)");
    Ok(())
}

async fn import_file(config: &SimgateConfig, file: &Path) -> Result<(usize, usize), SimgateError> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| SimgateError::Validation(format!("cannot read {}: {e}", file.display())))?;
    let imeis = parse_imei_list(&text)?;

    let store = wiring::open_store(config).await?;
    let pool = IdentityPool::new(store.clone());
    let added = pool.import(&imeis).await?;
    let available = store.count_identities(IdentityStatus::Available).await?;
    store.close().await?;
    Ok((added, available))
}

/// Print which collaborators the configuration enables.
pub fn config_check(config: &SimgateConfig) {
    for line in describe(config) {
        println!("{line}");
    }
}

fn describe(config: &SimgateConfig) -> Vec<String> {
    let carrier = match config.carrier.credentials() {
        Ok(creds) => format!("carrier: configured ({})", creds.base_url),
        Err(e) => format!("carrier: missing ({e})"),
    };
    let hardware = match config.hardware.gateways.len() {
        0 => "hardware: no gateways configured".to_string(),
        n => format!("hardware: {n} gateway(s)"),
    };
    let admin = match config.admin.shared_secret.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => format!("admin: {}:{} (secret set)", config.admin.host, config.admin.port),
        _ => format!(
            "admin: {}:{} (no secret, /v1 routes will refuse every request)",
            config.admin.host, config.admin.port
        ),
    };
    let schedule = if config.schedule.enabled {
        format!(
            "schedule: retry-activation every {}s, sync-provisioning every {}s",
            config.schedule.retry_activation_interval_secs, config.schedule.provisioning_sync_interval_secs
        )
    } else {
        "schedule: disabled".to_string()
    };

    vec![
        "configuration OK".to_string(),
        format!("storage: {}", config.storage.database_path),
        carrier,
        hardware,
        admin,
        schedule,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_config(dir: &tempfile::TempDir) -> SimgateConfig {
        let mut config = SimgateConfig::default();
        config.storage.database_path = dir.path().join("simgate.db").to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn import_file_counts_new_identities() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(&dir);
        let path = dir.path().join("imeis.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# spare stock\n356938035643809\n356938035643817").unwrap();

        assert_eq!(import_file(&config, &path).await.unwrap(), (2, 2));
        // Re-importing the same file adds nothing.
        assert_eq!(import_file(&config, &path).await.unwrap(), (0, 2));
    }

    #[tokio::test]
    async fn unreadable_import_file_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = import_file(&temp_config(&dir), &dir.path().join("absent.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, SimgateError::Validation(_)));
    }

    #[tokio::test]
    async fn run_job_without_carrier_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_job(&temp_config(&dir), Job::SyncProvisioning, Some(5))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn describe_reports_missing_collaborators() {
        let lines = describe(&SimgateConfig::default());
        assert!(lines.iter().any(|l| l.starts_with("carrier: missing")));
        assert!(lines.iter().any(|l| l == "hardware: no gateways configured"));
        assert!(lines.iter().any(|l| l.contains("no secret")));
        assert!(lines.iter().any(|l| l == "schedule: disabled"));
    }
}
