// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use simgate_config::model::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `simgate=<level>,warn`.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("simgate={level},warn")))
}

/// Initializes the global tracing subscriber.
pub fn init_tracing(config: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.level))
        .with_target(true)
        .with_thread_names(false);

    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
