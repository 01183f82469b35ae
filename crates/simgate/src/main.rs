// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! simgate - SIM lifecycle orchestration service.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod logging;
mod scheduler;
mod serve;
mod wiring;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// simgate - SIM lifecycle orchestration service.
#[derive(Parser, Debug)]
#[command(name = "simgate", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the admin server and, when enabled, the job scheduler.
    Serve,
    /// Run one batch job now and print its summary as JSON.
    Run {
        job: Job,
        /// Batch size; clamped to `orchestration.max_batch_size`.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Manage the IMEI identity pool.
    Pool {
        #[command(subcommand)]
        action: PoolCommand,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Job {
    RetryActivation,
    SyncProvisioning,
}

#[derive(Subcommand, Debug)]
enum PoolCommand {
    /// Append IMEIs from a file (one per line, `#` comments allowed).
    Import { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate configuration and report which collaborators are usable.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => simgate_config::load_and_validate_path(path),
        None => simgate_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            simgate_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    if let Commands::Config {
        action: ConfigCommand::Check,
    } = cli.command
    {
        commands::config_check(&config);
        return;
    }

    logging::init_tracing(&config.logging);

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Run { job, limit } => commands::run_job(&config, job, limit).await,
        Commands::Pool {
            action: PoolCommand::Import { file },
        } => commands::pool_import(&config, &file).await,
        Commands::Config { .. } => Ok(()),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
