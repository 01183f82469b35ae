// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for simgate.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed queries for SIMs, the
//! IMEI identity pool, phone number history, reseller assignments, webhook
//! deliveries, and the carrier audit trail.

pub mod adapter;
pub mod database;
pub mod migrations;
mod models;
pub mod queries;

pub use adapter::SqliteSimStore;
pub use database::Database;
