// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Administrative trigger surface.
//!
//! One HTTP route per orchestrator, guarded by a shared secret. Every batch
//! route answers with the run's `BatchSummary`.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AdminAuth;
pub use error::ApiError;
pub use server::{AdminState, router, serve};
