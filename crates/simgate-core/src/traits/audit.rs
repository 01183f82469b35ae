// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only audit sink for external call results.

use async_trait::async_trait;

use crate::error::SimgateError;
use crate::types::CarrierAuditEntry;

/// Receives one record per carrier call, keyed by the run's correlation id.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    async fn record(&self, entry: &CarrierAuditEntry) -> Result<(), SimgateError>;
}
