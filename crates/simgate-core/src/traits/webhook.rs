// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reseller webhook delivery.

use async_trait::async_trait;

use crate::error::SimgateError;
use crate::types::WebhookDelivery;

/// Delivers lifecycle notifications to resellers.
///
/// Idempotent by `message_id`: delivering the same id twice must not create
/// a second delivery record.
#[async_trait]
pub trait WebhookSink: Send + Sync + 'static {
    async fn deliver(&self, delivery: &WebhookDelivery) -> Result<(), SimgateError>;
}
