// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Carrier subscription/activation API.

use async_trait::async_trait;

use crate::error::SimgateError;
use crate::types::{
    BulkActivationItem, BulkActivationResponse, ChangeStateResponse, LineState, RunContext,
    SubscriberDetails,
};

/// The carrier calls the lifecycle engine depends on.
///
/// Implementations classify failures into [`crate::error::ExternalErrorKind`]
/// so callers never inspect response wording.
#[async_trait]
pub trait CarrierApi: Send + Sync + 'static {
    /// Returns a bearer token, cached and refreshed on expiry or 401.
    async fn token(&self, ctx: &RunContext) -> Result<String, SimgateError>;

    /// Activates one SIM with the given IMEI, returning the subscription id.
    async fn activate(
        &self,
        ctx: &RunContext,
        iccid: &str,
        imei: &str,
    ) -> Result<String, SimgateError>;

    /// Submits many activations in a single call.
    async fn bulk_activate(
        &self,
        ctx: &RunContext,
        items: &[BulkActivationItem],
    ) -> Result<BulkActivationResponse, SimgateError>;

    /// Looks up a subscription; the phone number appears once provisioned.
    async fn subscriber_details(
        &self,
        ctx: &RunContext,
        subscription_id: &str,
    ) -> Result<SubscriberDetails, SimgateError>;

    /// Terminates a subscription.
    async fn disconnect(&self, ctx: &RunContext, subscription_id: &str)
        -> Result<(), SimgateError>;

    /// Suspends or restores the line identified by its phone number.
    async fn change_state(
        &self,
        ctx: &RunContext,
        mdn: &str,
        state: LineState,
    ) -> Result<ChangeStateResponse, SimgateError>;
}
