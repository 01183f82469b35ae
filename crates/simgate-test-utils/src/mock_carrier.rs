// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock carrier for deterministic orchestrator tests.
//!
//! Every call is appended to a log. Failures are queued per operation and
//! consumed one call at a time; with nothing queued each call succeeds with a
//! predictable default.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use simgate_core::types::{
    BulkActivationItem, BulkActivationResponse, BulkSuccess, ChangeStateResponse, LineState,
    SubscriberDetails,
};
use simgate_core::{CarrierApi, RunContext, SimgateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarrierOp {
    Token,
    Activate,
    BulkActivate,
    SubscriberDetails,
    Disconnect,
    ChangeState,
}

/// One recorded call and its arguments in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct CarrierCall {
    pub op: CarrierOp,
    pub args: Vec<String>,
    pub run_id: String,
}

#[derive(Default)]
pub struct MockCarrier {
    failures: Mutex<HashMap<CarrierOp, VecDeque<SimgateError>>>,
    subscription_ids: Mutex<VecDeque<String>>,
    bulk_response: Mutex<Option<BulkActivationResponse>>,
    phone_numbers: Mutex<HashMap<String, String>>,
    rejected: Mutex<Vec<String>>,
    calls: Mutex<Vec<CarrierCall>>,
}

impl MockCarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with `error`.
    pub async fn fail_next(&self, op: CarrierOp, error: SimgateError) {
        self.failures.lock().await.entry(op).or_default().push_back(error);
    }

    /// Subscription id returned by the next `activate`. Defaults to `sub-<iccid>`.
    pub async fn queue_subscription_id(&self, id: impl Into<String>) {
        self.subscription_ids.lock().await.push_back(id.into());
    }

    /// Response returned by the next `bulk_activate`. Defaults to every item succeeding.
    pub async fn set_bulk_response(&self, response: BulkActivationResponse) {
        *self.bulk_response.lock().await = Some(response);
    }

    /// Phone number reported for a subscription by `subscriber_details`.
    pub async fn set_phone_number(&self, subscription_id: impl Into<String>, e164: impl Into<String>) {
        self.phone_numbers
            .lock()
            .await
            .insert(subscription_id.into(), e164.into());
    }

    /// Numbers the carrier refuses in `change_state`.
    pub async fn reject_state_changes(&self, mdns: &[&str]) {
        *self.rejected.lock().await = mdns.iter().map(|m| m.to_string()).collect();
    }

    pub async fn calls(&self) -> Vec<CarrierCall> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_for(&self, op: CarrierOp) -> Vec<CarrierCall> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.op == op)
            .cloned()
            .collect()
    }

    async fn enter(&self, ctx: &RunContext, op: CarrierOp, args: Vec<String>) -> Result<(), SimgateError> {
        self.calls.lock().await.push(CarrierCall {
            op,
            args,
            run_id: ctx.run_id.to_string(),
        });
        match self.failures.lock().await.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CarrierApi for MockCarrier {
    async fn token(&self, ctx: &RunContext) -> Result<String, SimgateError> {
        self.enter(ctx, CarrierOp::Token, Vec::new()).await?;
        Ok("mock-token".to_string())
    }

    async fn activate(&self, ctx: &RunContext, iccid: &str, imei: &str) -> Result<String, SimgateError> {
        self.enter(ctx, CarrierOp::Activate, vec![iccid.to_string(), imei.to_string()])
            .await?;
        Ok(self
            .subscription_ids
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| format!("sub-{iccid}")))
    }

    async fn bulk_activate(
        &self,
        ctx: &RunContext,
        items: &[BulkActivationItem],
    ) -> Result<BulkActivationResponse, SimgateError> {
        let iccids = items.iter().map(|i| i.iccid.clone()).collect();
        self.enter(ctx, CarrierOp::BulkActivate, iccids).await?;
        if let Some(response) = self.bulk_response.lock().await.take() {
            return Ok(response);
        }
        Ok(BulkActivationResponse {
            successful: items
                .iter()
                .map(|i| BulkSuccess {
                    iccid: Some(i.iccid.clone()),
                    subscription_id: Some(format!("sub-{}", i.iccid)),
                })
                .collect(),
            failed: Vec::new(),
        })
    }

    async fn subscriber_details(
        &self,
        ctx: &RunContext,
        subscription_id: &str,
    ) -> Result<SubscriberDetails, SimgateError> {
        self.enter(ctx, CarrierOp::SubscriberDetails, vec![subscription_id.to_string()])
            .await?;
        Ok(SubscriberDetails {
            phone_number: self.phone_numbers.lock().await.get(subscription_id).cloned(),
        })
    }

    async fn disconnect(&self, ctx: &RunContext, subscription_id: &str) -> Result<(), SimgateError> {
        self.enter(ctx, CarrierOp::Disconnect, vec![subscription_id.to_string()])
            .await
    }

    async fn change_state(
        &self,
        ctx: &RunContext,
        mdn: &str,
        state: LineState,
    ) -> Result<ChangeStateResponse, SimgateError> {
        self.enter(ctx, CarrierOp::ChangeState, vec![mdn.to_string(), state.to_string()])
            .await?;
        let rejected = self.rejected.lock().await;
        Ok(ChangeStateResponse {
            rejected: rejected.iter().filter(|m| m.as_str() == mdn).cloned().collect(),
        })
    }
}
