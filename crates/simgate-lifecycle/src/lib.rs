// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle orchestration engine for simgate.
//!
//! Drives SIMs through `pending -> provisioning -> active <-> suspended`,
//! with `error` as the retry state and `canceled` as the terminal one.
//! Every orchestrator is built from one immutable [`Services`] bundle and
//! processes its batch sequentially through the shared [`runner::BatchRunner`].
//!
//! # Components
//!
//! - [`IdentityPool`] - IMEI allocation, release, and retirement
//! - [`GatewayLocator`] - live fleet scan for a seated ICCID
//! - [`ActivationOrchestrator`] - single-SIM retry with compensation
//! - [`BulkActivationOrchestrator`] - one carrier call, reconciled per item
//! - [`StatusChangeOrchestrator`] - suspend and restore
//! - [`CancellationOrchestrator`] - terminal cancel with cleanup
//! - [`ProvisioningSync`] - promotes SIMs once a number is assigned

pub mod activation;
pub mod bulk;
pub mod cancel;
pub mod identity_pool;
pub mod locator;
pub mod provisioning;
pub mod runner;
pub mod services;
pub mod status;
pub mod summary;
pub mod webhook;

pub use activation::{ActivationOrchestrator, ManualSlot, RetryOutcome, RetryReport};
pub use bulk::{BulkActivationOrchestrator, BulkItem};
pub use cancel::CancellationOrchestrator;
pub use identity_pool::{IdentityPool, parse_imei_list};
pub use locator::GatewayLocator;
pub use provisioning::ProvisioningSync;
pub use services::{Configured, Services};
pub use status::{StatusChange, StatusChangeOrchestrator};
pub use summary::{BatchSummary, ItemResult, Outcome};
pub use webhook::{HttpWebhookSink, WebhookDispatcher, WebhookEvent, WebhookPayload};

/// All orchestrators over one shared set of collaborators.
#[derive(Clone)]
pub struct Engine {
    pub activation: ActivationOrchestrator,
    pub bulk: BulkActivationOrchestrator,
    pub status: StatusChangeOrchestrator,
    pub cancellation: CancellationOrchestrator,
    pub provisioning: ProvisioningSync,
    pub pool: IdentityPool,
}

impl Engine {
    pub fn new(services: Services) -> Self {
        Self {
            activation: ActivationOrchestrator::new(services.clone()),
            bulk: BulkActivationOrchestrator::new(services.clone()),
            status: StatusChangeOrchestrator::new(services.clone()),
            cancellation: CancellationOrchestrator::new(services.clone()),
            provisioning: ProvisioningSync::new(services.clone()),
            pool: IdentityPool::new(services.store),
        }
    }
}
