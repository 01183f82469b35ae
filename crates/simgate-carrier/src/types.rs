// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the carrier API that do not leak past this crate.

use serde::{Deserialize, Serialize};
use simgate_core::types::{BulkActivationItem, LineState};

#[derive(Debug, Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Serialize)]
pub(crate) struct ActivationRequest<'a> {
    pub iccid: &'a str,
    pub imei: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActivationResponse {
    #[serde(default)]
    pub subscription_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkActivationRequest<'a> {
    pub items: &'a [BulkActivationItem],
}

#[derive(Debug, Serialize)]
pub(crate) struct ChangeStateRequest<'a> {
    pub mdn: &'a str,
    pub state: LineState,
}

/// Error envelope the carrier returns on most failures.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
