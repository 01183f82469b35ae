// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the lifecycle engine and its collaborators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

use crate::error::SimgateError;

/// Lifecycle status of a SIM.
///
/// `canceled` is the only spelling ever written. `cancelled` is accepted on
/// input so rows or payloads from older collaborators still parse.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SimStatus {
    Pending,
    Provisioning,
    Active,
    Suspended,
    Error,
    #[serde(alias = "cancelled")]
    #[strum(to_string = "canceled", serialize = "cancelled")]
    Canceled,
}

impl SimStatus {
    /// Statuses whose SIM is assumed to be physically seated in a port.
    pub const OCCUPYING: [SimStatus; 2] = [SimStatus::Active, SimStatus::Provisioning];

    /// Statuses from which a SIM may be canceled.
    pub const CANCELABLE: [SimStatus; 4] = [
        SimStatus::Active,
        SimStatus::Suspended,
        SimStatus::Provisioning,
        SimStatus::Error,
    ];

    /// Terminal statuses never leave.
    pub fn is_terminal(self) -> bool {
        self == SimStatus::Canceled
    }
}

/// Status of an IMEI identity in the pool.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IdentityStatus {
    Available,
    Allocated,
    Retired,
}

/// A physical gateway slot in canonical letter-coded form, e.g. `6A`.
///
/// Hardware reports ports in dot notation (`06.01` = port 6, slot 1). That
/// form is converted with [`Port::from_hardware`] at the hardware boundary and
/// produced again with [`Port::to_hardware`]; nothing else ever sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port {
    number: u16,
    slot: u8,
}

impl Port {
    /// Highest slot index representable as a single letter (`Z`).
    pub const MAX_SLOT: u8 = 26;

    /// Build a port from its numeric parts.
    pub fn new(number: u16, slot: u8) -> Result<Self, SimgateError> {
        if number == 0 {
            return Err(SimgateError::Validation("port number must be >= 1".into()));
        }
        if slot == 0 || slot > Self::MAX_SLOT {
            return Err(SimgateError::Validation(format!(
                "slot {slot} out of range 1..={}",
                Self::MAX_SLOT
            )));
        }
        Ok(Self { number, slot })
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn slot(&self) -> u8 {
        self.slot
    }

    /// Parse the hardware's native dot notation (`06.01`, `6.1`).
    pub fn from_hardware(raw: &str) -> Result<Self, SimgateError> {
        let raw = raw.trim();
        let (number, slot) = raw.split_once('.').ok_or_else(|| {
            SimgateError::Validation(format!("hardware port `{raw}` is not in NN.SS form"))
        })?;
        let number = parse_digits::<u16>(number, raw)?;
        let slot = parse_digits::<u8>(slot, raw)?;
        Self::new(number, slot)
    }

    /// Render the hardware's native dot notation (`06.01`).
    pub fn to_hardware(&self) -> String {
        format!("{:02}.{:02}", self.number, self.slot)
    }

    fn slot_letter(&self) -> char {
        // 64 + 1 = 'A'
        char::from(64 + self.slot)
    }
}

fn parse_digits<T: FromStr>(part: &str, raw: &str) -> Result<T, SimgateError> {
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return Err(SimgateError::Validation(format!(
            "hardware port `{raw}` has a non-numeric component"
        )));
    }
    part.parse::<T>()
        .map_err(|_| SimgateError::Validation(format!("hardware port `{raw}` is out of range")))
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.slot_letter())
    }
}

impl FromStr for Port {
    type Err = SimgateError;

    /// Parse the canonical letter form (`6A`, `12C`). Dot notation is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || SimgateError::Validation(format!("`{s}` is not a canonical port like 6A"));

        let letter = s.chars().last().ok_or_else(invalid)?;
        if !letter.is_ascii_uppercase() {
            return Err(invalid());
        }
        let digits = &s[..s.len() - 1];
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let number = digits.parse::<u16>().map_err(|_| invalid())?;
        Self::new(number, letter as u8 - 64)
    }
}

impl Serialize for Port {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Port {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A SIM record as held by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sim {
    pub id: i64,
    pub iccid: String,
    pub status: SimStatus,
    /// Last-known seating. A cache; hardware is authoritative.
    pub gateway_id: Option<i64>,
    pub port: Option<Port>,
    pub imei: Option<String>,
    pub current_imei_pool_id: Option<i64>,
    pub mobility_subscription_id: Option<String>,
    pub last_activation_error: Option<String>,
    pub status_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Field-level patch applied to a SIM row.
///
/// `None` leaves a column untouched. Nullable columns use `Option<Option<_>>`
/// so a patch can clear them explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimPatch {
    pub status: Option<SimStatus>,
    pub gateway_id: Option<i64>,
    pub port: Option<Port>,
    pub imei: Option<String>,
    pub current_imei_pool_id: Option<Option<i64>>,
    pub mobility_subscription_id: Option<String>,
    pub last_activation_error: Option<Option<String>>,
    pub status_reason: Option<Option<String>>,
}

impl SimPatch {
    pub fn status(mut self, status: SimStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn slot(mut self, gateway_id: i64, port: Port) -> Self {
        self.gateway_id = Some(gateway_id);
        self.port = Some(port);
        self
    }

    pub fn imei(mut self, imei: impl Into<String>) -> Self {
        self.imei = Some(imei.into());
        self
    }

    pub fn identity(mut self, pool_id: Option<i64>) -> Self {
        self.current_imei_pool_id = Some(pool_id);
        self
    }

    pub fn subscription(mut self, subscription_id: impl Into<String>) -> Self {
        self.mobility_subscription_id = Some(subscription_id.into());
        self
    }

    pub fn activation_error(mut self, error: Option<String>) -> Self {
        self.last_activation_error = Some(error);
        self
    }

    pub fn reason(mut self, reason: Option<String>) -> Self {
        self.status_reason = Some(reason);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One IMEI identity in the rotation pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityPoolEntry {
    pub id: i64,
    pub imei: String,
    pub sim_id: Option<i64>,
    pub status: IdentityStatus,
    pub updated_at: String,
}

/// A phone number held by a SIM over a validity window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneNumberAssignment {
    pub id: i64,
    pub sim_id: i64,
    pub e164: String,
    pub valid_from: String,
    pub valid_to: Option<String>,
}

/// A downstream customer receiving lifecycle webhooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reseller {
    pub id: i64,
    pub name: String,
    pub webhook_url: Option<String>,
}

/// Link between a reseller and a SIM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResellerAssignment {
    pub id: i64,
    pub reseller_id: i64,
    pub sim_id: i64,
    pub active: bool,
    pub created_at: String,
}

/// One port as reported live by gateway hardware. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPortSnapshot {
    pub gateway_id: i64,
    pub port: Port,
    pub iccid: Option<String>,
    pub imei: Option<String>,
}

/// Where the locator found a SIM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotLocation {
    pub gateway_id: i64,
    pub port: Port,
    pub current_imei: Option<String>,
}

/// Per-run correlation context threaded through every external call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: uuid::Uuid,
    pub job: String,
}

impl RunContext {
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            job: job.into(),
        }
    }
}

// --- Carrier payload types ---

/// One item submitted to the carrier's bulk activation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkActivationItem {
    pub iccid: String,
    pub imei: String,
}

/// A successful entry in a bulk activation response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BulkSuccess {
    #[serde(default)]
    pub iccid: Option<String>,
    #[serde(default)]
    pub subscription_id: Option<String>,
}

/// A failed entry in a bulk activation response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BulkFailure {
    #[serde(default)]
    pub iccid: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Carrier response to a bulk activation call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BulkActivationResponse {
    #[serde(default)]
    pub successful: Vec<BulkSuccess>,
    #[serde(default)]
    pub failed: Vec<BulkFailure>,
}

/// Subscriber details; the number appears only once provisioning finishes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubscriberDetails {
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Target line state for the carrier's state-change call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum LineState {
    Suspend,
    Restore,
}

/// Carrier response to a state-change call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChangeStateResponse {
    #[serde(default)]
    pub rejected: Vec<String>,
}

// --- Records written by sinks ---

/// A webhook delivery row, unique by `message_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub message_id: String,
    pub reseller_id: i64,
    pub sim_id: i64,
    pub event_type: String,
    pub url: String,
    pub payload: String,
}

/// One carrier call recorded in the append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierAuditEntry {
    pub run_id: String,
    pub operation: String,
    pub request_ref: Option<String>,
    pub status_code: Option<u16>,
    pub body: String,
}
