// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table family.

pub mod audit;
pub mod identities;
pub mod phone_numbers;
pub mod resellers;
pub mod sims;
pub mod webhooks;

/// SQL expression for the current UTC timestamp in storage format.
pub(crate) const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";
