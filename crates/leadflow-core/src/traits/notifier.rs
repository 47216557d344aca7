// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound sink for the "lead became qualified" signal.

use async_trait::async_trait;

use crate::error::LeadflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Lead;

/// Receives leads that crossed into the sales-qualified tier.
///
/// Delivery (email, chat webhook) is the implementor's concern. The engine
/// treats failures as non-fatal: the score change that triggered the signal
/// is already committed.
#[async_trait]
pub trait LeadNotifier: PluginAdapter {
    async fn lead_qualified(&self, lead: &Lead) -> Result<(), LeadflowError>;
}
