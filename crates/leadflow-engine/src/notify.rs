// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default qualified-lead sink.

use async_trait::async_trait;
use leadflow_core::{AdapterType, HealthStatus, Lead, LeadNotifier, LeadflowError, PluginAdapter};
use tracing::info;

/// Writes qualified leads to the log.
///
/// Email and chat-webhook delivery plug in as other [`LeadNotifier`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl PluginAdapter for TracingNotifier {
    fn name(&self) -> &str {
        "tracing"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        Ok(())
    }
}

#[async_trait]
impl LeadNotifier for TracingNotifier {
    async fn lead_qualified(&self, lead: &Lead) -> Result<(), LeadflowError> {
        info!(
            session_id = %lead.session_id,
            score = lead.score,
            name = lead.profile.name.as_deref().unwrap_or("Anonymous"),
            business_type = lead.profile.business_type.as_deref().unwrap_or("Not specified"),
            contact = lead.profile.contact_info().unwrap_or("Not provided"),
            "hot lead: sales qualified"
        );
        Ok(())
    }
}
