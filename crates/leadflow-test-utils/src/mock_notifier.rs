// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock qualified-lead notifier for deterministic testing.
//!
//! `MockNotifier` implements `LeadNotifier` and captures every delivered lead
//! for assertion. It can be switched to fail every delivery.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use leadflow_core::{AdapterType, HealthStatus, Lead, LeadNotifier, LeadflowError, PluginAdapter};

#[derive(Default)]
pub struct MockNotifier {
    delivered: Mutex<Vec<Lead>>,
    failing: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose deliveries always fail.
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every lead delivered so far, in order.
    pub async fn delivered(&self) -> Vec<Lead> {
        self.delivered.lock().await.clone()
    }

    pub async fn delivered_count(&self) -> usize {
        self.delivered.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for MockNotifier {
    fn name(&self) -> &str {
        "mock"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        if self.failing.load(Ordering::SeqCst) {
            Ok(HealthStatus::Degraded("deliveries set to fail".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        Ok(())
    }
}

#[async_trait]
impl LeadNotifier for MockNotifier {
    async fn lead_qualified(&self, lead: &Lead) -> Result<(), LeadflowError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LeadflowError::Notification {
                message: format!("mock delivery failed for {}", lead.session_id),
                source: None,
            });
        }
        tracing::debug!(session_id = %lead.session_id, "mock notifier captured lead");
        self.delivered.lock().await.push(lead.clone());
        Ok(())
    }
}
