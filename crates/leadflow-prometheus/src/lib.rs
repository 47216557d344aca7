// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for Leadflow.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Metrics are
//! rendered as Prometheus text format via [`PrometheusAdapter::render`],
//! which the gateway exposes at `/metrics`.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use leadflow_core::{AdapterType, HealthStatus, LeadflowError, PluginAdapter};

pub use recording::{ProcessGauges, record_process};

/// Prometheus metrics adapter.
///
/// Holds the handle used to render whatever the installed recorder collected.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Install the Prometheus recorder globally and describe every metric.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn new() -> Result<Self, LeadflowError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            LeadflowError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        describe_all();
        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Build an adapter around a recorder that is not installed globally.
    ///
    /// Returns the recorder so the caller can scope it with
    /// `metrics::with_local_recorder`.
    pub fn detached() -> (Self, PrometheusRecorder) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        (Self { handle }, recorder)
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

fn describe_all() {
    leadflow_engine::recording::register_metrics();
    recording::register_metrics();
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        Ok(())
    }
}
