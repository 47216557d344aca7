// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadflow serve` command implementation.
//!
//! Opens SQLite storage, builds the engine, installs the Prometheus recorder
//! when enabled, and serves the HTTP gateway until a shutdown signal.

use std::sync::Arc;

use leadflow_config::LeadflowConfig;
use leadflow_core::{LeadStore, LeadflowError, PluginAdapter};
use leadflow_engine::{Engine, TracingNotifier};
use leadflow_gateway::{GatewayState, MetricsRender, ServerConfig};
use leadflow_storage::SqliteStorage;
use tracing::{info, warn};

use crate::{process, shutdown};

/// Runs the `leadflow serve` command.
pub async fn run_serve(config: LeadflowConfig) -> Result<(), LeadflowError> {
    init_tracing(&config.telemetry.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        database = config.storage.database_path.as_str(),
        "starting leadflow serve"
    );

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let storage: Arc<dyn LeadStore> = Arc::new(storage);
    info!(adapter = storage.name(), "storage initialized");

    let notifier = Arc::new(TracingNotifier);
    info!(
        adapter = notifier.name(),
        enabled = config.notifications.enabled,
        "qualified-lead notifier ready"
    );
    let engine = Arc::new(Engine::new(&config, storage.clone()).with_notifier(notifier));

    let mut state = GatewayState::new(engine);
    if let Some(render) = metrics_render(&config)? {
        state = state.with_metrics(render);
    }

    let cancel = shutdown::install_signal_handler();

    let warn_mb = config.telemetry.memory_warn_mb;
    tokio::spawn(process::run(warn_mb, cancel.clone()));
    info!(warn_mb, "process sampler started");

    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    let served = leadflow_gateway::start_server(&server_config, state, cancel.clone()).await;
    // Stop background tasks even when the server failed to start.
    cancel.cancel();

    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage did not close cleanly");
    }
    served?;

    info!("leadflow serve shutdown complete");
    Ok(())
}

/// Install the Prometheus recorder and return a renderer for `/metrics`.
#[cfg(feature = "prometheus")]
fn metrics_render(config: &LeadflowConfig) -> Result<Option<MetricsRender>, LeadflowError> {
    if !config.telemetry.metrics_enabled {
        info!("metrics disabled by configuration");
        return Ok(None);
    }
    let adapter = leadflow_prometheus::PrometheusAdapter::new()?;
    let handle = adapter.handle().clone();
    Ok(Some(Arc::new(move || handle.render()) as MetricsRender))
}

#[cfg(not(feature = "prometheus"))]
fn metrics_render(config: &LeadflowConfig) -> Result<Option<MetricsRender>, LeadflowError> {
    if config.telemetry.metrics_enabled {
        warn!("metrics requested but the prometheus feature is not compiled in");
    }
    Ok(None)
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("leadflow={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
