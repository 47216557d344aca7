// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use leadflow_core::LeadflowError;
use leadflow_engine::Engine;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{analytics, experiments, forms, handlers, tracking};

/// Renders the Prometheus text exposition.
pub type MetricsRender = Arc<dyn Fn() -> String + Send + Sync>;

/// State for the health and metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// `/metrics` answers 404 when absent.
    pub prometheus_render: Option<MetricsRender>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            prometheus_render: None,
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<Engine>,
    pub health: HealthState,
}

impl GatewayState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            health: HealthState::default(),
        }
    }

    pub fn with_metrics(mut self, render: MetricsRender) -> Self {
        self.health.prometheus_render = Some(render);
        self
    }
}

/// Gateway server configuration (mirrors `GatewayConfig` from leadflow-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the full route table.
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics));

    let session_routes = Router::new()
        .route("/api/session/start", post(handlers::start_session))
        .route("/api/session/exit", post(analytics::log_session_exit))
        .route("/api/questions", get(handlers::get_questions))
        .route("/api/product-menu", get(handlers::product_menu))
        .route("/api/cta-options", get(handlers::cta_options))
        .route("/api/answer", post(handlers::log_answer))
        .route("/api/next-question", post(handlers::next_question))
        .route("/api/behavior", post(handlers::log_behavior))
        .route("/api/behavior/actions", get(handlers::valid_actions));

    let lead_routes = Router::new()
        .route("/api/lead/profile", post(handlers::update_profile))
        .route("/api/lead/summary/{session_id}", get(handlers::lead_summary))
        .route("/api/lead/export/{session_id}", get(handlers::export_lead))
        .route("/api/lead/notify", post(handlers::notify_sales))
        .route("/api/score/{session_id}", get(handlers::current_score))
        .route("/api/customer/generate-id", post(handlers::generate_customer_id))
        .route("/api/customer/{customer_id}", get(handlers::customer_details));

    let tracking_routes = Router::new()
        .route("/api/tracking/page-entry", post(tracking::page_entry))
        .route("/api/tracking/page-exit", post(tracking::page_exit))
        .route("/api/tracking/journey/{session_id}", get(tracking::journey))
        .route(
            "/api/tracking/customer-journey/{customer_id}",
            get(tracking::customer_journey),
        )
        .route("/api/tracking/visual-journey/{id}", get(tracking::visual_journey));

    let form_routes = Router::new()
        .route("/api/cif/start", post(forms::start))
        .route("/api/cif/update", put(forms::update))
        .route("/api/cif/{customer_id}", get(forms::get_form));

    let analytics_routes = Router::new()
        .route("/api/analytics/leads", get(analytics::leads))
        .route("/api/analytics/drop-off-points", get(analytics::drop_off_points))
        .route("/api/analytics/page-performance", get(analytics::page_performance))
        .route("/api/analytics/customer-journey", get(analytics::customer_journeys))
        .route("/api/analytics/cif-completion", get(analytics::cif_completion));

    let ab_routes = Router::new()
        .route("/api/ab-test/variant", post(experiments::assign_variant))
        .route("/api/ab-test/conversion", post(experiments::log_conversion))
        .route("/api/ab-test/results", get(experiments::results))
        .route("/api/ab-test/winner/{test_name}", get(experiments::winner))
        .route("/api/ab-test/export/{test_name}", get(experiments::export));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(lead_routes)
        .merge(tracking_routes)
        .merge(form_routes)
        .merge(analytics_routes)
        .merge(ab_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `host:port` and serve until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), LeadflowError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LeadflowError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| LeadflowError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
