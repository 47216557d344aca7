// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session exit and fleet-wide analytics handlers.

use axum::{extract::State, Json};
use leadflow_core::{ExitReason, SessionExit};
use leadflow_engine::analytics::{DropOffReport, ExitContext, LeadsSummary};
use leadflow_engine::cif::CifCompletionStats;
use leadflow_engine::journey::{PagePerformance, SessionJourney};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::handlers::Ack;
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct SessionExitRequest {
    pub session_id: String,
    pub exit_reason: ExitReason,
    #[serde(default)]
    pub exit_question_id: Option<i64>,
    #[serde(default)]
    pub exit_page: Option<String>,
    #[serde(default)]
    pub last_action: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// POST /api/session/exit
pub async fn log_session_exit(
    State(state): State<GatewayState>,
    Json(body): Json<SessionExitRequest>,
) -> Result<Json<Ack<SessionExit>>, ApiError> {
    let context = ExitContext {
        reason: body.exit_reason,
        exit_question_id: body.exit_question_id,
        exit_page: body.exit_page,
        last_action: body.last_action,
        metadata: body.metadata,
    };
    let exit = state
        .engine
        .log_session_exit(&body.session_id, context)
        .await?;
    Ok(Json(Ack::new("Session exit logged", exit)))
}

/// GET /api/analytics/leads
pub async fn leads(State(state): State<GatewayState>) -> Result<Json<LeadsSummary>, ApiError> {
    Ok(Json(state.engine.leads_summary().await?))
}

/// GET /api/analytics/drop-off-points
pub async fn drop_off_points(
    State(state): State<GatewayState>,
) -> Result<Json<DropOffReport>, ApiError> {
    Ok(Json(state.engine.drop_off_points().await?))
}

#[derive(Debug, Serialize)]
pub struct PagePerformanceResponse {
    pub pages: Vec<PagePerformance>,
}

/// GET /api/analytics/page-performance
pub async fn page_performance(
    State(state): State<GatewayState>,
) -> Result<Json<PagePerformanceResponse>, ApiError> {
    let pages = state.engine.page_performance().await?;
    Ok(Json(PagePerformanceResponse { pages }))
}

#[derive(Debug, Serialize)]
pub struct CustomerJourneysResponse {
    pub total_sessions: usize,
    pub journeys: Vec<SessionJourney>,
}

/// GET /api/analytics/customer-journey
pub async fn customer_journeys(
    State(state): State<GatewayState>,
) -> Result<Json<CustomerJourneysResponse>, ApiError> {
    let journeys = state.engine.all_customer_journeys().await?;
    Ok(Json(CustomerJourneysResponse {
        total_sessions: journeys.len(),
        journeys,
    }))
}

/// GET /api/analytics/cif-completion
pub async fn cif_completion(
    State(state): State<GatewayState>,
) -> Result<Json<CifCompletionStats>, ApiError> {
    Ok(Json(state.engine.cif_completion_analytics().await?))
}
