// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A/B test handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use leadflow_engine::experiments::{AbResults, TestExport};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::handlers::Ack;
use crate::server::GatewayState;

/// Test used when a variant request names none.
pub const DEFAULT_TEST: &str = "greeting_message";

#[derive(Debug, Deserialize)]
pub struct VariantRequest {
    pub session_id: String,
    #[serde(default)]
    pub test_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VariantAssigned {
    pub test_name: String,
    pub variant: String,
}

/// POST /api/ab-test/variant
pub async fn assign_variant(
    State(state): State<GatewayState>,
    Json(body): Json<VariantRequest>,
) -> Result<Json<VariantAssigned>, ApiError> {
    let test_name = body.test_name.unwrap_or_else(|| DEFAULT_TEST.to_string());
    let variant = state
        .engine
        .assign_variant(&body.session_id, &test_name)
        .await?;
    Ok(Json(VariantAssigned { test_name, variant }))
}

#[derive(Debug, Deserialize)]
pub struct ConversionRequest {
    pub session_id: String,
    pub test_name: String,
    pub variant: String,
    pub conversion_type: String,
    #[serde(default)]
    pub conversion_value: Option<Value>,
}

/// POST /api/ab-test/conversion
pub async fn log_conversion(
    State(state): State<GatewayState>,
    Json(body): Json<ConversionRequest>,
) -> Result<Json<Ack<VariantAssigned>>, ApiError> {
    state
        .engine
        .log_conversion(
            &body.session_id,
            &body.test_name,
            &body.variant,
            &body.conversion_type,
            body.conversion_value,
        )
        .await?;
    Ok(Json(Ack::new(
        "Conversion logged successfully",
        VariantAssigned {
            test_name: body.test_name,
            variant: body.variant,
        },
    )))
}

#[derive(Debug, Default, Deserialize)]
pub struct ResultsQuery {
    #[serde(default)]
    pub test_name: Option<String>,
}

/// GET /api/ab-test/results[?test_name=...]
pub async fn results(
    State(state): State<GatewayState>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<AbResults>, ApiError> {
    Ok(Json(
        state.engine.ab_results(query.test_name.as_deref()).await?,
    ))
}

/// GET /api/ab-test/winner/{test_name}
pub async fn winner(
    State(state): State<GatewayState>,
    Path(test_name): Path<String>,
) -> Result<Json<VariantAssigned>, ApiError> {
    let variant = state.engine.winning_variant(&test_name).await?;
    Ok(Json(VariantAssigned { test_name, variant }))
}

/// GET /api/ab-test/export/{test_name}
pub async fn export(
    State(state): State<GatewayState>,
    Path(test_name): Path<String>,
) -> Result<Json<TestExport>, ApiError> {
    Ok(Json(state.engine.export_test_data(&test_name).await?))
}
