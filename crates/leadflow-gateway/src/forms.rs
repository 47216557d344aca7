// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer information form handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use leadflow_core::CustomerForm;
use leadflow_engine::cif::CifStarted;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::handlers::Ack;
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct CifStartRequest {
    pub session_id: String,
    pub customer_id: String,
}

/// POST /api/cif/start
pub async fn start(
    State(state): State<GatewayState>,
    Json(body): Json<CifStartRequest>,
) -> Result<Json<Ack<CifStarted>>, ApiError> {
    let started = state
        .engine
        .cif_start(&body.session_id, &body.customer_id)
        .await?;
    let message = if started.created {
        "CIF started successfully"
    } else {
        "CIF already exists"
    };
    Ok(Json(Ack::new(message, started)))
}

#[derive(Debug, Deserialize)]
pub struct CifUpdateRequest {
    pub customer_id: String,
    pub form_data: Map<String, Value>,
    #[serde(default)]
    pub section: Option<String>,
}

/// PUT /api/cif/update
pub async fn update(
    State(state): State<GatewayState>,
    Json(body): Json<CifUpdateRequest>,
) -> Result<Json<Ack<CustomerForm>>, ApiError> {
    let form = state
        .engine
        .cif_update(&body.customer_id, body.form_data, body.section.as_deref())
        .await?;
    Ok(Json(Ack::new("CIF updated successfully", form)))
}

/// GET /api/cif/{customer_id}
pub async fn get_form(
    State(state): State<GatewayState>,
    Path(customer_id): Path<String>,
) -> Result<Json<CustomerForm>, ApiError> {
    Ok(Json(state.engine.cif_get(&customer_id).await?))
}
