// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from engine errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use leadflow_core::LeadflowError;
use serde::Serialize;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Engine error carried out of a handler.
#[derive(Debug)]
pub struct ApiError(pub LeadflowError);

impl From<LeadflowError> for ApiError {
    fn from(err: LeadflowError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            LeadflowError::NotFound { .. } => StatusCode::NOT_FOUND,
            LeadflowError::Validation(_) => StatusCode::BAD_REQUEST,
            LeadflowError::Conflict { .. } => StatusCode::CONFLICT,
            LeadflowError::NotQualified { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LeadflowError::Storage { .. } | LeadflowError::Notification { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            LeadflowError::Config(_) | LeadflowError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
