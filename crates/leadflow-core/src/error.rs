// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Leadflow lead engine.

use thiserror::Error;

/// The primary error type used across Leadflow adapter traits and engine operations.
///
/// Variants the caller can branch on (`NotFound`, `Validation`, `Conflict`,
/// `NotQualified`) carry the key that triggered them so transports can
/// render an actionable message.
#[derive(Debug, Error)]
pub enum LeadflowError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No entity exists for the given key.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Caller input is missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The entity already exists and cannot be created again.
    #[error("{entity} already exists: {key}")]
    Conflict { entity: &'static str, key: String },

    /// The lead exists but its score is below the sales threshold.
    #[error("lead {session_id} is not sales qualified: score {score} is below {threshold}")]
    NotQualified {
        session_id: String,
        score: i64,
        threshold: i64,
    },

    /// Outbound notification sink failed.
    #[error("notification error: {message}")]
    Notification {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LeadflowError {
    /// Shorthand for a lead lookup miss keyed by session.
    pub fn lead_not_found(session_id: &str) -> Self {
        Self::NotFound {
            entity: "lead",
            key: session_id.to_string(),
        }
    }

    /// Returns true for the variants that describe caller-visible state
    /// rather than a failing dependency.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Validation(_)
                | Self::Conflict { .. }
                | Self::NotQualified { .. }
        )
    }
}
