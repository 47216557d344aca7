// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Leadflow engine.
//!
//! Maps the `/api` JSON routes onto [`leadflow_engine::Engine`] operations
//! and serves `/health` and `/metrics` for supervisors and scrapers.
//! Engine errors become `{"error": ...}` bodies with a status chosen by
//! [`error::ApiError`].

pub mod analytics;
pub mod error;
pub mod experiments;
pub mod forms;
pub mod handlers;
pub mod server;
pub mod tracking;

pub use error::ApiError;
pub use server::{router, start_server, GatewayState, HealthState, MetricsRender, ServerConfig};
