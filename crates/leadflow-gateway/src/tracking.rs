// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Page tracking and journey handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use leadflow_core::PageVisit;
use leadflow_engine::journey::{CustomerJourney, IdType, PageEntry, VisualJourney};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::handlers::Ack;
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct PageEntryRequest {
    pub session_id: String,
    pub page_identifier: String,
    #[serde(default)]
    pub question_id: Option<i64>,
    #[serde(default)]
    pub page_type: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct PageEntered {
    pub page_tracking_id: i64,
    pub entry_time: DateTime<Utc>,
}

/// POST /api/tracking/page-entry
pub async fn page_entry(
    State(state): State<GatewayState>,
    Json(body): Json<PageEntryRequest>,
) -> Result<Json<Ack<PageEntered>>, ApiError> {
    let entry = PageEntry {
        question_id: body.question_id,
        page_type: body.page_type,
        metadata: body.metadata,
    };
    let visit = state
        .engine
        .log_page_entry(&body.session_id, &body.page_identifier, entry)
        .await?;
    Ok(Json(Ack::new(
        "Page entry logged",
        PageEntered {
            page_tracking_id: visit.id,
            entry_time: visit.entry_time,
        },
    )))
}

#[derive(Debug, Deserialize)]
pub struct PageExitRequest {
    pub page_tracking_id: i64,
    #[serde(default)]
    pub exit_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct PageExited {
    pub page_tracking_id: i64,
    pub time_spent: Option<i64>,
}

/// POST /api/tracking/page-exit
///
/// Repeating an exit returns the first exit's dwell time.
pub async fn page_exit(
    State(state): State<GatewayState>,
    Json(body): Json<PageExitRequest>,
) -> Result<Json<Ack<PageExited>>, ApiError> {
    let visit = state
        .engine
        .log_page_exit(body.page_tracking_id, body.exit_time)
        .await?;
    Ok(Json(Ack::new(
        "Page exit logged",
        PageExited {
            page_tracking_id: visit.id,
            time_spent: visit.time_spent,
        },
    )))
}

#[derive(Debug, Serialize)]
pub struct SessionJourneyResponse {
    pub session_id: String,
    pub total_pages: usize,
    pub journey: Vec<PageVisit>,
}

/// GET /api/tracking/journey/{session_id}
pub async fn journey(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionJourneyResponse>, ApiError> {
    let journey = state.engine.get_journey(&session_id).await?;
    Ok(Json(SessionJourneyResponse {
        session_id,
        total_pages: journey.len(),
        journey,
    }))
}

/// GET /api/tracking/customer-journey/{customer_id}
pub async fn customer_journey(
    State(state): State<GatewayState>,
    Path(customer_id): Path<String>,
) -> Result<Json<CustomerJourney>, ApiError> {
    Ok(Json(state.engine.get_journey_by_customer(&customer_id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct VisualJourneyQuery {
    #[serde(default)]
    pub id_type: IdType,
}

/// GET /api/tracking/visual-journey/{id}?id_type=session|customer
pub async fn visual_journey(
    State(state): State<GatewayState>,
    Path(identifier): Path<String>,
    Query(query): Query<VisualJourneyQuery>,
) -> Result<Json<VisualJourney>, ApiError> {
    Ok(Json(
        state
            .engine
            .visual_journey(&identifier, query.id_type)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use crate::testing::{call, get, harness, post};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn entry_then_exit_records_dwell_time() {
        let (app, h) = harness().await;
        h.lead("s1", "ads").await.unwrap();
        let (status, entered) = call(
            &app,
            post(
                "/api/tracking/page-entry",
                json!({"session_id": "s1", "page_identifier": "question_2",
                       "question_id": 2, "page_type": "question"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = entered["page_tracking_id"].as_i64().unwrap();

        h.clock.advance(42);
        let (_, exited) = call(
            &app,
            post("/api/tracking/page-exit", json!({"page_tracking_id": id})),
        )
        .await;
        assert_eq!(exited["time_spent"], 42);

        let (_, journey) = call(&app, get("/api/tracking/journey/s1")).await;
        assert_eq!(journey["total_pages"], 1);
        assert_eq!(journey["journey"][0]["page_identifier"], "question_2");
    }

    #[tokio::test]
    async fn exit_for_unknown_visit_is_404() {
        let (app, _h) = harness().await;
        let (status, _) = call(
            &app,
            post("/api/tracking/page-exit", json!({"page_tracking_id": 999})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn visual_journey_by_customer_id() {
        let (app, h) = harness().await;
        h.lead("s1", "ads").await.unwrap();
        let cid = h.engine.assign_customer_id("s1").await.unwrap();
        call(
            &app,
            post(
                "/api/tracking/page-entry",
                json!({"session_id": "s1", "page_identifier": "welcome_page"}),
            ),
        )
        .await;

        let uri = format!("/api/tracking/visual-journey/{cid}?id_type=customer");
        let (status, body) = call(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], "s1");
        assert_eq!(body["visual_journey"][0]["status"], "current");
        assert_eq!(body["statistics"]["completion_rate"], "0.0%");

        let (status, _) = call(&app, get("/api/tracking/visual-journey/s1?id_type=bogus")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
