// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session, question flow, lead profile and scoring handlers.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use leadflow_core::{HealthStatus, ProfileUpdate};
use leadflow_engine::engine::LoggedAnswer;
use leadflow_engine::leads::{BehaviorLogged, CrmExport, CurrentScore, CustomerDetails, LeadSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::server::GatewayState;

/// A confirmation message followed by the operation's own fields.
#[derive(Debug, Serialize)]
pub struct Ack<T> {
    pub message: &'static str,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Ack<T> {
    pub fn new(message: &'static str, body: T) -> Self {
        Self { message, body }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// GET /health
///
/// 200 while storage is healthy or degraded, 503 otherwise.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let (code, status, detail) = match state.engine.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok", None),
        Ok(HealthStatus::Degraded(why)) => (StatusCode::OK, "degraded", Some(why)),
        Ok(HealthStatus::Unhealthy(why)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(why))
        }
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(e.to_string())),
    };
    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        detail,
    };
    (code, Json(body)).into_response()
}

/// GET /metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionStartRequest {
    #[serde(default)]
    pub utm_source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionStarted {
    pub session_id: String,
    pub lead_score: i64,
}

/// POST /api/session/start
pub async fn start_session(
    State(state): State<GatewayState>,
    body: Option<Json<SessionStartRequest>>,
) -> Result<Json<Ack<SessionStarted>>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let lead = state
        .engine
        .create_session_lead(body.utm_source.as_deref())
        .await?;
    Ok(Json(Ack::new(
        "Session started successfully",
        SessionStarted {
            session_id: lead.session_id,
            lead_score: lead.lead_score,
        },
    )))
}

/// GET /api/questions
pub async fn get_questions(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(state.engine.get_questions().to_vec())
}

/// GET /api/product-menu
pub async fn product_menu(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(state.engine.product_menu().to_vec())
}

/// GET /api/cta-options
pub async fn cta_options(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(state.engine.cta_options().to_vec())
}

#[derive(Debug, Deserialize)]
pub struct LogAnswerRequest {
    pub session_id: String,
    pub question_id: i64,
    pub answer_text: String,
    #[serde(default)]
    pub time_taken: Option<f64>,
}

/// POST /api/answer
pub async fn log_answer(
    State(state): State<GatewayState>,
    Json(body): Json<LogAnswerRequest>,
) -> Result<Json<Ack<LoggedAnswer>>, ApiError> {
    let logged = state
        .engine
        .log_answer(
            &body.session_id,
            body.question_id,
            &body.answer_text,
            body.time_taken,
        )
        .await?;
    Ok(Json(Ack::new("Answer logged successfully", logged)))
}

#[derive(Debug, Deserialize)]
pub struct NextQuestionRequest {
    pub session_id: String,
    pub last_question_id: i64,
}

/// POST /api/next-question
///
/// Answers `null` once no required question remains.
pub async fn next_question(
    State(state): State<GatewayState>,
    Json(body): Json<NextQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let next = state
        .engine
        .next_question(&body.session_id, body.last_question_id)
        .await?;
    Ok(Json(next))
}

#[derive(Debug, Deserialize)]
pub struct LogBehaviorRequest {
    pub session_id: String,
    pub action: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// POST /api/behavior
pub async fn log_behavior(
    State(state): State<GatewayState>,
    Json(body): Json<LogBehaviorRequest>,
) -> Result<Json<Ack<BehaviorLogged>>, ApiError> {
    let logged = state
        .engine
        .log_behavior(&body.session_id, &body.action, body.metadata.as_ref())
        .await?;
    Ok(Json(Ack::new("Behavior logged successfully", logged)))
}

#[derive(Debug, Serialize)]
pub struct ActionList<'a> {
    pub actions: Vec<&'a str>,
}

/// GET /api/behavior/actions
pub async fn valid_actions(State(state): State<GatewayState>) -> Response {
    Json(ActionList {
        actions: state.engine.scoring().valid_actions(),
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct LeadProfileRequest {
    pub session_id: String,
    pub profile_data: ProfileUpdate,
}

/// POST /api/lead/profile
pub async fn update_profile(
    State(state): State<GatewayState>,
    Json(body): Json<LeadProfileRequest>,
) -> Result<Json<Ack<LeadSummary>>, ApiError> {
    let lead = state
        .engine
        .update_profile(&body.session_id, &body.profile_data)
        .await?;
    Ok(Json(Ack::new("Profile updated successfully", lead)))
}

/// GET /api/lead/summary/{session_id}
pub async fn lead_summary(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
) -> Result<Json<LeadSummary>, ApiError> {
    Ok(Json(state.engine.get_summary(&session_id).await?))
}

/// GET /api/lead/export/{session_id}
pub async fn export_lead(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
) -> Result<Json<CrmExport>, ApiError> {
    Ok(Json(state.engine.export_for_crm(&session_id).await?))
}

/// GET /api/score/{session_id}
pub async fn current_score(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
) -> Result<Json<CurrentScore>, ApiError> {
    Ok(Json(state.engine.current_score(&session_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub session_id: String,
}

/// POST /api/lead/notify
///
/// 422 when the lead is below the sales threshold.
pub async fn notify_sales(
    State(state): State<GatewayState>,
    Json(body): Json<SessionRequest>,
) -> Result<Json<Ack<LeadSummary>>, ApiError> {
    let lead = state.engine.notify_sales(&body.session_id).await?;
    Ok(Json(Ack::new("Notification sent", lead)))
}

#[derive(Debug, Serialize)]
pub struct CustomerIdIssued {
    pub session_id: String,
    pub customer_id: String,
}

/// POST /api/customer/generate-id
pub async fn generate_customer_id(
    State(state): State<GatewayState>,
    Json(body): Json<SessionRequest>,
) -> Result<Json<Ack<CustomerIdIssued>>, ApiError> {
    let customer_id = state.engine.assign_customer_id(&body.session_id).await?;
    Ok(Json(Ack::new(
        "Customer ID generated successfully",
        CustomerIdIssued {
            session_id: body.session_id,
            customer_id,
        },
    )))
}

/// GET /api/customer/{customer_id}
pub async fn customer_details(
    State(state): State<GatewayState>,
    Path(customer_id): Path<String>,
) -> Result<Json<CustomerDetails>, ApiError> {
    Ok(Json(state.engine.get_customer_details(&customer_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::router;
    use crate::testing::{call, get, harness, post};
    use leadflow_config::model::LeadflowConfig;
    use leadflow_test_utils::TestHarness;
    use serde_json::json;

    #[tokio::test]
    async fn health_reports_ok_with_version() {
        let (app, _h) = harness().await;
        let (status, body) = call(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn metrics_absent_without_renderer() {
        let (app, _h) = harness().await;
        let (status, _) = call(&app, get("/metrics")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_served_as_text_when_rendered() {
        let (_, h) = harness().await;
        let state = GatewayState::new(h.engine.clone())
            .with_metrics(std::sync::Arc::new(|| "leadflow_up 1\n".to_string()));
        let app = crate::server::router(state);
        let (status, body) = call(&app, get("/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "leadflow_up 1\n");
    }

    #[tokio::test]
    async fn session_start_without_body_uses_default_source() {
        let (app, h) = harness().await;
        let (status, body) = call(&app, post("/api/session/start", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Session started successfully");
        assert_eq!(body["lead_score"], 5);
        let sid = body["session_id"].as_str().unwrap();
        assert_eq!(h.engine.get_summary(sid).await.unwrap().utm_source, "direct");
    }

    #[tokio::test]
    async fn answer_and_score_round_trip() {
        let (app, h) = harness().await;
        h.lead("s1", "ads").await.unwrap();
        let (status, body) = call(
            &app,
            post(
                "/api/answer",
                json!({"session_id": "s1", "question_id": 2, "answer_text": "Restaurant / Café"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score_earned"], 10);

        let (_, score) = call(&app, get("/api/score/s1")).await;
        assert_eq!(score["lead_score"], 15);
        assert_eq!(score["lead_type"], "Unqualified");
    }

    #[tokio::test]
    async fn unknown_session_is_404_with_error_body() {
        let (app, _h) = harness().await;
        let (status, body) = call(&app, get("/api/lead/summary/ghost")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn blank_action_is_400() {
        let (app, h) = harness().await;
        h.lead("s1", "ads").await.unwrap();
        let (status, _) = call(
            &app,
            post("/api/behavior", json!({"session_id": "s1", "action": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn notify_below_threshold_is_422() {
        let (app, h) = harness().await;
        h.lead("s1", "ads").await.unwrap();
        let (status, body) =
            call(&app, post("/api/lead/notify", json!({"session_id": "s1"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("60"));
        assert_eq!(h.notifier.delivered_count().await, 0);
    }

    #[tokio::test]
    async fn next_question_is_null_when_flow_is_done() {
        let (app, h) = harness().await;
        h.lead("s1", "ads").await.unwrap();
        let (_, first) = call(
            &app,
            post("/api/next-question", json!({"session_id": "s1", "last_question_id": 1})),
        )
        .await;
        assert_eq!(first["id"], 2);
        let (status, last) = call(
            &app,
            post("/api/next-question", json!({"session_id": "s1", "last_question_id": 7})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(last.is_null());
    }

    #[tokio::test]
    async fn profile_update_ignores_unknown_keys() {
        let (app, h) = harness().await;
        h.lead("s1", "ads").await.unwrap();
        let (status, body) = call(
            &app,
            post(
                "/api/lead/profile",
                json!({
                    "session_id": "s1",
                    "profile_data": {"name": "Asha", "favourite_colour": "blue",
                                     "features_interested": ["Billing", "Billing", "QR"]}
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Asha");
        assert_eq!(body["features_interested"], json!(["Billing", "QR"]));
    }

    #[tokio::test]
    async fn customer_id_is_stable_across_calls() {
        let (app, h) = harness().await;
        h.lead("s1", "ads").await.unwrap();
        let (_, first) =
            call(&app, post("/api/customer/generate-id", json!({"session_id": "s1"}))).await;
        let (_, again) =
            call(&app, post("/api/customer/generate-id", json!({"session_id": "s1"}))).await;
        assert_eq!(first["customer_id"], "CID_20260309_0001");
        assert_eq!(first["customer_id"], again["customer_id"]);

        let (status, details) = call(&app, get("/api/customer/CID_20260309_0001")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(details["lead"]["session_id"], "s1");
    }

    #[tokio::test]
    async fn actions_list_the_scoring_vocabulary() {
        let (app, _h) = harness().await;
        let (_, body) = call(&app, get("/api/behavior/actions")).await;
        let actions = body["actions"].as_array().unwrap();
        assert!(actions.iter().any(|a| a == "clicked_demo"));
    }

    #[tokio::test]
    async fn product_menu_lists_configured_products() {
        let (app, _h) = harness().await;
        let (status, body) = call(&app, get("/api/product-menu")).await;
        assert_eq!(status, StatusCode::OK);
        let menu = body.as_array().unwrap();
        assert_eq!(menu.len(), 9);
        assert_eq!(menu[0]["id"], "billing");
        let demo = menu.iter().find(|m| m["id"] == "demo").unwrap();
        assert_eq!(demo["score"], 15);
        assert!(demo["description"].is_string());
    }

    #[tokio::test]
    async fn cta_options_follow_the_config() {
        let mut config = LeadflowConfig::default();
        config.workflow.cta_options.truncate(2);
        let h = TestHarness::builder().with_config(config).build().await.unwrap();
        let app = router(GatewayState::new(h.engine.clone()));

        let (status, body) = call(&app, get("/api/cta-options")).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["talk_to_sales", "request_callback"]);
    }
}
