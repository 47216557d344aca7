// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over the HTTP surface.
//!
//! Each test builds an isolated TestHarness (temp SQLite, manual clock,
//! recording notifier) and drives the gateway router in-process.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use leadflow_gateway::{router, GatewayState};
use leadflow_test_utils::TestHarness;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn setup() -> (Router, TestHarness) {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = router(GatewayState::new(harness.engine.clone()));
    (app, harness)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn behavior(app: &Router, session_id: &str, action: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/behavior",
        Some(json!({"session_id": session_id, "action": action})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{action}: {body}");
    body
}

async fn start_session(app: &Router, utm_source: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/session/start",
        Some(json!({"utm_source": utm_source})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["session_id"].as_str().unwrap().to_string()
}

// ---- Tier walk ----

#[tokio::test]
async fn behaviors_walk_a_lead_through_every_tier() {
    let (app, harness) = setup().await;
    let sid = start_session(&app, "ads").await;

    let (_, score) = send(&app, Method::GET, &format!("/api/score/{sid}"), None).await;
    assert_eq!(score, json!({"lead_score": 5, "lead_type": "Unqualified"}));

    let steps = [
        ("clicked_demo", 20, "Unqualified"),
        ("cta_clicked", 35, "MQL"),
        ("shared_contact", 45, "MQL"),
        ("clicked_pricing", 55, "MQL"),
        ("cta_clicked", 70, "SQL"),
    ];
    for (action, score, tier) in steps {
        let body = behavior(&app, &sid, action).await;
        assert_eq!(body["lead_score"], score, "after {action}");
        assert_eq!(body["lead_type"], tier, "after {action}");
    }

    let delivered = harness.notifier.delivered().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].session_id, sid);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/lead/notify",
        Some(json!({"session_id": sid})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(harness.notifier.delivered_count().await, 2);

    let (_, export) = send(&app, Method::GET, &format!("/api/lead/export/{sid}"), None).await;
    assert_eq!(export["lead_type"], "SQL");
    assert_eq!(export["utm_source"], "ads");
    assert_eq!(export["assigned_to"], "CTL-Team");
}

// ---- Journey ----

#[tokio::test]
async fn page_visits_build_an_ordered_journey() {
    let (app, harness) = setup().await;
    let sid = start_session(&app, "ads").await;

    let (_, q1) = send(
        &app,
        Method::POST,
        "/api/tracking/page-entry",
        Some(json!({"session_id": sid, "page_identifier": "q1", "question_id": 1})),
    )
    .await;
    harness.clock.advance(7);
    let (_, exited) = send(
        &app,
        Method::POST,
        "/api/tracking/page-exit",
        Some(json!({"page_tracking_id": q1["page_tracking_id"]})),
    )
    .await;
    assert_eq!(exited["time_spent"], 7);

    let (_, journey) = send(&app, Method::GET, &format!("/api/tracking/journey/{sid}"), None).await;
    assert_eq!(journey["total_pages"], 1);
    assert_eq!(journey["journey"][0]["time_spent"], 7);

    harness.clock.advance(1);
    send(
        &app,
        Method::POST,
        "/api/tracking/page-entry",
        Some(json!({"session_id": sid, "page_identifier": "q2", "question_id": 2})),
    )
    .await;

    let (_, journey) = send(&app, Method::GET, &format!("/api/tracking/journey/{sid}"), None).await;
    assert_eq!(journey["total_pages"], 2);
    assert!(journey["journey"][1]["time_spent"].is_null());

    let (_, visual) = send(
        &app,
        Method::GET,
        &format!("/api/tracking/visual-journey/{sid}"),
        None,
    )
    .await;
    assert_eq!(visual["visual_journey"][0]["status"], "completed");
    assert_eq!(visual["visual_journey"][1]["status"], "current");
    assert_eq!(visual["statistics"]["completion_rate"], "50.0%");
}

// ---- Full funnel with customer form ----

#[tokio::test]
async fn full_funnel_reaches_cif_completion() {
    let (app, harness) = setup().await;
    let sid = start_session(&app, "whatsapp").await;

    let (_, questions) = send(&app, Method::GET, "/api/questions", None).await;
    let required: Vec<i64> = questions
        .as_array()
        .unwrap()
        .iter()
        .filter(|q| q["required"] == true)
        .map(|q| q["id"].as_i64().unwrap())
        .collect();
    assert_eq!(required.len(), 6);

    let mut last = Value::Null;
    for id in &required {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/answer",
            Some(json!({"session_id": sid, "question_id": id, "answer_text": "ok", "time_taken": 300.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        last = body;
    }
    assert_eq!(last["funnel_complete"], true);
    // 5 opened + 6 answers * 5 + 10 bonus
    assert_eq!(harness.score(&sid).await.unwrap(), 45);

    let (_, issued) = send(
        &app,
        Method::POST,
        "/api/customer/generate-id",
        Some(json!({"session_id": sid})),
    )
    .await;
    let cid = issued["customer_id"].as_str().unwrap().to_string();

    send(
        &app,
        Method::POST,
        "/api/cif/start",
        Some(json!({"session_id": sid, "customer_id": cid})),
    )
    .await;
    let sections = json!({
        "basic_info": {"full_name": "Asha Rao", "email": "asha@example.com", "phone": "98200"},
        "business_details": {"business_name": "Rao Foods", "business_type": "Restaurant", "industry": "F&B"},
        "operational_info": {"staff_size": "6-15", "monthly_sales": "2L-5L"},
        "technology_profile": {"current_pos": "none", "features_needed": ["billing"]},
        "financial_info": {"annual_revenue": "50L", "growth_stage": "growing"}
    });
    for (section, data) in sections.as_object().unwrap() {
        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/cif/update",
            Some(json!({"customer_id": cid, "section": section, "form_data": data})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, details) = send(&app, Method::GET, &format!("/api/customer/{cid}"), None).await;
    assert_eq!(details["lead"]["cif_completed"], true);
    assert_eq!(details["cif"]["completion_percentage"], 100.0);

    send(
        &app,
        Method::POST,
        "/api/session/exit",
        Some(json!({"session_id": sid, "exit_reason": "completed", "exit_page": "summary"})),
    )
    .await;

    let (_, leads) = send(&app, Method::GET, "/api/analytics/leads", None).await;
    assert_eq!(leads["total_leads"], 1);
    assert_eq!(leads["completion_rate"], 100.0);
    let (_, cif) = send(&app, Method::GET, "/api/analytics/cif-completion", None).await;
    assert_eq!(cif["completed_forms"], 1);
    let (_, drop_off) = send(&app, Method::GET, "/api/analytics/drop-off-points", None).await;
    assert_eq!(drop_off["total_exits"], 1);
    assert_eq!(drop_off["abandoned_exits"], 0);
}

// ---- Errors ----

#[tokio::test]
async fn errors_carry_status_and_message() {
    let (app, _harness) = setup().await;

    let (status, body) = send(&app, Method::GET, "/api/score/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("missing"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/answer",
        Some(json!({"session_id": "missing", "question_id": 42, "answer_text": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}
