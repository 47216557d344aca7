// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is a no-op.

use leadflow_core::{ExitReason, QualificationTier};
use metrics::{describe_counter, describe_histogram};

/// Register descriptions for every engine metric.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("leadflow_leads_created_total", "Leads created, by UTM source");
    describe_counter!("leadflow_answers_total", "Answers logged");
    describe_counter!("leadflow_behaviors_total", "Behaviors logged, by action");
    describe_histogram!("leadflow_score_delta", "Score change applied per mutation");
    describe_counter!(
        "leadflow_tier_transitions_total",
        "Qualification tier changes, by source and target tier"
    );
    describe_counter!(
        "leadflow_notifications_total",
        "Qualified-lead notifications, by outcome"
    );
    describe_counter!("leadflow_customer_ids_total", "Customer ids issued");
    describe_counter!("leadflow_page_visits_total", "Page entries logged");
    describe_histogram!(
        "leadflow_page_time_spent_seconds",
        "Seconds spent on a page, recorded at exit"
    );
    describe_counter!("leadflow_session_exits_total", "Session exits, by reason");
    describe_counter!("leadflow_cif_completed_total", "Customer forms that reached 100%");
    describe_counter!(
        "leadflow_ab_assignments_total",
        "A/B variant assignments, by test and variant"
    );
    describe_counter!(
        "leadflow_ab_conversions_total",
        "A/B conversions, by test and variant"
    );
}

pub fn record_lead_created(utm_source: &str) {
    metrics::counter!("leadflow_leads_created_total", "utm_source" => utm_source.to_string())
        .increment(1);
}

/// Record an answer; the earned points go to the score histogram via the mutation.
pub fn record_answer(_score_earned: i64) {
    metrics::counter!("leadflow_answers_total").increment(1);
}

pub fn record_behavior(action: &str) {
    metrics::counter!("leadflow_behaviors_total", "action" => action.to_string()).increment(1);
}

pub fn record_score_change(delta: i64) {
    metrics::histogram!("leadflow_score_delta").record(delta as f64);
}

pub fn record_tier_transition(from: QualificationTier, to: QualificationTier) {
    metrics::counter!(
        "leadflow_tier_transitions_total",
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

pub fn record_notification(delivered: bool) {
    let outcome = if delivered { "delivered" } else { "failed" };
    metrics::counter!("leadflow_notifications_total", "outcome" => outcome).increment(1);
}

pub fn record_customer_id() {
    metrics::counter!("leadflow_customer_ids_total").increment(1);
}

pub fn record_page_entry() {
    metrics::counter!("leadflow_page_visits_total").increment(1);
}

pub fn record_page_exit(time_spent: i64) {
    metrics::histogram!("leadflow_page_time_spent_seconds").record(time_spent as f64);
}

pub fn record_session_exit(reason: ExitReason) {
    metrics::counter!("leadflow_session_exits_total", "reason" => reason.to_string())
        .increment(1);
}

pub fn record_cif_completed() {
    metrics::counter!("leadflow_cif_completed_total").increment(1);
}

pub fn record_ab_assignment(test_name: &str, variant: &str) {
    metrics::counter!(
        "leadflow_ab_assignments_total",
        "test" => test_name.to_string(),
        "variant" => variant.to_string()
    )
    .increment(1);
}

pub fn record_ab_conversion(test_name: &str, variant: &str) {
    metrics::counter!(
        "leadflow_ab_conversions_total",
        "test" => test_name.to_string(),
        "variant" => variant.to_string()
    )
    .increment(1);
}
