// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait for leads, funnel events, journeys, and forms.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::LeadflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Answer, Behavior, CustomerForm, FormEdit, FormUpdate, Lead, NewAnswer, NewBehavior,
    NewPageVisit, NewSessionExit, PageVisit, ProfileUpdate, ScoreOutcome, SessionExit,
    TierThresholds,
};

/// Computes a form's completion percentage from its nested data.
pub type CompletionFn = fn(&Value) -> f64;

/// Storage backend for the lead engine.
///
/// Every mutating method is one unit of work: it either commits completely
/// or leaves no trace. Score mutations re-derive the tier with the supplied
/// thresholds inside the same unit of work, so a stored lead never holds a
/// tier that disagrees with its score.
#[async_trait]
pub trait LeadStore: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), LeadflowError>;

    /// Flushes pending writes and releases connections.
    async fn close(&self) -> Result<(), LeadflowError>;

    // --- Leads ---

    /// Insert a lead with score 0 and apply `opening` to it.
    ///
    /// Fails with `Conflict` when the session already has a lead.
    async fn create_lead(
        &self,
        session_id: &str,
        utm_source: &str,
        opening: &NewBehavior,
        thresholds: TierThresholds,
        now: DateTime<Utc>,
    ) -> Result<ScoreOutcome, LeadflowError>;

    async fn get_lead(&self, session_id: &str) -> Result<Option<Lead>, LeadflowError>;

    async fn get_lead_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Lead>, LeadflowError>;

    async fn list_leads(&self) -> Result<Vec<Lead>, LeadflowError>;

    /// Merge profile fields. Returns `None` when the lead does not exist.
    async fn update_profile(
        &self,
        session_id: &str,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Lead>, LeadflowError>;

    /// Atomically add `delta` to the score and re-derive the tier.
    async fn apply_score_delta(
        &self,
        session_id: &str,
        delta: i64,
        thresholds: TierThresholds,
        now: DateTime<Utc>,
    ) -> Result<ScoreOutcome, LeadflowError>;

    /// Reserve the next per-day customer id, or return the existing one.
    async fn assign_customer_id(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<String, LeadflowError>;

    // --- Answers and behaviors ---

    /// Append an answer and apply its score in one unit of work.
    async fn record_answer(
        &self,
        answer: &NewAnswer,
        thresholds: TierThresholds,
        now: DateTime<Utc>,
    ) -> Result<ScoreOutcome, LeadflowError>;

    async fn list_answers(&self, session_id: &str) -> Result<Vec<Answer>, LeadflowError>;

    /// Distinct question ids the session has answered.
    async fn answered_question_ids(&self, session_id: &str) -> Result<Vec<i64>, LeadflowError>;

    /// Append a behavior and apply its score in one unit of work.
    async fn record_behavior(
        &self,
        behavior: &NewBehavior,
        thresholds: TierThresholds,
        now: DateTime<Utc>,
    ) -> Result<ScoreOutcome, LeadflowError>;

    /// Like [`record_behavior`](Self::record_behavior) but a no-op returning
    /// `None` when the session already holds a behavior with the same action.
    async fn record_behavior_once(
        &self,
        behavior: &NewBehavior,
        thresholds: TierThresholds,
        now: DateTime<Utc>,
    ) -> Result<Option<ScoreOutcome>, LeadflowError>;

    async fn list_behaviors(&self, session_id: &str) -> Result<Vec<Behavior>, LeadflowError>;

    async fn list_behaviors_by_action(&self, action: &str)
    -> Result<Vec<Behavior>, LeadflowError>;

    // --- Journey ---

    /// Open a page visit, stamping the session's customer id if one exists.
    async fn insert_page_visit(
        &self,
        visit: &NewPageVisit,
        now: DateTime<Utc>,
    ) -> Result<PageVisit, LeadflowError>;

    /// Close a page visit. Returns `None` when the visit does not exist;
    /// an already closed visit is returned unchanged.
    async fn close_page_visit(
        &self,
        visit_id: i64,
        exit_time: DateTime<Utc>,
    ) -> Result<Option<PageVisit>, LeadflowError>;

    /// Visits for one session ordered by entry time, then id.
    async fn list_page_visits(&self, session_id: &str) -> Result<Vec<PageVisit>, LeadflowError>;

    /// Every visit ordered by session, entry time, then id.
    async fn list_all_page_visits(&self) -> Result<Vec<PageVisit>, LeadflowError>;

    async fn insert_session_exit(
        &self,
        exit: &NewSessionExit,
        now: DateTime<Utc>,
    ) -> Result<SessionExit, LeadflowError>;

    async fn list_session_exits(&self) -> Result<Vec<SessionExit>, LeadflowError>;

    // --- Customer information forms ---

    /// Create the form for `customer_id` unless one exists.
    ///
    /// Returns the form and whether it was created by this call.
    async fn create_form_if_absent(
        &self,
        session_id: &str,
        customer_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(CustomerForm, bool), LeadflowError>;

    async fn get_form(&self, customer_id: &str) -> Result<Option<CustomerForm>, LeadflowError>;

    /// Apply `edit`, recompute completion, and on first full completion stamp
    /// `completed_at` and flag the owning lead, all in one unit of work.
    /// Returns `None` when no form exists for `customer_id`.
    async fn update_form(
        &self,
        customer_id: &str,
        edit: &FormEdit,
        completion: CompletionFn,
        now: DateTime<Utc>,
    ) -> Result<Option<FormUpdate>, LeadflowError>;

    async fn list_forms(&self) -> Result<Vec<CustomerForm>, LeadflowError>;
}
