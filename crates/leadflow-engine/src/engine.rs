// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The engine facade.
//!
//! [`Engine`] owns the configuration-derived components and the adapters the
//! core consumes (store, clock, notifier). Operations are grouped by concern
//! across this crate's modules as `impl Engine` blocks; this module holds
//! construction, the shared post-scoring hook, and the answer/funnel flow.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use leadflow_config::model::{
    AbTestingConfig, CrmConfig, LeadflowConfig, MenuOption, NotificationConfig, QuestionConfig,
};
use leadflow_core::{
    Clock, HealthStatus, LeadNotifier, LeadStore, LeadflowError, NewAnswer, NewBehavior,
    PluginAdapter, QualificationTier, ScoreOutcome, SystemClock,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::funnel::FunnelTracker;
use crate::notify::TracingNotifier;
use crate::recording;
use crate::scoring::ScoringEngine;

/// Behavior awarded once per session when every required question is answered.
pub const ANSWERED_ALL_QUESTIONS: &str = "answered_all_questions";
/// Meta behavior appended after a qualified-lead notification is delivered.
pub const NOTIFICATION_SENT: &str = "notification_sent";

/// Result of logging one answer.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedAnswer {
    pub score_earned: i64,
    pub lead_score: i64,
    pub lead_type: QualificationTier,
    /// True once every required question has been answered.
    pub funnel_complete: bool,
}

/// Lead scoring and funnel engine.
pub struct Engine {
    pub(crate) store: Arc<dyn LeadStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) notifier: Arc<dyn LeadNotifier>,
    pub(crate) scoring: ScoringEngine,
    pub(crate) funnel: FunnelTracker,
    pub(crate) ab_testing: AbTestingConfig,
    pub(crate) notifications: NotificationConfig,
    pub(crate) crm: CrmConfig,
    pub(crate) product_menu: Vec<MenuOption>,
    pub(crate) cta_options: Vec<MenuOption>,
}

impl Engine {
    /// Build an engine over `store` using wall-clock time and log-only notifications.
    pub fn new(config: &LeadflowConfig, store: Arc<dyn LeadStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(TracingNotifier),
            scoring: ScoringEngine::new(&config.workflow),
            funnel: FunnelTracker::new(&config.workflow.questions),
            ab_testing: config.ab_testing.clone(),
            notifications: config.notifications.clone(),
            crm: config.crm.clone(),
            product_menu: config.workflow.product_menu.clone(),
            cta_options: config.workflow.cta_options.clone(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn LeadNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    pub fn funnel(&self) -> &FunnelTracker {
        &self.funnel
    }

    pub fn store(&self) -> &Arc<dyn LeadStore> {
        &self.store
    }

    /// Storage health, used by the liveness endpoint.
    pub async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        self.store.health_check().await
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Bookkeeping shared by every committed score mutation.
    ///
    /// Emits the qualified-lead signal on entry into the SQL tier. Delivery
    /// failures are logged and never surface to the caller.
    pub(crate) async fn after_score(&self, outcome: &ScoreOutcome) {
        let lead = &outcome.lead;
        recording::record_score_change(outcome.score_change);
        if outcome.previous_tier != lead.tier {
            info!(
                session_id = %lead.session_id,
                from = %outcome.previous_tier,
                to = %lead.tier,
                score = lead.score,
                "lead tier changed"
            );
            recording::record_tier_transition(outcome.previous_tier, lead.tier);
        }
        if outcome.entered(QualificationTier::SalesQualified) && self.notifications.enabled {
            if let Err(e) = self.deliver_qualified(lead, "tier_transition").await {
                warn!(
                    session_id = %lead.session_id,
                    error = %e,
                    "qualified-lead notification failed"
                );
            }
        }
    }

    /// Send the qualified-lead signal and record that it went out.
    pub(crate) async fn deliver_qualified(
        &self,
        lead: &leadflow_core::Lead,
        trigger: &str,
    ) -> Result<(), LeadflowError> {
        if let Err(e) = self.notifier.lead_qualified(lead).await {
            recording::record_notification(false);
            return Err(e);
        }
        recording::record_notification(true);

        let metadata = serde_json::json!({
            "notifier": self.notifier.name(),
            "trigger": trigger,
            "lead_score": lead.score,
        });
        let sent = NewBehavior {
            session_id: lead.session_id.clone(),
            action: NOTIFICATION_SENT.to_string(),
            score_change: 0,
            metadata: Some(metadata.to_string()),
        };
        self.store
            .record_behavior(&sent, self.scoring.thresholds(), self.now())
            .await?;
        info!(session_id = %lead.session_id, trigger, "qualified-lead notification sent");
        Ok(())
    }

    // --- Questions and answers ---

    /// The configured questions in funnel order.
    pub fn get_questions(&self) -> &[QuestionConfig] {
        self.funnel.questions()
    }

    pub fn product_menu(&self) -> &[MenuOption] {
        &self.product_menu
    }

    /// Calls to action offered at the end of the funnel.
    pub fn cta_options(&self) -> &[MenuOption] {
        &self.cta_options
    }

    /// Score and store an answer, then check for full funnel completion.
    pub async fn log_answer(
        &self,
        session_id: &str,
        question_id: i64,
        answer_text: &str,
        time_taken: Option<f64>,
    ) -> Result<LoggedAnswer, LeadflowError> {
        require("session_id", session_id)?;
        require("answer_text", answer_text)?;
        if self.funnel.question(question_id).is_none() {
            return Err(LeadflowError::Validation(format!(
                "unknown question_id {question_id}"
            )));
        }
        if let Some(secs) = time_taken
            && !secs.is_finite()
        {
            return Err(LeadflowError::Validation(
                "time_taken must be a finite number of seconds".into(),
            ));
        }

        let score_earned = self
            .scoring
            .score_for_answer(question_id, answer_text, time_taken);
        let answer = NewAnswer {
            session_id: session_id.to_string(),
            question_id,
            answer_text: answer_text.to_string(),
            time_taken,
            score_earned,
        };
        let outcome = self
            .store
            .record_answer(&answer, self.scoring.thresholds(), self.now())
            .await?;
        recording::record_answer(score_earned);
        debug!(session_id, question_id, score_earned, "answer logged");
        self.after_score(&outcome).await;

        let funnel_complete = self.all_required_answered(session_id).await?;
        let lead = self
            .store
            .get_lead(session_id)
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(session_id))?;
        Ok(LoggedAnswer {
            score_earned,
            lead_score: lead.score,
            lead_type: self.scoring.classify(lead.score),
            funnel_complete,
        })
    }

    /// Next required, unanswered question after `last_question_id`.
    pub async fn next_question(
        &self,
        session_id: &str,
        last_question_id: i64,
    ) -> Result<Option<QuestionConfig>, LeadflowError> {
        let answered = self.answered_ids(session_id).await?;
        Ok(self
            .funnel
            .next_required(last_question_id, &answered)
            .cloned())
    }

    /// Share of required questions the session has answered, 0 to 100.
    pub async fn completion_percentage(&self, session_id: &str) -> Result<f64, LeadflowError> {
        let answered = self.answered_ids(session_id).await?;
        Ok(self.funnel.completion(&answered))
    }

    /// True when every required question is answered.
    ///
    /// The first time this holds, the `answered_all_questions` bonus is
    /// awarded. The award is de-duplicated inside the store's transaction,
    /// so repeated calls never grant it twice.
    pub async fn all_required_answered(&self, session_id: &str) -> Result<bool, LeadflowError> {
        let answered = self.answered_ids(session_id).await?;
        if !self.funnel.all_answered(&answered) {
            return Ok(false);
        }

        let bonus = NewBehavior {
            session_id: session_id.to_string(),
            action: ANSWERED_ALL_QUESTIONS.to_string(),
            score_change: self
                .scoring
                .score_for_behavior(ANSWERED_ALL_QUESTIONS, None),
            metadata: None,
        };
        if let Some(outcome) = self
            .store
            .record_behavior_once(&bonus, self.scoring.thresholds(), self.now())
            .await?
        {
            info!(session_id, bonus = outcome.score_change, "funnel completed");
            recording::record_behavior(ANSWERED_ALL_QUESTIONS);
            self.after_score(&outcome).await;
        }
        Ok(true)
    }

    /// Read-only completion check that never awards the bonus.
    pub async fn is_complete(&self, session_id: &str) -> Result<bool, LeadflowError> {
        let answered = self.answered_ids(session_id).await?;
        Ok(self.funnel.all_answered(&answered))
    }

    /// Answered question ids, failing with `NotFound` when the lead is missing.
    pub(crate) async fn answered_ids(&self, session_id: &str) -> Result<Vec<i64>, LeadflowError> {
        require("session_id", session_id)?;
        if self.store.get_lead(session_id).await?.is_none() {
            return Err(LeadflowError::lead_not_found(session_id));
        }
        self.store.answered_question_ids(session_id).await
    }
}

/// Reject a missing or blank required input.
pub(crate) fn require(field: &str, value: &str) -> Result<(), LeadflowError> {
    if value.trim().is_empty() {
        Err(LeadflowError::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

/// Round to two decimal places for reporting.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
