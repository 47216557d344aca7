// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session exits and fleet-wide rollups.

use std::collections::BTreeMap;

use leadflow_core::{ExitReason, LeadflowError, NewSessionExit, QualificationTier, SessionExit};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::engine::{Engine, round2};
use crate::experiments::AB_TEST_CONVERSION;
use crate::recording;

/// Exit page bucket for exits that did not name one.
pub const UNKNOWN_PAGE: &str = "unknown";

/// Where and how a session ended.
#[derive(Debug, Clone)]
pub struct ExitContext {
    pub reason: ExitReason,
    pub exit_question_id: Option<i64>,
    pub exit_page: Option<String>,
    pub last_action: Option<String>,
    pub metadata: Option<Value>,
}

impl ExitContext {
    pub fn new(reason: ExitReason) -> Self {
        Self {
            reason,
            exit_question_id: None,
            exit_page: None,
            last_action: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDropOff {
    pub exit_page: String,
    pub exits: usize,
    pub average_completion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionDropOff {
    pub exit_question_id: i64,
    pub exits: usize,
    pub average_completion: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DropOffReport {
    pub total_exits: usize,
    /// Exits with any reason other than `completed`.
    pub abandoned_exits: usize,
    pub abandonment_rate: f64,
    pub by_page: Vec<PageDropOff>,
    pub by_question: Vec<QuestionDropOff>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadsSummary {
    pub total_leads: usize,
    pub sql_leads: usize,
    pub mql_leads: usize,
    pub unqualified_leads: usize,
    /// A/B conversions per lead, as a percentage.
    pub conversion_rate: f64,
    pub average_score: f64,
    /// Leads that answered every required question, as a percentage.
    pub completion_rate: f64,
}

impl Engine {
    /// Record a session exit with the funnel completion at this moment.
    ///
    /// Exits are append-only; a session may log several.
    pub async fn log_session_exit(
        &self,
        session_id: &str,
        context: ExitContext,
    ) -> Result<SessionExit, LeadflowError> {
        let lead = self.lead(session_id).await?;
        let answered = self.store.answered_question_ids(session_id).await?;
        let completion_percentage = round2(self.funnel.completion(&answered));
        let exit = NewSessionExit {
            session_id: session_id.to_string(),
            customer_id: lead.customer_id,
            exit_reason: context.reason,
            exit_question_id: context.exit_question_id,
            exit_page: context.exit_page,
            completion_percentage,
            last_action: context.last_action,
            metadata: context.metadata.map(|m| m.to_string()),
        };
        let stored = self.store.insert_session_exit(&exit, self.now()).await?;
        info!(
            session_id,
            reason = %stored.exit_reason,
            completion = completion_percentage,
            "session exited"
        );
        recording::record_session_exit(stored.exit_reason);
        Ok(stored)
    }

    /// Where non-completed sessions left the funnel, busiest first.
    pub async fn drop_off_points(&self) -> Result<DropOffReport, LeadflowError> {
        let exits = self.store.list_session_exits().await?;
        Ok(drop_off_report(&exits))
    }

    /// Tier counts, mean score, conversion and completion rates over all leads.
    pub async fn leads_summary(&self) -> Result<LeadsSummary, LeadflowError> {
        let leads = self.store.list_leads().await?;
        let conversions = self
            .store
            .list_behaviors_by_action(AB_TEST_CONVERSION)
            .await?
            .len();

        let mut tiers: BTreeMap<QualificationTier, usize> = BTreeMap::new();
        let mut completed = 0usize;
        for lead in &leads {
            *tiers.entry(self.scoring.classify(lead.score)).or_default() += 1;
            let answered = self.store.answered_question_ids(&lead.session_id).await?;
            if self.funnel.all_answered(&answered) {
                completed += 1;
            }
        }

        let total = leads.len();
        let percent = |n: usize| {
            if total == 0 {
                0.0
            } else {
                round2(n as f64 / total as f64 * 100.0)
            }
        };
        let average_score = if total == 0 {
            0.0
        } else {
            round2(leads.iter().map(|l| l.score).sum::<i64>() as f64 / total as f64)
        };
        let count = |tier: QualificationTier| tiers.get(&tier).copied().unwrap_or(0);
        Ok(LeadsSummary {
            total_leads: total,
            sql_leads: count(QualificationTier::SalesQualified),
            mql_leads: count(QualificationTier::MarketingQualified),
            unqualified_leads: count(QualificationTier::Unqualified),
            conversion_rate: percent(conversions),
            average_score,
            completion_rate: percent(completed),
        })
    }
}

fn drop_off_report(exits: &[SessionExit]) -> DropOffReport {
    let mut pages: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    let mut questions: BTreeMap<i64, (usize, f64)> = BTreeMap::new();
    let mut abandoned = 0usize;
    for exit in exits.iter().filter(|e| e.exit_reason != ExitReason::Completed) {
        abandoned += 1;
        let page = exit.exit_page.as_deref().unwrap_or(UNKNOWN_PAGE);
        let slot = pages.entry(page).or_default();
        slot.0 += 1;
        slot.1 += exit.completion_percentage;
        if let Some(question) = exit.exit_question_id {
            let slot = questions.entry(question).or_default();
            slot.0 += 1;
            slot.1 += exit.completion_percentage;
        }
    }

    let mut by_page: Vec<PageDropOff> = pages
        .into_iter()
        .map(|(page, (exits, sum))| PageDropOff {
            exit_page: page.to_string(),
            exits,
            average_completion: round2(sum / exits as f64),
        })
        .collect();
    by_page.sort_by(|a, b| b.exits.cmp(&a.exits));

    let mut by_question: Vec<QuestionDropOff> = questions
        .into_iter()
        .map(|(question, (exits, sum))| QuestionDropOff {
            exit_question_id: question,
            exits,
            average_completion: round2(sum / exits as f64),
        })
        .collect();
    by_question.sort_by(|a, b| b.exits.cmp(&a.exits));

    let total_exits = exits.len();
    DropOffReport {
        total_exits,
        abandoned_exits: abandoned,
        abandonment_rate: if total_exits == 0 {
            0.0
        } else {
            round2(abandoned as f64 / total_exits as f64 * 100.0)
        },
        by_page,
        by_question,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;

    fn at(page: &str, question: Option<i64>, reason: ExitReason) -> ExitContext {
        ExitContext {
            exit_page: Some(page.into()),
            exit_question_id: question,
            ..ExitContext::new(reason)
        }
    }

    #[tokio::test]
    async fn exit_stamps_completion_and_customer_id() {
        let fx = fixture().await;
        fx.engine.create_lead("s1", "ads").await.unwrap();
        let cid = fx.engine.assign_customer_id("s1").await.unwrap();
        fx.engine.log_answer("s1", 1, "Restaurant", Some(4.0)).await.unwrap();
        fx.engine.log_answer("s1", 2, "Pune", None).await.unwrap();

        let exit = fx
            .engine
            .log_session_exit("s1", at("q3", Some(3), ExitReason::Abandoned))
            .await
            .unwrap();
        assert_eq!(exit.completion_percentage, 33.33);
        assert_eq!(exit.customer_id, Some(cid));

        let again = fx
            .engine
            .log_session_exit("s1", ExitContext::new(ExitReason::Timeout))
            .await
            .unwrap();
        assert_ne!(again.id, exit.id);
    }

    #[tokio::test]
    async fn exit_for_missing_lead_is_not_found() {
        let fx = fixture().await;
        assert!(matches!(
            fx.engine
                .log_session_exit("ghost", ExitContext::new(ExitReason::Abandoned))
                .await,
            Err(LeadflowError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn drop_off_groups_non_completed_exits() {
        let fx = fixture().await;
        for sid in ["a", "b", "c", "d"] {
            fx.engine.create_lead(sid, "ads").await.unwrap();
        }
        for question in 1..=3 {
            fx.engine.log_answer("b", question, "Retail", None).await.unwrap();
        }
        fx.engine
            .log_session_exit("a", at("q2", Some(2), ExitReason::Abandoned))
            .await
            .unwrap();
        fx.engine
            .log_session_exit("b", at("q2", Some(2), ExitReason::Timeout))
            .await
            .unwrap();
        fx.engine
            .log_session_exit("c", at("landing", None, ExitReason::Abandoned))
            .await
            .unwrap();
        fx.engine
            .log_session_exit("d", at("thank_you", None, ExitReason::Completed))
            .await
            .unwrap();

        let report = fx.engine.drop_off_points().await.unwrap();
        assert_eq!(report.total_exits, 4);
        assert_eq!(report.abandoned_exits, 3);
        assert_eq!(report.abandonment_rate, 75.0);
        assert_eq!(report.by_page[0].exit_page, "q2");
        assert_eq!(report.by_page[0].exits, 2);
        assert_eq!(report.by_page[0].average_completion, 25.0);
        assert_eq!(report.by_question.len(), 1);
        assert!(report.by_page.iter().all(|p| p.exit_page != "thank_you"));
    }

    #[test]
    fn empty_drop_off_report_is_zeroed() {
        let report = drop_off_report(&[]);
        assert_eq!(report.abandonment_rate, 0.0);
        assert!(report.by_page.is_empty());
    }

    #[tokio::test]
    async fn leads_summary_counts_tiers_and_rates() {
        let fx = fixture().await;
        let empty = fx.engine.leads_summary().await.unwrap();
        assert_eq!(empty.total_leads, 0);
        assert_eq!(empty.average_score, 0.0);

        for sid in ["a", "b", "c", "d"] {
            fx.engine.create_lead(sid, "ads").await.unwrap();
        }
        fx.engine.apply_score_delta("a", 60).await.unwrap();
        fx.engine.apply_score_delta("b", 30).await.unwrap();
        for question in 1..=6 {
            fx.engine.log_answer("c", question, "ok", None).await.unwrap();
        }
        let variant = fx.engine.assign_variant("d", "greeting_message").await.unwrap();
        fx.engine
            .log_conversion("d", "greeting_message", &variant, "demo", None)
            .await
            .unwrap();

        let summary = fx.engine.leads_summary().await.unwrap();
        assert_eq!(summary.total_leads, 4);
        assert_eq!(summary.sql_leads, 1);
        assert_eq!(summary.mql_leads, 2);
        assert_eq!(summary.unqualified_leads, 1);
        assert_eq!(summary.conversion_rate, 25.0);
        assert_eq!(summary.completion_rate, 25.0);
        // 65 + 35 + (5 + 30 + 10) + 5
        assert_eq!(summary.average_score, 37.5);
    }

    #[tokio::test]
    async fn rollups_skip_rows_that_fail_to_decode() {
        let fx = fixture().await;
        fx.engine.create_lead("good", "ads").await.unwrap();
        fx.engine.create_lead("bad", "ads").await.unwrap();
        fx.engine
            .log_session_exit("good", at("q2", Some(2), ExitReason::Abandoned))
            .await
            .unwrap();
        fx.plant(
            "UPDATE leads SET features_interested = 'billing,qr' WHERE session_id = 'bad';
             INSERT INTO session_exits (session_id, exit_reason, created_at)
             VALUES ('bad', 'closed_tab', '2026-03-09T10:00:00Z');",
        );

        let summary = fx.engine.leads_summary().await.unwrap();
        assert_eq!(summary.total_leads, 1);
        assert_eq!(summary.average_score, 5.0);

        let report = fx.engine.drop_off_points().await.unwrap();
        assert_eq!(report.total_exits, 1);
        assert_eq!(report.by_page[0].exit_page, "q2");
    }
}
