// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Point values for answers and behaviors, and score classification.
//!
//! Everything here is a pure function of the workflow configuration.

use std::collections::BTreeMap;

use leadflow_config::model::{AnswerScoringConfig, WorkflowConfig};
use leadflow_core::{QualificationTier, TierThresholds};
use serde_json::Value;

/// Scoring-map key for the long-answer bonus.
pub const DETAILED_ANSWER: &str = "detailed_answer";
/// Scoring-map key for the fast-answer bonus.
pub const QUICK_REPLY: &str = "quick_reply";

/// Configuration-driven scoring rules.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    scoring: BTreeMap<String, i64>,
    answer: AnswerScoringConfig,
    thresholds: TierThresholds,
}

impl ScoringEngine {
    pub fn new(workflow: &WorkflowConfig) -> Self {
        Self {
            scoring: workflow.scoring.clone(),
            answer: workflow.answer_scoring.clone(),
            thresholds: workflow.thresholds,
        }
    }

    /// Points for one answer.
    ///
    /// The question does not change the value today; it is part of the
    /// signature so per-question weights can be configured later.
    pub fn score_for_answer(
        &self,
        _question_id: i64,
        answer_text: &str,
        time_taken: Option<f64>,
    ) -> i64 {
        let mut score = self.answer.base_score;
        if answer_text.trim().chars().count() > self.answer.detailed_answer_min_chars {
            score += self.points(DETAILED_ANSWER);
        }
        if let Some(secs) = time_taken
            && secs >= 0.0
            && secs < self.answer.quick_reply_max_secs
        {
            score += self.points(QUICK_REPLY);
        }
        score
    }

    /// Points for a named behavior. Unknown actions score 0.
    pub fn score_for_behavior(&self, action: &str, _metadata: Option<&Value>) -> i64 {
        self.points(action)
    }

    /// Tier for a cumulative score.
    pub fn classify(&self, total: i64) -> QualificationTier {
        self.thresholds.classify(total)
    }

    pub fn thresholds(&self) -> TierThresholds {
        self.thresholds
    }

    /// Every action with a configured point value, alphabetically.
    pub fn valid_actions(&self) -> Vec<&str> {
        self.scoring.keys().map(String::as_str).collect()
    }

    fn points(&self, action: &str) -> i64 {
        self.scoring.get(action).copied().unwrap_or(0)
    }
}
