// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Funnel completion over the configured question order.

use leadflow_config::model::QuestionConfig;

/// Ordered question list with required-question bookkeeping.
#[derive(Debug, Clone)]
pub struct FunnelTracker {
    questions: Vec<QuestionConfig>,
}

impl FunnelTracker {
    /// Sorts the questions by `order_index`, keeping configuration order on ties.
    pub fn new(questions: &[QuestionConfig]) -> Self {
        let mut questions = questions.to_vec();
        questions.sort_by_key(|q| q.order_index);
        Self { questions }
    }

    pub fn questions(&self) -> &[QuestionConfig] {
        &self.questions
    }

    pub fn question(&self, id: i64) -> Option<&QuestionConfig> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn required_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.questions.iter().filter(|q| q.required).map(|q| q.id)
    }

    /// First required, unanswered question after `last_question_id`.
    ///
    /// An id that is not in the list starts the walk at the first question.
    pub fn next_required(&self, last_question_id: i64, answered: &[i64]) -> Option<&QuestionConfig> {
        let start = self
            .questions
            .iter()
            .position(|q| q.id == last_question_id)
            .map(|pos| pos + 1)
            .unwrap_or(0);
        self.questions[start..]
            .iter()
            .find(|q| q.required && !answered.contains(&q.id))
    }

    /// Percentage of required questions answered; 100 when none are required.
    pub fn completion(&self, answered: &[i64]) -> f64 {
        let (total, done) = self.required_ids().fold((0usize, 0usize), |(t, d), id| {
            (t + 1, d + usize::from(answered.contains(&id)))
        });
        if total == 0 {
            100.0
        } else {
            done as f64 / total as f64 * 100.0
        }
    }

    /// True when every required question has an answer.
    pub fn all_answered(&self, answered: &[i64]) -> bool {
        self.required_ids().all(|id| answered.contains(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_config::model::WorkflowConfig;
    use proptest::prelude::*;

    fn q(id: i64, order_index: i64, required: bool) -> QuestionConfig {
        QuestionConfig {
            id,
            step: "profile".into(),
            question_text: format!("Question {id}"),
            question_type: "text".into(),
            options: Vec::new(),
            required,
            order_index,
        }
    }

    fn default_funnel() -> FunnelTracker {
        FunnelTracker::new(&WorkflowConfig::default().questions)
    }

    #[test]
    fn next_skips_answered_and_optional_questions() {
        let funnel = default_funnel();
        assert_eq!(funnel.next_required(1, &[1, 2]).map(|q| q.id), Some(3));
        assert_eq!(funnel.next_required(5, &[1, 2, 3, 4, 5]).map(|q| q.id), Some(6));
        assert!(funnel.next_required(6, &[1, 2, 3, 4, 5, 6]).is_none());
    }

    #[test]
    fn next_only_looks_after_the_last_question() {
        let funnel = default_funnel();
        assert_eq!(funnel.next_required(4, &[1]).map(|q| q.id), Some(5));
        assert!(funnel.next_required(7, &[]).is_none());
    }

    #[test]
    fn unknown_last_question_walks_from_the_start() {
        let funnel = default_funnel();
        assert_eq!(funnel.next_required(999, &[1]).map(|q| q.id), Some(2));
        assert_eq!(funnel.next_required(0, &[]).map(|q| q.id), Some(1));
    }

    #[test]
    fn walk_follows_order_index_not_id() {
        let funnel = FunnelTracker::new(&[q(10, 3, true), q(20, 1, true), q(30, 2, true)]);
        let ids: Vec<i64> = funnel.questions().iter().map(|q| q.id).collect();
        assert_eq!(ids, [20, 30, 10]);
        assert_eq!(funnel.next_required(20, &[]).map(|q| q.id), Some(30));
    }

    #[test]
    fn completion_counts_required_only() {
        let funnel = default_funnel();
        assert_eq!(funnel.completion(&[]), 0.0);
        assert_eq!(funnel.completion(&[1, 2, 3]), 50.0);
        assert_eq!(funnel.completion(&[7]), 0.0);
        assert_eq!(funnel.completion(&[1, 2, 3, 4, 5, 6]), 100.0);
        assert!(funnel.all_answered(&[1, 2, 3, 4, 5, 6]));
        assert!(!funnel.all_answered(&[1, 2, 3, 4, 5, 7]));
    }

    #[test]
    fn no_required_questions_is_vacuously_complete() {
        let funnel = FunnelTracker::new(&[q(1, 1, false)]);
        assert_eq!(funnel.completion(&[]), 100.0);
        assert!(funnel.all_answered(&[]));
        assert!(FunnelTracker::new(&[]).next_required(1, &[]).is_none());
    }

    proptest! {
        #[test]
        fn completion_is_k_over_n(n in 1usize..20, k_seed in 0usize..20) {
            let k = k_seed.min(n);
            let questions: Vec<QuestionConfig> =
                (1..=n as i64).map(|id| q(id, id, true)).collect();
            let funnel = FunnelTracker::new(&questions);
            let answered: Vec<i64> = (1..=k as i64).collect();
            let expected = k as f64 / n as f64 * 100.0;
            prop_assert!((funnel.completion(&answered) - expected).abs() < 1e-9);
        }
    }
}
