// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only answer and behavior logs.
//!
//! Every append that carries a score change applies it to the lead in the
//! same transaction as the insert.

use chrono::{DateTime, Utc};
use leadflow_core::{
    Answer, Behavior, LeadflowError, NewAnswer, NewBehavior, ScoreOutcome, TierThresholds,
};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, format_ts, map_tr_err, ts_column};
use crate::queries::leads::apply_delta_row;

/// Result of a deduplicated behavior append.
#[derive(Debug, Clone, PartialEq)]
pub enum OnceOutcome {
    /// The behavior was stored and its score applied.
    Recorded(ScoreOutcome),
    /// The session already held a behavior with this action.
    AlreadyRecorded,
    /// No lead exists for the session.
    MissingLead,
}

fn answer_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Answer> {
    Ok(Answer {
        id: row.get(0)?,
        session_id: row.get(1)?,
        question_id: row.get(2)?,
        answer_text: row.get(3)?,
        time_taken: row.get(4)?,
        score_earned: row.get(5)?,
        created_at: ts_column(row, 6)?,
    })
}

fn behavior_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Behavior> {
    Ok(Behavior {
        id: row.get(0)?,
        session_id: row.get(1)?,
        action: row.get(2)?,
        score_change: row.get(3)?,
        metadata: row.get(4)?,
        created_at: ts_column(row, 5)?,
    })
}

/// Insert a behavior row and return its id. Does not touch the score.
pub(crate) fn insert_behavior_row(
    conn: &rusqlite::Connection,
    behavior: &NewBehavior,
    now: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO behaviors (session_id, action, score_change, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            behavior.session_id,
            behavior.action,
            behavior.score_change,
            behavior.metadata,
            format_ts(&now),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Append an answer and apply its score. Returns `None` when the lead is missing.
pub async fn record_answer(
    db: &Database,
    answer: &NewAnswer,
    thresholds: TierThresholds,
    now: DateTime<Utc>,
) -> Result<Option<ScoreOutcome>, LeadflowError> {
    let answer = answer.clone();
    db.connection()
        .call(move |conn| -> Result<Option<ScoreOutcome>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(outcome) =
                apply_delta_row(&tx, &answer.session_id, answer.score_earned, thresholds, now)?
            else {
                return Ok(None);
            };
            tx.execute(
                "INSERT INTO answers
                     (session_id, question_id, answer_text, time_taken, score_earned, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    answer.session_id,
                    answer.question_id,
                    answer.answer_text,
                    answer.time_taken,
                    answer.score_earned,
                    format_ts(&now),
                ],
            )?;
            tx.commit()?;
            Ok(Some(outcome))
        })
        .await
        .map_err(map_tr_err)
}

/// Answers for a session in submission order.
pub async fn list_answers(db: &Database, session_id: &str) -> Result<Vec<Answer>, LeadflowError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Answer>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, question_id, answer_text, time_taken, score_earned,
                        created_at
                 FROM answers WHERE session_id = ?1 ORDER BY created_at ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![session_id], answer_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Distinct question ids answered by a session, ascending.
pub async fn answered_question_ids(
    db: &Database,
    session_id: &str,
) -> Result<Vec<i64>, LeadflowError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<i64>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT question_id FROM answers WHERE session_id = ?1
                 ORDER BY question_id ASC",
            )?;
            let rows = stmt.query_map(params![session_id], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Append a behavior and apply its score. Returns `None` when the lead is missing.
pub async fn record_behavior(
    db: &Database,
    behavior: &NewBehavior,
    thresholds: TierThresholds,
    now: DateTime<Utc>,
) -> Result<Option<ScoreOutcome>, LeadflowError> {
    let behavior = behavior.clone();
    db.connection()
        .call(move |conn| -> Result<Option<ScoreOutcome>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(outcome) = apply_delta_row(
                &tx,
                &behavior.session_id,
                behavior.score_change,
                thresholds,
                now,
            )?
            else {
                return Ok(None);
            };
            insert_behavior_row(&tx, &behavior, now)?;
            tx.commit()?;
            Ok(Some(outcome))
        })
        .await
        .map_err(map_tr_err)
}

/// Append a behavior unless the session already holds one with the same action.
///
/// The existence check and the insert share a transaction, so a one-time
/// award cannot be granted twice.
pub async fn record_behavior_once(
    db: &Database,
    behavior: &NewBehavior,
    thresholds: TierThresholds,
    now: DateTime<Utc>,
) -> Result<OnceOutcome, LeadflowError> {
    let behavior = behavior.clone();
    db.connection()
        .call(move |conn| -> Result<OnceOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;
            let seen = tx
                .query_row(
                    "SELECT 1 FROM behaviors WHERE session_id = ?1 AND action = ?2 LIMIT 1",
                    params![behavior.session_id, behavior.action],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if seen {
                return Ok(OnceOutcome::AlreadyRecorded);
            }
            let Some(outcome) = apply_delta_row(
                &tx,
                &behavior.session_id,
                behavior.score_change,
                thresholds,
                now,
            )?
            else {
                return Ok(OnceOutcome::MissingLead);
            };
            insert_behavior_row(&tx, &behavior, now)?;
            tx.commit()?;
            Ok(OnceOutcome::Recorded(outcome))
        })
        .await
        .map_err(map_tr_err)
}

const BEHAVIOR_COLUMNS: &str = "id, session_id, action, score_change, metadata, created_at";

/// Behaviors for one session in log order.
pub async fn list_behaviors(
    db: &Database,
    session_id: &str,
) -> Result<Vec<Behavior>, LeadflowError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Behavior>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BEHAVIOR_COLUMNS} FROM behaviors WHERE session_id = ?1
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![session_id], behavior_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Behaviors across all sessions with the given action, in log order.
pub async fn list_behaviors_by_action(
    db: &Database,
    action: &str,
) -> Result<Vec<Behavior>, LeadflowError> {
    let action = action.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Behavior>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BEHAVIOR_COLUMNS} FROM behaviors WHERE action = ?1
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![action], behavior_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::leads::get_lead;
    use crate::queries::test_support::{at, seed_lead, setup_db};

    fn behavior(session_id: &str, action: &str, delta: i64) -> NewBehavior {
        NewBehavior {
            session_id: session_id.into(),
            action: action.into(),
            score_change: delta,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn answer_is_logged_with_its_score() {
        let (db, _dir) = setup_db().await;
        seed_lead(&db, "s1").await;
        let answer = NewAnswer {
            session_id: "s1".into(),
            question_id: 2,
            answer_text: "Restaurant".into(),
            time_taken: Some(4.5),
            score_earned: 10,
        };
        let outcome = record_answer(&db, &answer, TierThresholds::default(), at(3))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.lead.score, 15);

        let answers = list_answers(&db, "s1").await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].question_id, 2);
        assert_eq!(answers[0].time_taken, Some(4.5));
        assert_eq!(answers[0].created_at, at(3));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn answer_for_missing_lead_writes_nothing() {
        let (db, _dir) = setup_db().await;
        let answer = NewAnswer {
            session_id: "ghost".into(),
            question_id: 1,
            answer_text: "x".into(),
            time_taken: None,
            score_earned: 5,
        };
        let outcome = record_answer(&db, &answer, TierThresholds::default(), at(0))
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert!(list_answers(&db, "ghost").await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn answered_ids_are_distinct() {
        let (db, _dir) = setup_db().await;
        seed_lead(&db, "s1").await;
        for qid in [3, 1, 3] {
            let answer = NewAnswer {
                session_id: "s1".into(),
                question_id: qid,
                answer_text: "ok".into(),
                time_taken: None,
                score_earned: 5,
            };
            record_answer(&db, &answer, TierThresholds::default(), at(qid))
                .await
                .unwrap();
        }
        assert_eq!(answered_question_ids(&db, "s1").await.unwrap(), vec![1, 3]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn behaviors_accumulate_in_order() {
        let (db, _dir) = setup_db().await;
        seed_lead(&db, "s1").await;
        let t = TierThresholds::default();
        record_behavior(&db, &behavior("s1", "clicked_pricing", 10), t, at(1))
            .await
            .unwrap();
        record_behavior(&db, &behavior("s1", "clicked_demo", 15), t, at(2))
            .await
            .unwrap();

        let logged = list_behaviors(&db, "s1").await.unwrap();
        let actions: Vec<&str> = logged.iter().map(|b| b.action.as_str()).collect();
        assert_eq!(actions, ["session_opened", "clicked_pricing", "clicked_demo"]);
        assert_eq!(get_lead(&db, "s1").await.unwrap().unwrap().score, 30);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn once_behavior_is_awarded_a_single_time() {
        let (db, _dir) = setup_db().await;
        seed_lead(&db, "s1").await;
        let t = TierThresholds::default();
        let award = behavior("s1", "answered_all_questions", 10);

        let first = record_behavior_once(&db, &award, t, at(1)).await.unwrap();
        assert!(matches!(first, OnceOutcome::Recorded(ref o) if o.lead.score == 15));
        let second = record_behavior_once(&db, &award, t, at(2)).await.unwrap();
        assert_eq!(second, OnceOutcome::AlreadyRecorded);
        assert_eq!(get_lead(&db, "s1").await.unwrap().unwrap().score, 15);

        let missing = record_behavior_once(&db, &behavior("ghost", "x", 1), t, at(3))
            .await
            .unwrap();
        assert_eq!(missing, OnceOutcome::MissingLead);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn behaviors_can_be_listed_by_action() {
        let (db, _dir) = setup_db().await;
        seed_lead(&db, "s1").await;
        seed_lead(&db, "s2").await;
        let t = TierThresholds::default();
        let mut assignment = behavior("s2", "ab_test_assignment", 0);
        assignment.metadata = Some(r#"{"test_name":"cta_presentation","variant":"B"}"#.into());
        record_behavior(&db, &assignment, t, at(1)).await.unwrap();

        let found = list_behaviors_by_action(&db, "ab_test_assignment")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].session_id, "s2");
        assert_eq!(found[0].parsed_metadata().unwrap().unwrap()["variant"], "B");
        assert_eq!(
            list_behaviors_by_action(&db, "session_opened")
                .await
                .unwrap()
                .len(),
            2
        );
        db.close().await.unwrap();
    }
}
