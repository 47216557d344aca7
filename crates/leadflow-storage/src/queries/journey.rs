// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Page visits and session exits.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use leadflow_core::{
    ExitReason, LeadflowError, NewPageVisit, NewSessionExit, PageVisit, SessionExit,
};
use rusqlite::{OptionalExtension, params};

use crate::database::{
    Database, conversion_err, format_ts, map_tr_err, opt_ts_column, ts_column,
};
use crate::queries::leads::load_lead;
use crate::queries::readable_rows;

const VISIT_COLUMNS: &str = "id, session_id, customer_id, page_identifier, question_id, \
     page_type, entry_time, exit_time, time_spent, metadata";

fn visit_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PageVisit> {
    Ok(PageVisit {
        id: row.get(0)?,
        session_id: row.get(1)?,
        customer_id: row.get(2)?,
        page_identifier: row.get(3)?,
        question_id: row.get(4)?,
        page_type: row.get(5)?,
        entry_time: ts_column(row, 6)?,
        exit_time: opt_ts_column(row, 7)?,
        time_spent: row.get(8)?,
        metadata: row.get(9)?,
    })
}

fn exit_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionExit> {
    let reason: String = row.get(3)?;
    Ok(SessionExit {
        id: row.get(0)?,
        session_id: row.get(1)?,
        customer_id: row.get(2)?,
        exit_reason: ExitReason::from_str(&reason).map_err(|e| conversion_err(3, e))?,
        exit_question_id: row.get(4)?,
        exit_page: row.get(5)?,
        completion_percentage: row.get(6)?,
        last_action: row.get(7)?,
        metadata: row.get(8)?,
        created_at: ts_column(row, 9)?,
    })
}

/// Open a page visit stamped with the session's customer id.
///
/// Returns `None` when the session has no lead.
pub async fn insert_page_visit(
    db: &Database,
    visit: &NewPageVisit,
    now: DateTime<Utc>,
) -> Result<Option<PageVisit>, LeadflowError> {
    let visit = visit.clone();
    db.connection()
        .call(move |conn| -> Result<Option<PageVisit>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(lead) = load_lead(&tx, &visit.session_id)? else {
                return Ok(None);
            };
            tx.execute(
                "INSERT INTO page_visits
                     (session_id, customer_id, page_identifier, question_id, page_type,
                      entry_time, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    visit.session_id,
                    lead.customer_id,
                    visit.page_identifier,
                    visit.question_id,
                    visit.page_type,
                    format_ts(&now),
                    visit.metadata,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(Some(PageVisit {
                id,
                session_id: visit.session_id,
                customer_id: lead.customer_id,
                page_identifier: visit.page_identifier,
                question_id: visit.question_id,
                page_type: visit.page_type,
                entry_time: now,
                exit_time: None,
                time_spent: None,
                metadata: visit.metadata,
            }))
        })
        .await
        .map_err(map_tr_err)
}

/// Close a visit, computing whole seconds spent (never negative).
///
/// A visit that is already closed is returned as stored; the first exit wins.
pub async fn close_page_visit(
    db: &Database,
    visit_id: i64,
    exit_time: DateTime<Utc>,
) -> Result<Option<PageVisit>, LeadflowError> {
    db.connection()
        .call(move |conn| -> Result<Option<PageVisit>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(mut visit) = tx
                .query_row(
                    &format!("SELECT {VISIT_COLUMNS} FROM page_visits WHERE id = ?1"),
                    params![visit_id],
                    visit_from_row,
                )
                .optional()?
            else {
                return Ok(None);
            };
            if !visit.is_open() {
                return Ok(Some(visit));
            }

            let spent = (exit_time - visit.entry_time).num_seconds().max(0);
            tx.execute(
                "UPDATE page_visits SET exit_time = ?1, time_spent = ?2
                 WHERE id = ?3 AND exit_time IS NULL",
                params![format_ts(&exit_time), spent, visit_id],
            )?;
            tx.commit()?;
            visit.exit_time = Some(exit_time);
            visit.time_spent = Some(spent);
            Ok(Some(visit))
        })
        .await
        .map_err(map_tr_err)
}

/// Visits for one session ordered by entry time, then id.
pub async fn list_page_visits(
    db: &Database,
    session_id: &str,
) -> Result<Vec<PageVisit>, LeadflowError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<PageVisit>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VISIT_COLUMNS} FROM page_visits WHERE session_id = ?1
                 ORDER BY entry_time ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![session_id], visit_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Every visit ordered by session, entry time, then id.
///
/// Rows that fail to decode are skipped.
pub async fn list_all_page_visits(db: &Database) -> Result<Vec<PageVisit>, LeadflowError> {
    db.connection()
        .call(|conn| -> Result<Vec<PageVisit>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VISIT_COLUMNS} FROM page_visits
                 ORDER BY session_id ASC, entry_time ASC, id ASC"
            ))?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, visit_from_row(row)))
            })?;
            readable_rows("page_visits", rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Record why and where a session ended.
pub async fn insert_session_exit(
    db: &Database,
    exit: &NewSessionExit,
    now: DateTime<Utc>,
) -> Result<SessionExit, LeadflowError> {
    let exit = exit.clone();
    db.connection()
        .call(move |conn| -> Result<SessionExit, rusqlite::Error> {
            conn.execute(
                "INSERT INTO session_exits
                     (session_id, customer_id, exit_reason, exit_question_id, exit_page,
                      completion_percentage, last_action, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    exit.session_id,
                    exit.customer_id,
                    exit.exit_reason.to_string(),
                    exit.exit_question_id,
                    exit.exit_page,
                    exit.completion_percentage,
                    exit.last_action,
                    exit.metadata,
                    format_ts(&now),
                ],
            )?;
            Ok(SessionExit {
                id: conn.last_insert_rowid(),
                session_id: exit.session_id,
                customer_id: exit.customer_id,
                exit_reason: exit.exit_reason,
                exit_question_id: exit.exit_question_id,
                exit_page: exit.exit_page,
                completion_percentage: exit.completion_percentage,
                last_action: exit.last_action,
                metadata: exit.metadata,
                created_at: now,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Every recorded exit, oldest first. Rows that fail to decode are skipped.
pub async fn list_session_exits(db: &Database) -> Result<Vec<SessionExit>, LeadflowError> {
    db.connection()
        .call(|conn| -> Result<Vec<SessionExit>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, customer_id, exit_reason, exit_question_id, exit_page,
                        completion_percentage, last_action, metadata, created_at
                 FROM session_exits ORDER BY created_at ASC, id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, exit_from_row(row)))
            })?;
            readable_rows("session_exits", rows)
        })
        .await
        .map_err(map_tr_err)
}
