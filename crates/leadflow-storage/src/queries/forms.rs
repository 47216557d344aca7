// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer information forms.

use chrono::{DateTime, Utc};
use leadflow_core::{CompletionFn, CustomerForm, FormEdit, FormUpdate, LeadflowError};
use rusqlite::{OptionalExtension, params};
use serde_json::Value;

use crate::database::{
    Database, conversion_err, format_ts, map_tr_err, opt_ts_column, ts_column,
};
use crate::queries::readable_rows;

const FORM_COLUMNS: &str = "id, customer_id, session_id, form_data, completion_percentage, \
     completed_at, created_at, updated_at";

fn form_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CustomerForm> {
    let data: String = row.get(3)?;
    Ok(CustomerForm {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        session_id: row.get(2)?,
        form_data: serde_json::from_str(&data).map_err(|e| conversion_err(3, e))?,
        completion_percentage: row.get(4)?,
        completed_at: opt_ts_column(row, 5)?,
        created_at: ts_column(row, 6)?,
        updated_at: ts_column(row, 7)?,
    })
}

fn load_form(
    conn: &rusqlite::Connection,
    customer_id: &str,
) -> rusqlite::Result<Option<CustomerForm>> {
    conn.query_row(
        &format!("SELECT {FORM_COLUMNS} FROM customer_forms WHERE customer_id = ?1"),
        params![customer_id],
        form_from_row,
    )
    .optional()
}

fn to_sql_json(value: &Value) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Create an empty form for `customer_id` unless one exists.
///
/// Returns the form and whether this call created it.
pub async fn create_form_if_absent(
    db: &Database,
    session_id: &str,
    customer_id: &str,
    now: DateTime<Utc>,
) -> Result<(CustomerForm, bool), LeadflowError> {
    let session_id = session_id.to_string();
    let customer_id = customer_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(CustomerForm, bool), rusqlite::Error> {
            let tx = conn.transaction()?;
            if let Some(existing) = load_form(&tx, &customer_id)? {
                return Ok((existing, false));
            }
            let stamp = format_ts(&now);
            tx.execute(
                "INSERT INTO customer_forms
                     (customer_id, session_id, form_data, completion_percentage, created_at,
                      updated_at)
                 VALUES (?1, ?2, '{}', 0, ?3, ?3)",
                params![customer_id, session_id, stamp],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok((
                CustomerForm {
                    id,
                    customer_id,
                    session_id,
                    form_data: Value::Object(serde_json::Map::new()),
                    completion_percentage: 0.0,
                    completed_at: None,
                    created_at: now,
                    updated_at: now,
                },
                true,
            ))
        })
        .await
        .map_err(map_tr_err)
}

/// Get the form for a customer id.
pub async fn get_form(
    db: &Database,
    customer_id: &str,
) -> Result<Option<CustomerForm>, LeadflowError> {
    let customer_id = customer_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<CustomerForm>, rusqlite::Error> {
            load_form(conn, &customer_id)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply an edit and recompute completion.
///
/// The first update that reaches 100% stamps `completed_at` and sets the
/// owning lead's `cif_completed` flag in the same transaction. Later updates
/// never clear either.
pub async fn update_form(
    db: &Database,
    customer_id: &str,
    edit: &FormEdit,
    completion: CompletionFn,
    now: DateTime<Utc>,
) -> Result<Option<FormUpdate>, LeadflowError> {
    let customer_id = customer_id.to_string();
    let edit = edit.clone();
    db.connection()
        .call(move |conn| -> Result<Option<FormUpdate>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(mut form) = load_form(&tx, &customer_id)? else {
                return Ok(None);
            };

            edit.apply(&mut form.form_data);
            form.completion_percentage = completion(&form.form_data);
            form.updated_at = now;
            let newly_completed = form.completion_percentage >= 100.0 && form.completed_at.is_none();
            if newly_completed {
                form.completed_at = Some(now);
            }

            tx.execute(
                "UPDATE customer_forms
                 SET form_data = ?1, completion_percentage = ?2, completed_at = ?3,
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    to_sql_json(&form.form_data)?,
                    form.completion_percentage,
                    form.completed_at.as_ref().map(format_ts),
                    format_ts(&now),
                    form.id,
                ],
            )?;
            if newly_completed {
                let flagged = tx.execute(
                    "UPDATE leads SET cif_completed = 1, updated_at = ?1 WHERE customer_id = ?2",
                    params![format_ts(&now), customer_id],
                )?;
                if flagged != 1 {
                    // Dropping the transaction rolls back the form update too.
                    return Err(rusqlite::Error::StatementChangedRows(flagged));
                }
            }
            tx.commit()?;
            Ok(Some(FormUpdate {
                form,
                newly_completed,
            }))
        })
        .await
        .map_err(map_tr_err)
}

/// Every form, oldest first. Rows that fail to decode are skipped.
pub async fn list_forms(db: &Database) -> Result<Vec<CustomerForm>, LeadflowError> {
    db.connection()
        .call(|conn| -> Result<Vec<CustomerForm>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FORM_COLUMNS} FROM customer_forms ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, form_from_row(row)))
            })?;
            readable_rows("customer_forms", rows)
        })
        .await
        .map_err(map_tr_err)
}
