// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead CRUD, score mutation, and customer id issuance.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use leadflow_core::{
    Lead, LeadProfile, LeadflowError, NewBehavior, ProfileUpdate, QualificationTier,
    ScoreOutcome, TierThresholds,
};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, conversion_err, format_ts, map_tr_err, ts_column};
use crate::queries::events::insert_behavior_row;
use crate::queries::readable_rows;

const LEAD_COLUMNS: &str = "session_id, customer_id, utm_source, score, tier, name, email, \
     phone, business_type, location, staff_size, monthly_sales, features_interested, \
     cif_completed, created_at, updated_at";

pub(crate) fn lead_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lead> {
    let tier: String = row.get(4)?;
    let features: String = row.get(12)?;
    Ok(Lead {
        session_id: row.get(0)?,
        customer_id: row.get(1)?,
        utm_source: row.get(2)?,
        score: row.get(3)?,
        tier: QualificationTier::from_str(&tier).map_err(|e| conversion_err(4, e))?,
        profile: LeadProfile {
            name: row.get(5)?,
            email: row.get(6)?,
            phone: row.get(7)?,
            business_type: row.get(8)?,
            location: row.get(9)?,
            staff_size: row.get(10)?,
            monthly_sales: row.get(11)?,
            features_interested: serde_json::from_str(&features)
                .map_err(|e| conversion_err(12, e))?,
        },
        cif_completed: row.get(13)?,
        created_at: ts_column(row, 14)?,
        updated_at: ts_column(row, 15)?,
    })
}

/// Load a lead on the database thread.
pub(crate) fn load_lead(
    conn: &rusqlite::Connection,
    session_id: &str,
) -> rusqlite::Result<Option<Lead>> {
    conn.query_row(
        &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE session_id = ?1"),
        params![session_id],
        lead_from_row,
    )
    .optional()
}

/// Add `delta` to a lead's score and store the re-derived tier.
///
/// Must run inside the caller's transaction so the read and the write see
/// the same row.
pub(crate) fn apply_delta_row(
    conn: &rusqlite::Connection,
    session_id: &str,
    delta: i64,
    thresholds: TierThresholds,
    now: DateTime<Utc>,
) -> rusqlite::Result<Option<ScoreOutcome>> {
    let Some(mut lead) = load_lead(conn, session_id)? else {
        return Ok(None);
    };
    let previous_tier = lead.tier;
    lead.score += delta;
    lead.reclassify(&thresholds);
    lead.updated_at = now;
    conn.execute(
        "UPDATE leads SET score = ?1, tier = ?2, updated_at = ?3 WHERE session_id = ?4",
        params![
            lead.score,
            lead.tier.to_string(),
            format_ts(&now),
            session_id
        ],
    )?;
    Ok(Some(ScoreOutcome {
        lead,
        previous_tier,
        score_change: delta,
    }))
}

/// Insert a new lead and apply its opening behavior.
///
/// Returns `None` when the session already has a lead.
pub async fn create_lead(
    db: &Database,
    session_id: &str,
    utm_source: &str,
    opening: &NewBehavior,
    thresholds: TierThresholds,
    now: DateTime<Utc>,
) -> Result<Option<ScoreOutcome>, LeadflowError> {
    let session_id = session_id.to_string();
    let utm_source = utm_source.to_string();
    let opening = opening.clone();
    db.connection()
        .call(move |conn| -> Result<Option<ScoreOutcome>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let exists = tx
                .query_row(
                    "SELECT 1 FROM leads WHERE session_id = ?1",
                    params![session_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if exists {
                return Ok(None);
            }

            let stamp = format_ts(&now);
            tx.execute(
                "INSERT INTO leads (session_id, utm_source, score, tier, created_at, updated_at)
                 VALUES (?1, ?2, 0, ?3, ?4, ?4)",
                params![
                    session_id,
                    utm_source,
                    thresholds.classify(0).to_string(),
                    stamp
                ],
            )?;
            insert_behavior_row(&tx, &opening, now)?;
            let outcome =
                apply_delta_row(&tx, &session_id, opening.score_change, thresholds, now)?;
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a lead by session id.
pub async fn get_lead(db: &Database, session_id: &str) -> Result<Option<Lead>, LeadflowError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Lead>, rusqlite::Error> {
            load_lead(conn, &session_id)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a lead by its issued customer id.
pub async fn get_lead_by_customer_id(
    db: &Database,
    customer_id: &str,
) -> Result<Option<Lead>, LeadflowError> {
    let customer_id = customer_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Lead>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE customer_id = ?1"),
                params![customer_id],
                lead_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List every lead, oldest first. Rows that fail to decode are skipped.
pub async fn list_leads(db: &Database) -> Result<Vec<Lead>, LeadflowError> {
    db.connection()
        .call(|conn| -> Result<Vec<Lead>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEAD_COLUMNS} FROM leads ORDER BY created_at ASC, session_id ASC"
            ))?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, lead_from_row(row)))
            })?;
            readable_rows("leads", rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Merge `update` into the stored profile.
pub async fn update_profile(
    db: &Database,
    session_id: &str,
    update: &ProfileUpdate,
    now: DateTime<Utc>,
) -> Result<Option<Lead>, LeadflowError> {
    let session_id = session_id.to_string();
    let update = update.clone();
    db.connection()
        .call(move |conn| -> Result<Option<Lead>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(mut lead) = load_lead(&tx, &session_id)? else {
                return Ok(None);
            };
            update.apply(&mut lead.profile);
            lead.updated_at = now;
            let p = &lead.profile;
            let features = serde_json::to_string(&p.features_interested)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            tx.execute(
                "UPDATE leads SET name = ?1, email = ?2, phone = ?3, business_type = ?4,
                     location = ?5, staff_size = ?6, monthly_sales = ?7,
                     features_interested = ?8, updated_at = ?9
                 WHERE session_id = ?10",
                params![
                    p.name,
                    p.email,
                    p.phone,
                    p.business_type,
                    p.location,
                    p.staff_size,
                    p.monthly_sales,
                    features,
                    format_ts(&now),
                    session_id,
                ],
            )?;
            tx.commit()?;
            Ok(Some(lead))
        })
        .await
        .map_err(map_tr_err)
}

/// Add `delta` to the score and re-derive the tier in one transaction.
pub async fn apply_score_delta(
    db: &Database,
    session_id: &str,
    delta: i64,
    thresholds: TierThresholds,
    now: DateTime<Utc>,
) -> Result<Option<ScoreOutcome>, LeadflowError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ScoreOutcome>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let outcome = apply_delta_row(&tx, &session_id, delta, thresholds, now)?;
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

/// Issue the next `CID_YYYYMMDD_NNNN` id for the lead, or return its existing one.
///
/// The day counter and the lead row are updated in the same transaction, so
/// two sessions can never share a sequence number.
pub async fn assign_customer_id(
    db: &Database,
    session_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>, LeadflowError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(lead) = load_lead(&tx, &session_id)? else {
                return Ok(None);
            };
            if let Some(existing) = lead.customer_id {
                return Ok(Some(existing));
            }

            let day = now.format("%Y%m%d").to_string();
            let seq: i64 = tx.query_row(
                "INSERT INTO customer_id_sequences (day, last_seq) VALUES (?1, 1)
                 ON CONFLICT(day) DO UPDATE SET last_seq = last_seq + 1
                 RETURNING last_seq",
                params![day],
                |row| row.get(0),
            )?;
            let customer_id = format!("CID_{day}_{seq:04}");
            tx.execute(
                "UPDATE leads SET customer_id = ?1, updated_at = ?2 WHERE session_id = ?3",
                params![customer_id, format_ts(&now), session_id],
            )?;
            tx.commit()?;
            Ok(Some(customer_id))
        })
        .await
        .map_err(map_tr_err)
}
