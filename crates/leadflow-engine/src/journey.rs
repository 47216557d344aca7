// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer journey aggregation over page visits.
//!
//! Journeys are snapshot reads ordered by entry time with the visit id as
//! tie-breaker. Dwell time is fixed at the first exit and never recomputed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use leadflow_core::{LeadflowError, NewPageVisit, PageVisit};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use tracing::debug;

use crate::engine::{Engine, require, round2};
use crate::recording;

/// Page type that marks the end of the funnel.
pub const COMPLETION_PAGE: &str = "completion";

/// Which key a visual journey is looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IdType {
    #[default]
    Session,
    Customer,
}

/// Optional fields of a page entry.
#[derive(Debug, Clone, Default)]
pub struct PageEntry {
    pub question_id: Option<i64>,
    pub page_type: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JourneyStats {
    pub total_pages_visited: usize,
    pub total_time_spent: i64,
    /// `completed` once a completion page was visited, else `in_progress`.
    pub completion_status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerJourney {
    pub customer_id: String,
    pub session_id: String,
    pub journey: Vec<PageVisit>,
    pub summary: JourneyStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisualStep {
    pub step: usize,
    pub page_identifier: String,
    pub page_name: String,
    pub page_type: Option<String>,
    pub question_id: Option<i64>,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub time_spent: Option<i64>,
    pub time_spent_formatted: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisualStats {
    pub total_pages: usize,
    pub total_time_spent: i64,
    pub total_time_formatted: String,
    /// Closed visits over all visits, e.g. `"50.0%"`.
    pub completion_rate: String,
    pub average_time_per_page: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisualJourney {
    pub identifier: String,
    pub id_type: IdType,
    pub session_id: String,
    pub visual_journey: Vec<VisualStep>,
    pub statistics: VisualStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagePerformance {
    pub page_identifier: String,
    pub visits: usize,
    pub completed_visits: usize,
    /// Mean over closed visits only; 0 when none are closed.
    pub average_time_spent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionJourney {
    pub session_id: String,
    pub customer_id: Option<String>,
    pub journey: Vec<PageVisit>,
}

impl Engine {
    /// Open a page visit for the session.
    pub async fn log_page_entry(
        &self,
        session_id: &str,
        page_identifier: &str,
        entry: PageEntry,
    ) -> Result<PageVisit, LeadflowError> {
        require("session_id", session_id)?;
        require("page_identifier", page_identifier)?;
        let visit = NewPageVisit {
            session_id: session_id.to_string(),
            page_identifier: page_identifier.to_string(),
            question_id: entry.question_id,
            page_type: entry.page_type,
            metadata: entry.metadata.map(|m| m.to_string()),
        };
        let stored = self.store.insert_page_visit(&visit, self.now()).await?;
        debug!(session_id, page_identifier, visit_id = stored.id, "page entered");
        recording::record_page_entry();
        Ok(stored)
    }

    /// Close a page visit at `exit_time`, or now.
    ///
    /// Exiting an already closed visit returns it unchanged.
    pub async fn log_page_exit(
        &self,
        visit_id: i64,
        exit_time: Option<DateTime<Utc>>,
    ) -> Result<PageVisit, LeadflowError> {
        let exit_time = exit_time.unwrap_or_else(|| self.now());
        let visit = self
            .store
            .close_page_visit(visit_id, exit_time)
            .await?
            .ok_or_else(|| LeadflowError::NotFound {
                entity: "page visit",
                key: visit_id.to_string(),
            })?;
        if visit.exit_time == Some(exit_time)
            && let Some(secs) = visit.time_spent
        {
            recording::record_page_exit(secs);
        }
        debug!(visit_id, time_spent = ?visit.time_spent, "page exited");
        Ok(visit)
    }

    /// Ordered page visits for a session.
    pub async fn get_journey(&self, session_id: &str) -> Result<Vec<PageVisit>, LeadflowError> {
        self.lead(session_id).await?;
        self.store.list_page_visits(session_id).await
    }

    /// Journey for a customer id plus summary statistics.
    pub async fn get_journey_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<CustomerJourney, LeadflowError> {
        let session_id = self.session_for_customer(customer_id).await?;
        let journey = self.store.list_page_visits(&session_id).await?;
        let completed = journey
            .iter()
            .any(|v| v.page_type.as_deref() == Some(COMPLETION_PAGE));
        let summary = JourneyStats {
            total_pages_visited: journey.len(),
            total_time_spent: total_time(&journey),
            completion_status: if completed { "completed" } else { "in_progress" }.to_string(),
        };
        Ok(CustomerJourney {
            customer_id: customer_id.to_string(),
            session_id,
            journey,
            summary,
        })
    }

    /// Step-numbered presentation of a journey.
    pub async fn visual_journey(
        &self,
        identifier: &str,
        id_type: IdType,
    ) -> Result<VisualJourney, LeadflowError> {
        let session_id = match id_type {
            IdType::Session => {
                self.lead(identifier).await?;
                identifier.to_string()
            }
            IdType::Customer => self.session_for_customer(identifier).await?,
        };
        let journey = self.store.list_page_visits(&session_id).await?;
        Ok(VisualJourney {
            identifier: identifier.to_string(),
            id_type,
            session_id,
            statistics: visual_stats(&journey),
            visual_journey: journey
                .into_iter()
                .enumerate()
                .map(|(i, visit)| visual_step(i + 1, visit))
                .collect(),
        })
    }

    /// Per-page visit counts and mean dwell time, most visited first.
    pub async fn page_performance(&self) -> Result<Vec<PagePerformance>, LeadflowError> {
        let visits = self.store.list_all_page_visits().await?;
        Ok(page_performance(&visits))
    }

    /// Ordered journey for every session with at least one visit.
    pub async fn all_customer_journeys(&self) -> Result<Vec<SessionJourney>, LeadflowError> {
        let visits = self.store.list_all_page_visits().await?;
        let mut journeys: Vec<SessionJourney> = Vec::new();
        for visit in visits {
            match journeys.last_mut() {
                Some(current) if current.session_id == visit.session_id => {
                    if current.customer_id.is_none() {
                        current.customer_id = visit.customer_id.clone();
                    }
                    current.journey.push(visit);
                }
                _ => journeys.push(SessionJourney {
                    session_id: visit.session_id.clone(),
                    customer_id: visit.customer_id.clone(),
                    journey: vec![visit],
                }),
            }
        }
        Ok(journeys)
    }

    async fn session_for_customer(&self, customer_id: &str) -> Result<String, LeadflowError> {
        require("customer_id", customer_id)?;
        self.store
            .get_lead_by_customer_id(customer_id)
            .await?
            .map(|lead| lead.session_id)
            .ok_or_else(|| LeadflowError::NotFound {
                entity: "customer",
                key: customer_id.to_string(),
            })
    }
}

fn total_time(journey: &[PageVisit]) -> i64 {
    journey.iter().filter_map(|v| v.time_spent).sum()
}

fn visual_step(step: usize, visit: PageVisit) -> VisualStep {
    let (status, formatted) = match visit.time_spent {
        Some(secs) if !visit.is_open() => ("completed", format_duration(secs)),
        _ => ("current", "in progress".to_string()),
    };
    VisualStep {
        step,
        page_name: page_name(&visit.page_identifier),
        page_identifier: visit.page_identifier,
        page_type: visit.page_type,
        question_id: visit.question_id,
        entry_time: visit.entry_time,
        exit_time: visit.exit_time,
        time_spent: visit.time_spent,
        time_spent_formatted: formatted,
        status: status.to_string(),
    }
}

fn visual_stats(journey: &[PageVisit]) -> VisualStats {
    let total_pages = journey.len();
    let total_time_spent = total_time(journey);
    let closed = journey.iter().filter(|v| !v.is_open()).count();
    let (rate, average) = if total_pages == 0 {
        (0.0, 0.0)
    } else {
        (
            closed as f64 / total_pages as f64 * 100.0,
            total_time_spent as f64 / total_pages as f64,
        )
    };
    VisualStats {
        total_pages,
        total_time_spent,
        total_time_formatted: format_duration(total_time_spent),
        completion_rate: format!("{rate:.1}%"),
        average_time_per_page: round2(average),
    }
}

pub(crate) fn page_performance(visits: &[PageVisit]) -> Vec<PagePerformance> {
    // (visits, closed, seconds)
    let mut pages: BTreeMap<&str, (usize, usize, i64)> = BTreeMap::new();
    for visit in visits {
        let entry = pages.entry(visit.page_identifier.as_str()).or_default();
        entry.0 += 1;
        if let Some(secs) = visit.time_spent {
            entry.1 += 1;
            entry.2 += secs;
        }
    }
    let mut out: Vec<PagePerformance> = pages
        .into_iter()
        .map(|(page, (visits, closed, secs))| PagePerformance {
            page_identifier: page.to_string(),
            visits,
            completed_visits: closed,
            average_time_spent: if closed == 0 {
                0.0
            } else {
                round2(secs as f64 / closed as f64)
            },
        })
        .collect();
    out.sort_by(|a, b| b.visits.cmp(&a.visits));
    out
}

/// `q1_business_type` becomes `Q1 Business Type`.
fn page_name(identifier: &str) -> String {
    identifier
        .split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Seconds as `45s` or `2m 5s`.
fn format_duration(secs: i64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
