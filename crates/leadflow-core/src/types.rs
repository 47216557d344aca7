// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the storage, engine, and gateway crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter plugged into the engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Notifier,
    Observability,
}

// --- Qualification ---

/// Lead qualification tier derived from the cumulative score.
///
/// Ordering follows qualification strength, so `SalesQualified` is the maximum.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
pub enum QualificationTier {
    #[strum(serialize = "Unqualified")]
    #[serde(rename = "Unqualified")]
    Unqualified,
    #[strum(serialize = "MQL")]
    #[serde(rename = "MQL")]
    MarketingQualified,
    #[strum(serialize = "SQL")]
    #[serde(rename = "SQL")]
    SalesQualified,
}

/// Inclusive lower bounds for the qualified tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierThresholds {
    /// Minimum score for a sales-qualified lead.
    #[serde(default = "default_sql_threshold")]
    pub sql: i64,
    /// Minimum score for a marketing-qualified lead.
    #[serde(default = "default_mql_threshold")]
    pub mql: i64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            sql: default_sql_threshold(),
            mql: default_mql_threshold(),
        }
    }
}

fn default_sql_threshold() -> i64 {
    60
}

fn default_mql_threshold() -> i64 {
    30
}

impl TierThresholds {
    /// Classify a cumulative score, checking the highest tier first.
    pub fn classify(&self, score: i64) -> QualificationTier {
        if score >= self.sql {
            QualificationTier::SalesQualified
        } else if score >= self.mql {
            QualificationTier::MarketingQualified
        } else {
            QualificationTier::Unqualified
        }
    }
}

// --- Leads ---

/// Profile attributes captured during the conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub business_type: Option<String>,
    pub location: Option<String>,
    pub staff_size: Option<String>,
    pub monthly_sales: Option<String>,
    /// Ordered set of feature tags; first-seen order is kept.
    #[serde(default)]
    pub features_interested: Vec<String>,
}

impl LeadProfile {
    /// Preferred contact handle: phone first, then email.
    pub fn contact_info(&self) -> Option<&str> {
        self.phone
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| self.email.as_deref().filter(|e| !e.trim().is_empty()))
    }
}

/// A partial profile update. Keys not listed here are ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub staff_size: Option<String>,
    #[serde(default)]
    pub monthly_sales: Option<String>,
    #[serde(default)]
    pub features_interested: Option<Vec<String>>,
}

impl ProfileUpdate {
    /// Returns true when no recognised field is present.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the supplied fields into `profile`.
    ///
    /// `features_interested` replaces the stored set after collapsing duplicates.
    pub fn apply(&self, profile: &mut LeadProfile) {
        let fields = [
            (&self.name, &mut profile.name),
            (&self.email, &mut profile.email),
            (&self.phone, &mut profile.phone),
            (&self.business_type, &mut profile.business_type),
            (&self.location, &mut profile.location),
            (&self.staff_size, &mut profile.staff_size),
            (&self.monthly_sales, &mut profile.monthly_sales),
        ];
        for (update, slot) in fields {
            if let Some(value) = update {
                *slot = Some(value.clone());
            }
        }
        if let Some(features) = &self.features_interested {
            profile.features_interested = ordered_unique(features.iter().cloned());
        }
    }
}

/// Collapse duplicates while keeping first-seen order.
pub fn ordered_unique(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// The qualification aggregate for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub session_id: String,
    pub customer_id: Option<String>,
    pub utm_source: String,
    pub score: i64,
    pub tier: QualificationTier,
    pub profile: LeadProfile,
    pub cif_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Re-derive the tier from the current score.
    pub fn reclassify(&mut self, thresholds: &TierThresholds) {
        self.tier = thresholds.classify(self.score);
    }
}

/// Result of a single atomic score mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    /// Lead state after the mutation was committed.
    pub lead: Lead,
    /// Tier the lead held before the mutation.
    pub previous_tier: QualificationTier,
    /// Delta that was applied.
    pub score_change: i64,
}

impl ScoreOutcome {
    /// True when this mutation moved the lead from a lower tier into `tier`.
    pub fn entered(&self, tier: QualificationTier) -> bool {
        self.previous_tier < tier && self.lead.tier == tier
    }
}

// --- Answers and behaviors ---

/// Immutable record of one answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub session_id: String,
    pub question_id: i64,
    pub answer_text: String,
    /// Seconds the visitor took to answer.
    pub time_taken: Option<f64>,
    pub score_earned: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAnswer {
    pub session_id: String,
    pub question_id: i64,
    pub answer_text: String,
    pub time_taken: Option<f64>,
    pub score_earned: i64,
}

/// Immutable record of a named action. Meta actions carry a zero delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Behavior {
    pub id: i64,
    pub session_id: String,
    pub action: String,
    pub score_change: i64,
    /// Raw JSON metadata as stored.
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Behavior {
    /// Parse the stored metadata blob. Historical rows may hold invalid JSON.
    pub fn parsed_metadata(&self) -> Result<Option<Value>, serde_json::Error> {
        self.metadata
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBehavior {
    pub session_id: String,
    pub action: String,
    pub score_change: i64,
    pub metadata: Option<String>,
}

// --- Journey ---

/// One page view; open until an exit is logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageVisit {
    pub id: i64,
    pub session_id: String,
    pub customer_id: Option<String>,
    pub page_identifier: String,
    pub question_id: Option<i64>,
    pub page_type: Option<String>,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    /// Whole seconds between entry and exit; set once.
    pub time_spent: Option<i64>,
    pub metadata: Option<String>,
}

impl PageVisit {
    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPageVisit {
    pub session_id: String,
    pub page_identifier: String,
    pub question_id: Option<i64>,
    pub page_type: Option<String>,
    pub metadata: Option<String>,
}

/// Why a session ended.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Completed,
    Abandoned,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExit {
    pub id: i64,
    pub session_id: String,
    pub customer_id: Option<String>,
    pub exit_reason: ExitReason,
    pub exit_question_id: Option<i64>,
    pub exit_page: Option<String>,
    /// Funnel completion at the moment of exit.
    pub completion_percentage: f64,
    pub last_action: Option<String>,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSessionExit {
    pub session_id: String,
    pub customer_id: Option<String>,
    pub exit_reason: ExitReason,
    pub exit_question_id: Option<i64>,
    pub exit_page: Option<String>,
    pub completion_percentage: f64,
    pub last_action: Option<String>,
    pub metadata: Option<String>,
}

// --- Customer information form ---

/// Extended profile captured after qualification, keyed by customer id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerForm {
    pub id: i64,
    pub customer_id: String,
    pub session_id: String,
    /// Section name to field map.
    pub form_data: Value,
    pub completion_percentage: f64,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A change to a form's nested data.
#[derive(Debug, Clone, PartialEq)]
pub struct FormEdit {
    pub data: Map<String, Value>,
    /// When set, only this section is merged; otherwise the data replaces the form.
    pub section: Option<String>,
}

impl FormEdit {
    /// Apply the edit to stored form data in place.
    pub fn apply(&self, form_data: &mut Value) {
        match &self.section {
            Some(section) => {
                if !form_data.is_object() {
                    *form_data = Value::Object(Map::new());
                }
                if let Value::Object(sections) = form_data {
                    let entry = sections
                        .entry(section.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if !entry.is_object() {
                        *entry = Value::Object(Map::new());
                    }
                    if let Value::Object(fields) = entry {
                        for (key, value) in &self.data {
                            fields.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            None => *form_data = Value::Object(self.data.clone()),
        }
    }
}

/// Outcome of a committed form update.
#[derive(Debug, Clone, PartialEq)]
pub struct FormUpdate {
    pub form: CustomerForm,
    /// True only on the update that first reached full completion.
    pub newly_completed: bool,
}
