// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session/lead aggregate operations and their read projections.

use chrono::{DateTime, Utc};
use leadflow_core::{
    Behavior, CustomerForm, Lead, LeadflowError, NewBehavior, PageVisit, ProfileUpdate,
    QualificationTier,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::engine::{Engine, require};
use crate::recording;

/// Behavior applied to every new lead.
pub const SESSION_OPENED: &str = "session_opened";

/// Read projection of a lead. The tier is re-derived from the score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadSummary {
    pub session_id: String,
    pub customer_id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub business_type: Option<String>,
    pub staff_size: Option<String>,
    pub monthly_sales: Option<String>,
    pub features_interested: Vec<String>,
    pub contact_info: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub lead_score: i64,
    pub lead_type: QualificationTier,
    pub utm_source: String,
    pub cif_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Score and tier only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurrentScore {
    pub lead_score: i64,
    pub lead_type: QualificationTier,
}

/// Result of logging a behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BehaviorLogged {
    pub score_change: i64,
    pub lead_score: i64,
    pub lead_type: QualificationTier,
}

/// Flat lead record in the shape the CRM import expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrmExport {
    pub name: String,
    pub location: String,
    pub business_type: String,
    pub staff_size: String,
    pub monthly_sales: String,
    pub features_interested: Vec<String>,
    pub contact_info: String,
    pub email: String,
    pub phone: String,
    pub lead_score: i64,
    pub lead_type: QualificationTier,
    pub utm_source: String,
    pub session_start_time: DateTime<Utc>,
    pub assigned_to: String,
}

/// Everything known about one customer.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetails {
    pub customer_id: String,
    pub lead: LeadSummary,
    pub cif: Option<CustomerForm>,
    pub journey: Vec<PageVisit>,
    pub behaviors: Vec<Behavior>,
}

impl Engine {
    /// Start a session with a fresh UUID and create its lead.
    ///
    /// A blank `utm_source` falls back to the configured default.
    pub async fn create_session_lead(
        &self,
        utm_source: Option<&str>,
    ) -> Result<LeadSummary, LeadflowError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let utm_source = utm_source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.crm.default_utm_source)
            .to_string();
        self.create_lead(&session_id, &utm_source).await
    }

    /// Create the lead for `session_id` and score its opening.
    ///
    /// Fails with `Conflict` when the session already has a lead.
    pub async fn create_lead(
        &self,
        session_id: &str,
        utm_source: &str,
    ) -> Result<LeadSummary, LeadflowError> {
        require("session_id", session_id)?;
        let opening = NewBehavior {
            session_id: session_id.to_string(),
            action: SESSION_OPENED.to_string(),
            score_change: self.scoring.score_for_behavior(SESSION_OPENED, None),
            metadata: None,
        };
        let outcome = self
            .store
            .create_lead(
                session_id,
                utm_source,
                &opening,
                self.scoring.thresholds(),
                self.now(),
            )
            .await?;
        info!(session_id, utm_source, score = outcome.lead.score, "lead created");
        recording::record_lead_created(utm_source);
        recording::record_behavior(SESSION_OPENED);
        self.after_score(&outcome).await;
        Ok(self.summarize(&outcome.lead))
    }

    /// Log a named behavior. Unknown actions are stored with no score.
    pub async fn log_behavior(
        &self,
        session_id: &str,
        action: &str,
        metadata: Option<&Value>,
    ) -> Result<BehaviorLogged, LeadflowError> {
        require("session_id", session_id)?;
        require("action", action)?;
        let score_change = self.scoring.score_for_behavior(action, metadata);
        let behavior = NewBehavior {
            session_id: session_id.to_string(),
            action: action.to_string(),
            score_change,
            metadata: metadata.map(Value::to_string),
        };
        let outcome = self
            .store
            .record_behavior(&behavior, self.scoring.thresholds(), self.now())
            .await?;
        debug!(session_id, action, score_change, "behavior logged");
        recording::record_behavior(action);
        self.after_score(&outcome).await;
        Ok(BehaviorLogged {
            score_change,
            lead_score: outcome.lead.score,
            lead_type: outcome.lead.tier,
        })
    }

    /// Add `delta` to the lead's score without an event record.
    pub async fn apply_score_delta(
        &self,
        session_id: &str,
        delta: i64,
    ) -> Result<CurrentScore, LeadflowError> {
        require("session_id", session_id)?;
        let outcome = self
            .store
            .apply_score_delta(session_id, delta, self.scoring.thresholds(), self.now())
            .await?;
        self.after_score(&outcome).await;
        Ok(CurrentScore {
            lead_score: outcome.lead.score,
            lead_type: outcome.lead.tier,
        })
    }

    /// Merge profile fields into the lead.
    pub async fn update_profile(
        &self,
        session_id: &str,
        update: &ProfileUpdate,
    ) -> Result<LeadSummary, LeadflowError> {
        require("session_id", session_id)?;
        let lead = self
            .store
            .update_profile(session_id, update, self.now())
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(session_id))?;
        debug!(session_id, "profile updated");
        Ok(self.summarize(&lead))
    }

    pub async fn get_summary(&self, session_id: &str) -> Result<LeadSummary, LeadflowError> {
        let lead = self.lead(session_id).await?;
        Ok(self.summarize(&lead))
    }

    pub async fn current_score(&self, session_id: &str) -> Result<CurrentScore, LeadflowError> {
        let lead = self.lead(session_id).await?;
        Ok(CurrentScore {
            lead_score: lead.score,
            lead_type: self.scoring.classify(lead.score),
        })
    }

    /// Return the lead's customer id, issuing the next one for today if needed.
    pub async fn assign_customer_id(&self, session_id: &str) -> Result<String, LeadflowError> {
        require("session_id", session_id)?;
        let existing = self.lead(session_id).await?.customer_id;
        if let Some(customer_id) = existing {
            return Ok(customer_id);
        }
        let customer_id = self.store.assign_customer_id(session_id, self.now()).await?;
        info!(session_id, customer_id = %customer_id, "customer id issued");
        recording::record_customer_id();
        Ok(customer_id)
    }

    /// CRM projection of the lead. Missing text fields export as empty strings.
    pub async fn export_for_crm(&self, session_id: &str) -> Result<CrmExport, LeadflowError> {
        let lead = self.lead(session_id).await?;
        let profile = &lead.profile;
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Ok(CrmExport {
            name: profile.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            location: text(&profile.location),
            business_type: text(&profile.business_type),
            staff_size: text(&profile.staff_size),
            monthly_sales: text(&profile.monthly_sales),
            features_interested: profile.features_interested.clone(),
            contact_info: profile.contact_info().unwrap_or_default().to_string(),
            email: text(&profile.email),
            phone: text(&profile.phone),
            lead_score: lead.score,
            lead_type: self.scoring.classify(lead.score),
            utm_source: lead.utm_source.clone(),
            session_start_time: lead.created_at,
            assigned_to: self.crm.assigned_to.clone(),
        })
    }

    /// Lead, form, journey, and behaviors for a customer id.
    pub async fn get_customer_details(
        &self,
        customer_id: &str,
    ) -> Result<CustomerDetails, LeadflowError> {
        require("customer_id", customer_id)?;
        let lead = self
            .store
            .get_lead_by_customer_id(customer_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound {
                entity: "customer",
                key: customer_id.to_string(),
            })?;
        let cif = self.store.get_form(customer_id).await?;
        let journey = self.store.list_page_visits(&lead.session_id).await?;
        let behaviors = self.store.list_behaviors(&lead.session_id).await?;
        Ok(CustomerDetails {
            customer_id: customer_id.to_string(),
            lead: self.summarize(&lead),
            cif,
            journey,
            behaviors,
        })
    }

    /// Send the qualified-lead notification on request.
    ///
    /// Unlike the automatic signal on tier entry, this ignores the
    /// `notifications.enabled` switch and reports delivery failures.
    pub async fn notify_sales(&self, session_id: &str) -> Result<LeadSummary, LeadflowError> {
        let mut lead = self.lead(session_id).await?;
        lead.reclassify(&self.scoring.thresholds());
        if lead.tier != QualificationTier::SalesQualified {
            return Err(LeadflowError::NotQualified {
                session_id: session_id.to_string(),
                score: lead.score,
                threshold: self.scoring.thresholds().sql,
            });
        }
        self.deliver_qualified(&lead, "manual").await?;
        Ok(self.summarize(&lead))
    }

    pub(crate) async fn lead(&self, session_id: &str) -> Result<Lead, LeadflowError> {
        require("session_id", session_id)?;
        self.store
            .get_lead(session_id)
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(session_id))
    }

    pub(crate) fn summarize(&self, lead: &Lead) -> LeadSummary {
        let profile = &lead.profile;
        LeadSummary {
            session_id: lead.session_id.clone(),
            customer_id: lead.customer_id.clone(),
            name: profile.name.clone(),
            location: profile.location.clone(),
            business_type: profile.business_type.clone(),
            staff_size: profile.staff_size.clone(),
            monthly_sales: profile.monthly_sales.clone(),
            features_interested: profile.features_interested.clone(),
            contact_info: profile.contact_info().map(str::to_string),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            lead_score: lead.score,
            lead_type: self.scoring.classify(lead.score),
            utm_source: lead.utm_source.clone(),
            cif_completed: lead.cif_completed,
            created_at: lead.created_at,
            updated_at: lead.updated_at,
        }
    }
}
