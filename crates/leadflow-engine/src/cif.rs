// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer information form completion.

use leadflow_core::{CustomerForm, FormEdit, LeadflowError};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::engine::{Engine, require, round2};
use crate::recording;

/// Required fields per form section. The denominator is the total count.
pub const REQUIRED_FIELDS: &[(&str, &[&str])] = &[
    ("basic_info", &["full_name", "email", "phone"]),
    (
        "business_details",
        &["business_name", "business_type", "industry"],
    ),
    ("operational_info", &["staff_size", "monthly_sales"]),
    ("technology_profile", &["current_pos", "features_needed"]),
    ("financial_info", &["annual_revenue", "growth_stage"]),
];

/// Percentage of required fields that hold a truthy value, to two decimals.
pub fn completion_percentage(form_data: &Value) -> f64 {
    let (total, filled) = REQUIRED_FIELDS
        .iter()
        .flat_map(|(section, fields)| fields.iter().map(move |field| (*section, *field)))
        .fold((0usize, 0usize), |(total, filled), (section, field)| {
            let present = form_data
                .get(section)
                .and_then(|s| s.get(field))
                .is_some_and(is_truthy);
            (total + 1, filled + usize::from(present))
        });
    if total == 0 {
        return 100.0;
    }
    round2(filled as f64 / total as f64 * 100.0)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => true,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CifStarted {
    pub cif_id: i64,
    pub customer_id: String,
    /// False when the form already existed.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CifCompletionStats {
    pub total_forms: usize,
    pub completed_forms: usize,
    pub average_completion: f64,
}

impl Engine {
    /// Create the form for a customer unless it already exists.
    ///
    /// The customer id must belong to the session.
    pub async fn cif_start(
        &self,
        session_id: &str,
        customer_id: &str,
    ) -> Result<CifStarted, LeadflowError> {
        require("customer_id", customer_id)?;
        let lead = self.lead(session_id).await?;
        if lead.customer_id.as_deref() != Some(customer_id) {
            return Err(LeadflowError::Validation(format!(
                "customer id {customer_id} does not belong to session {session_id}"
            )));
        }
        let (form, created) = self
            .store
            .create_form_if_absent(session_id, customer_id, self.now())
            .await?;
        if created {
            info!(session_id, customer_id, cif_id = form.id, "customer form started");
        }
        Ok(CifStarted {
            cif_id: form.id,
            customer_id: form.customer_id,
            created,
        })
    }

    /// Merge `data` into one section, or replace the whole form when no section is given.
    pub async fn cif_update(
        &self,
        customer_id: &str,
        data: Map<String, Value>,
        section: Option<&str>,
    ) -> Result<CustomerForm, LeadflowError> {
        require("customer_id", customer_id)?;
        if let Some(name) = section {
            require("section", name)?;
        }
        let edit = FormEdit {
            data,
            section: section.map(str::to_string),
        };
        let update = self
            .store
            .update_form(customer_id, &edit, completion_percentage, self.now())
            .await?
            .ok_or_else(|| form_not_found(customer_id))?;
        if update.newly_completed {
            info!(customer_id, "customer form completed");
            recording::record_cif_completed();
        }
        Ok(update.form)
    }

    pub async fn cif_get(&self, customer_id: &str) -> Result<CustomerForm, LeadflowError> {
        require("customer_id", customer_id)?;
        self.store
            .get_form(customer_id)
            .await?
            .ok_or_else(|| form_not_found(customer_id))
    }

    pub async fn cif_completion_analytics(&self) -> Result<CifCompletionStats, LeadflowError> {
        let forms = self.store.list_forms().await?;
        let total_forms = forms.len();
        let completed_forms = forms
            .iter()
            .filter(|f| f.completion_percentage >= 100.0)
            .count();
        let average_completion = if total_forms == 0 {
            0.0
        } else {
            round2(forms.iter().map(|f| f.completion_percentage).sum::<f64>() / total_forms as f64)
        };
        Ok(CifCompletionStats {
            total_forms,
            completed_forms,
            average_completion,
        })
    }
}

fn form_not_found(customer_id: &str) -> LeadflowError {
    LeadflowError::NotFound {
        entity: "customer form",
        key: customer_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn full_form() -> Value {
        json!({
            "basic_info": {"full_name": "Asha Rao", "email": "asha@example.com", "phone": "98200"},
            "business_details": {"business_name": "Rao Foods", "business_type": "Restaurant", "industry": "F&B"},
            "operational_info": {"staff_size": "11-50", "monthly_sales": 400000},
            "technology_profile": {"current_pos": "paper", "features_needed": ["billing"]},
            "financial_info": {"annual_revenue": "5Cr", "growth_stage": "expanding"}
        })
    }

    #[test]
    fn twelve_required_fields() {
        let total: usize = REQUIRED_FIELDS.iter().map(|(_, f)| f.len()).sum();
        assert_eq!(total, 12);
        assert_eq!(completion_percentage(&full_form()), 100.0);
        assert_eq!(completion_percentage(&json!({})), 0.0);
    }

    #[test]
    fn half_filled_is_fifty() {
        let data = json!({
            "basic_info": {"full_name": "A", "email": "a@b.co", "phone": "1"},
            "business_details": {"business_name": "B", "business_type": "C", "industry": "D"}
        });
        assert_eq!(completion_percentage(&data), 50.0);
    }

    #[test]
    fn empty_and_null_values_do_not_count() {
        let data = json!({
            "basic_info": {"full_name": "  ", "email": null, "phone": "1"},
            "technology_profile": {"features_needed": []},
            "operational_info": {"staff_size": 0}
        });
        assert_eq!(completion_percentage(&data), 16.67);
    }

    #[tokio::test]
    async fn start_is_idempotent_and_checks_ownership() {
        let fx = fixture().await;
        fx.engine.create_lead("s1", "ads").await.unwrap();
        fx.engine.create_lead("s2", "ads").await.unwrap();
        let cid = fx.engine.assign_customer_id("s1").await.unwrap();

        let first = fx.engine.cif_start("s1", &cid).await.unwrap();
        assert!(first.created);
        let again = fx.engine.cif_start("s1", &cid).await.unwrap();
        assert!(!again.created);
        assert_eq!(again.cif_id, first.cif_id);

        assert!(matches!(
            fx.engine.cif_start("s2", &cid).await,
            Err(LeadflowError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn section_updates_reach_completion_and_flag_the_lead() {
        let fx = fixture().await;
        fx.engine.create_lead("s1", "ads").await.unwrap();
        let cid = fx.engine.assign_customer_id("s1").await.unwrap();
        fx.engine.cif_start("s1", &cid).await.unwrap();

        let full = full_form();
        let sections = full.as_object().unwrap();
        let mut last = None;
        for (name, data) in sections {
            let form = fx
                .engine
                .cif_update(&cid, fields(data.clone()), Some(name))
                .await
                .unwrap();
            last = Some(form);
        }
        let form = last.unwrap();
        assert_eq!(form.completion_percentage, 100.0);
        let completed_at = form.completed_at.unwrap();
        assert!(fx.engine.get_summary("s1").await.unwrap().cif_completed);

        fx.clock.advance(60);
        let emptied = fx
            .engine
            .cif_update(&cid, fields(json!({"full_name": ""})), Some("basic_info"))
            .await
            .unwrap();
        assert!(emptied.completion_percentage < 100.0);
        assert_eq!(emptied.completed_at, Some(completed_at));
    }

    #[tokio::test]
    async fn update_without_section_replaces_the_form() {
        let fx = fixture().await;
        fx.engine.create_lead("s1", "ads").await.unwrap();
        let cid = fx.engine.assign_customer_id("s1").await.unwrap();
        fx.engine.cif_start("s1", &cid).await.unwrap();
        fx.engine
            .cif_update(&cid, fields(full_form()), None)
            .await
            .unwrap();
        let replaced = fx
            .engine
            .cif_update(&cid, fields(json!({"basic_info": {"full_name": "X"}})), None)
            .await
            .unwrap();
        assert_eq!(replaced.form_data, json!({"basic_info": {"full_name": "X"}}));
        assert_eq!(fx.engine.cif_get(&cid).await.unwrap().completion_percentage, 8.33);
    }

    #[tokio::test]
    async fn missing_form_and_blank_section_are_rejected() {
        let fx = fixture().await;
        assert!(matches!(
            fx.engine.cif_get("CID_20260309_0001").await,
            Err(LeadflowError::NotFound { entity: "customer form", .. })
        ));
        assert!(matches!(
            fx.engine
                .cif_update("CID_20260309_0001", Map::new(), Some("basic_info"))
                .await,
            Err(LeadflowError::NotFound { .. })
        ));
        assert!(matches!(
            fx.engine.cif_update("CID_20260309_0001", Map::new(), Some("")).await,
            Err(LeadflowError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn completion_analytics_average_all_forms() {
        let fx = fixture().await;
        let empty = fx.engine.cif_completion_analytics().await.unwrap();
        assert_eq!(empty.total_forms, 0);
        assert_eq!(empty.average_completion, 0.0);

        for sid in ["s1", "s2"] {
            fx.engine.create_lead(sid, "ads").await.unwrap();
            let cid = fx.engine.assign_customer_id(sid).await.unwrap();
            fx.engine.cif_start(sid, &cid).await.unwrap();
            if sid == "s1" {
                fx.engine.cif_update(&cid, fields(full_form()), None).await.unwrap();
            }
        }
        let stats = fx.engine.cif_completion_analytics().await.unwrap();
        assert_eq!(stats.total_forms, 2);
        assert_eq!(stats.completed_forms, 1);
        assert_eq!(stats.average_completion, 50.0);
    }

    #[tokio::test]
    async fn completion_analytics_skip_unreadable_forms() {
        let fx = fixture().await;
        for sid in ["s1", "s2"] {
            fx.engine.create_lead(sid, "ads").await.unwrap();
            let cid = fx.engine.assign_customer_id(sid).await.unwrap();
            fx.engine.cif_start(sid, &cid).await.unwrap();
        }
        fx.plant("UPDATE customer_forms SET form_data = '{basic_info:' WHERE session_id = 's2';");

        let stats = fx.engine.cif_completion_analytics().await.unwrap();
        assert_eq!(stats.total_forms, 1);
        assert_eq!(stats.completed_forms, 0);
    }
}
