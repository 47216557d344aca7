// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic A/B variant assignment and conversion tallies.
//!
//! A session's bucket is a pure function of the test name and session id,
//! so repeated calls and restarts always agree. Assignments and conversions
//! are stored as zero-score behaviors and mined back for results.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use leadflow_core::{Behavior, LeadflowError, NewBehavior};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::engine::{Engine, require, round2};
use crate::recording;

pub const AB_TEST_ASSIGNMENT: &str = "ab_test_assignment";
pub const AB_TEST_CONVERSION: &str = "ab_test_conversion";

/// Index of the bucket for `session_id` among `variant_count` variants.
pub fn bucket(test_name: &str, session_id: &str, variant_count: usize) -> usize {
    if variant_count == 0 {
        return 0;
    }
    let digest = Sha256::digest(format!("{test_name}:{session_id}").as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) % variant_count as u64) as usize
}

/// Per-variant tallies for one test.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariantStats {
    /// Distinct sessions assigned to the variant.
    pub assignments: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
    pub conversion_types: BTreeMap<String, u64>,
}

/// Test name to variant id to tallies.
pub type AbResults = BTreeMap<String, BTreeMap<String, VariantStats>>;

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub total_participants: u64,
    pub total_conversions: u64,
    pub winning_variant: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestExport {
    pub test_name: String,
    pub exported_at: DateTime<Utc>,
    pub results: BTreeMap<String, VariantStats>,
    pub summary: ExportSummary,
}

#[derive(Debug, Deserialize)]
struct AssignmentRecord {
    test_name: String,
    variant: String,
}

#[derive(Debug, Deserialize)]
struct ConversionRecord {
    test_name: String,
    variant: String,
    conversion_type: String,
}

impl Engine {
    /// Variant for the session in `test_name`, logged as an assignment.
    ///
    /// With A/B testing disabled the baseline is returned and nothing is logged.
    pub async fn assign_variant(
        &self,
        session_id: &str,
        test_name: &str,
    ) -> Result<String, LeadflowError> {
        require("session_id", session_id)?;
        require("test_name", test_name)?;
        if !self.ab_testing.enabled {
            return Ok(self.ab_testing.baseline_variant.clone());
        }
        let variants = self.variants(test_name)?;
        let variant = variants[bucket(test_name, session_id, variants.len())].clone();

        let metadata = json!({
            "test_name": test_name,
            "variant": variant,
            "assigned_at": self.now(),
        });
        self.record_meta(session_id, AB_TEST_ASSIGNMENT, metadata)
            .await?;
        debug!(session_id, test_name, variant = %variant, "variant assigned");
        recording::record_ab_assignment(test_name, &variant);
        Ok(variant)
    }

    /// Append a conversion for the session. Earlier conversions are kept.
    pub async fn log_conversion(
        &self,
        session_id: &str,
        test_name: &str,
        variant: &str,
        conversion_type: &str,
        conversion_value: Option<Value>,
    ) -> Result<(), LeadflowError> {
        require("session_id", session_id)?;
        require("variant", variant)?;
        require("conversion_type", conversion_type)?;
        let variants = self.variants(test_name)?;
        if !variants.iter().any(|v| v == variant) {
            return Err(LeadflowError::Validation(format!(
                "variant {variant} is not part of test {test_name}"
            )));
        }
        let metadata = json!({
            "test_name": test_name,
            "variant": variant,
            "conversion_type": conversion_type,
            "conversion_value": conversion_value,
            "converted_at": self.now(),
        });
        self.record_meta(session_id, AB_TEST_CONVERSION, metadata)
            .await?;
        debug!(session_id, test_name, variant, conversion_type, "conversion logged");
        recording::record_ab_conversion(test_name, variant);
        Ok(())
    }

    /// Tallies for one test, or every configured test.
    ///
    /// Records with unreadable metadata are skipped.
    pub async fn ab_results(&self, test_name: Option<&str>) -> Result<AbResults, LeadflowError> {
        if let Some(name) = test_name {
            self.variants(name)?;
        }
        let wanted = |name: &str| test_name.is_none_or(|t| t == name);

        let mut results: AbResults = self
            .ab_testing
            .tests
            .iter()
            .filter(|(name, _)| wanted(name.as_str()))
            .map(|(name, variants)| {
                let zeroed = variants
                    .iter()
                    .map(|v| (v.clone(), VariantStats::default()))
                    .collect();
                (name.clone(), zeroed)
            })
            .collect();

        let mut seen: BTreeSet<(String, String, String)> = BTreeSet::new();
        for behavior in self.store.list_behaviors_by_action(AB_TEST_ASSIGNMENT).await? {
            let Some(record) = parse_record::<AssignmentRecord>(&behavior) else {
                continue;
            };
            let key = (
                record.test_name.clone(),
                record.variant.clone(),
                behavior.session_id.clone(),
            );
            if let Some(stats) = slot(&mut results, &record.test_name, &record.variant)
                && seen.insert(key)
            {
                stats.assignments += 1;
            }
        }

        for behavior in self.store.list_behaviors_by_action(AB_TEST_CONVERSION).await? {
            let Some(record) = parse_record::<ConversionRecord>(&behavior) else {
                continue;
            };
            if let Some(stats) = slot(&mut results, &record.test_name, &record.variant) {
                stats.conversions += 1;
                *stats
                    .conversion_types
                    .entry(record.conversion_type)
                    .or_default() += 1;
            }
        }

        for stats in results.values_mut().flat_map(BTreeMap::values_mut) {
            stats.conversion_rate = if stats.assignments == 0 {
                0.0
            } else {
                round2(stats.conversions as f64 / stats.assignments as f64 * 100.0)
            };
        }
        Ok(results)
    }

    /// Variant with the highest conversion rate among those with enough data.
    ///
    /// Only variants with at least `min_sample_size` assignments are eligible,
    /// including ones that have not converted yet. Variants are considered in
    /// configured order and a later one must beat the leader strictly, so ties
    /// go to the earlier variant. The baseline wins when nothing is eligible.
    pub async fn winning_variant(&self, test_name: &str) -> Result<String, LeadflowError> {
        let results = self.ab_results(Some(test_name)).await?;
        Ok(self.pick_winner(test_name, &results))
    }

    /// Results, totals, and winner for one test.
    pub async fn export_test_data(&self, test_name: &str) -> Result<TestExport, LeadflowError> {
        let mut results = self.ab_results(Some(test_name)).await?;
        let winning_variant = self.pick_winner(test_name, &results);
        let variants = results.remove(test_name).unwrap_or_default();
        let summary = ExportSummary {
            total_participants: variants.values().map(|v| v.assignments).sum(),
            total_conversions: variants.values().map(|v| v.conversions).sum(),
            winning_variant,
        };
        Ok(TestExport {
            test_name: test_name.to_string(),
            exported_at: self.now(),
            results: variants,
            summary,
        })
    }

    fn pick_winner(&self, test_name: &str, results: &AbResults) -> String {
        let baseline = || self.ab_testing.baseline_variant.clone();
        let (Some(order), Some(stats)) = (self.ab_testing.tests.get(test_name), results.get(test_name))
        else {
            return baseline();
        };
        let mut best: Option<(&String, f64)> = None;
        for variant in order {
            let Some(s) = stats.get(variant) else {
                continue;
            };
            if s.assignments < self.ab_testing.min_sample_size {
                continue;
            }
            if best.is_none_or(|(_, rate)| s.conversion_rate > rate) {
                best = Some((variant, s.conversion_rate));
            }
        }
        best.map(|(variant, _)| variant.clone()).unwrap_or_else(baseline)
    }

    fn variants(&self, test_name: &str) -> Result<&[String], LeadflowError> {
        require("test_name", test_name)?;
        self.ab_testing
            .tests
            .get(test_name)
            .map(Vec::as_slice)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| LeadflowError::NotFound {
                entity: "ab test",
                key: test_name.to_string(),
            })
    }

    async fn record_meta(
        &self,
        session_id: &str,
        action: &str,
        metadata: Value,
    ) -> Result<(), LeadflowError> {
        let behavior = NewBehavior {
            session_id: session_id.to_string(),
            action: action.to_string(),
            score_change: 0,
            metadata: Some(metadata.to_string()),
        };
        self.store
            .record_behavior(&behavior, self.scoring.thresholds(), self.now())
            .await?;
        Ok(())
    }
}

fn slot<'a>(
    results: &'a mut AbResults,
    test_name: &str,
    variant: &str,
) -> Option<&'a mut VariantStats> {
    results.get_mut(test_name)?.get_mut(variant)
}

fn parse_record<T: serde::de::DeserializeOwned>(behavior: &Behavior) -> Option<T> {
    let parsed = behavior
        .parsed_metadata()
        .map_err(|e| e.to_string())
        .and_then(|value| {
            let value = value.ok_or_else(|| "missing metadata".to_string())?;
            serde_json::from_value::<T>(value).map_err(|e| e.to_string())
        });
    match parsed {
        Ok(record) => Some(record),
        Err(error) => {
            warn!(
                behavior_id = behavior.id,
                action = %behavior.action,
                error = %error,
                "skipping unreadable experiment record"
            );
            None
        }
    }
}
