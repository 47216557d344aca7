// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as threshold ordering, unique question ids, and A/B variant lists.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::LeadflowConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LeadflowConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("gateway.host must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        )));
    }

    if !LOG_LEVELS.contains(&config.telemetry.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "telemetry.log_level `{}` must be one of {}",
            config.telemetry.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.telemetry.memory_warn_mb == 0 {
        errors.push(ConfigError::validation(
            "telemetry.memory_warn_mb must be greater than zero",
        ));
    }

    validate_workflow(config, &mut errors);
    validate_ab_testing(config, &mut errors);

    if config.crm.assigned_to.trim().is_empty() {
        errors.push(ConfigError::validation("crm.assigned_to must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_workflow(config: &LeadflowConfig, errors: &mut Vec<ConfigError>) {
    let workflow = &config.workflow;

    if workflow.thresholds.mql > workflow.thresholds.sql {
        errors.push(ConfigError::validation(format!(
            "workflow.thresholds.mql ({}) must not exceed workflow.thresholds.sql ({})",
            workflow.thresholds.mql, workflow.thresholds.sql
        )));
    }

    let quick = workflow.answer_scoring.quick_reply_max_secs;
    if !quick.is_finite() || quick <= 0.0 {
        errors.push(ConfigError::validation(format!(
            "workflow.answer_scoring.quick_reply_max_secs must be a positive number, got {quick}"
        )));
    }

    let mut ids = HashSet::new();
    let mut order = HashSet::new();
    for (i, question) in workflow.questions.iter().enumerate() {
        if !ids.insert(question.id) {
            errors.push(ConfigError::validation(format!(
                "duplicate question id {} in workflow.questions",
                question.id
            )));
        }
        if !order.insert(question.order_index) {
            errors.push(ConfigError::validation(format!(
                "duplicate order_index {} in workflow.questions",
                question.order_index
            )));
        }
        if question.question_text.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "workflow.questions[{i}].question_text must not be empty"
            )));
        }
    }

    for (field, options) in [
        ("product_menu", &workflow.product_menu),
        ("cta_options", &workflow.cta_options),
    ] {
        let mut seen = HashSet::new();
        for (i, option) in options.iter().enumerate() {
            if option.id.trim().is_empty() {
                errors.push(ConfigError::validation(format!(
                    "workflow.{field}[{i}].id must not be empty"
                )));
            } else if !seen.insert(option.id.as_str()) {
                errors.push(ConfigError::validation(format!(
                    "duplicate id `{}` in workflow.{field}",
                    option.id
                )));
            }
        }
    }
}

fn validate_ab_testing(config: &LeadflowConfig, errors: &mut Vec<ConfigError>) {
    let ab = &config.ab_testing;

    for (name, variants) in &ab.tests {
        if variants.is_empty() {
            errors.push(ConfigError::validation(format!(
                "ab_testing.tests.{name} must list at least one variant"
            )));
            continue;
        }
        let mut seen = HashSet::new();
        for variant in variants {
            if !seen.insert(variant) {
                errors.push(ConfigError::validation(format!(
                    "duplicate variant `{variant}` in ab_testing.tests.{name}"
                )));
            }
        }
        if !variants.contains(&ab.baseline_variant) {
            errors.push(ConfigError::validation(format!(
                "ab_testing.tests.{name} does not include the baseline variant `{}`",
                ab.baseline_variant
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionConfig;

    fn messages(result: Result<(), Vec<ConfigError>>) -> Vec<String> {
        result
            .expect_err("validation should fail")
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        validate_config(&LeadflowConfig::default()).expect("defaults should validate");
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut config = LeadflowConfig::default();
        config.workflow.thresholds.mql = 80;
        let errs = messages(validate_config(&config));
        assert!(errs.iter().any(|e| e.contains("thresholds.mql")));
    }

    #[test]
    fn zero_memory_threshold_is_rejected() {
        let mut config = LeadflowConfig::default();
        config.telemetry.memory_warn_mb = 0;
        let errs = messages(validate_config(&config));
        assert!(errs.iter().any(|e| e.contains("memory_warn_mb")));
    }

    #[test]
    fn duplicate_menu_ids_are_rejected() {
        let mut config = LeadflowConfig::default();
        let dup = config.workflow.product_menu[0].clone();
        config.workflow.product_menu.push(dup);
        config.workflow.cta_options[1].id = " ".into();
        let errs = messages(validate_config(&config));
        assert!(errs
            .iter()
            .any(|e| e.contains("duplicate id `billing` in workflow.product_menu")));
        assert!(errs.iter().any(|e| e.contains("workflow.cta_options[1].id")));
    }

    #[test]
    fn duplicate_question_ids_are_rejected() {
        let mut config = LeadflowConfig::default();
        let mut dup: QuestionConfig = config.workflow.questions[0].clone();
        dup.order_index = 99;
        config.workflow.questions.push(dup);
        let errs = messages(validate_config(&config));
        assert!(errs.iter().any(|e| e.contains("duplicate question id 1")));
    }

    #[test]
    fn variant_list_must_contain_baseline() {
        let mut config = LeadflowConfig::default();
        config
            .ab_testing
            .tests
            .insert("button_color".into(), vec!["B".into(), "C".into()]);
        let errs = messages(validate_config(&config));
        assert!(errs.iter().any(|e| e.contains("button_color")));
    }

    #[test]
    fn collects_every_error() {
        let mut config = LeadflowConfig::default();
        config.storage.database_path = " ".into();
        config.telemetry.log_level = "loud".into();
        config.crm.assigned_to = String::new();
        let errs = messages(validate_config(&config));
        assert_eq!(errs.len(), 3, "got: {errs:?}");
    }
}
