// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Leadflow lead engine.
//!
//! This crate provides the error type, domain types, and the adapter traits
//! (storage, notification, clock) that the engine consumes. Storage backends
//! and notification sinks implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::LeadflowError;
pub use types::*;

pub use traits::{Clock, CompletionFn, LeadNotifier, LeadStore, PluginAdapter, SystemClock};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn leadflow_error_variants_render_their_key() {
        let not_found = LeadflowError::lead_not_found("sess-1");
        assert_eq!(not_found.to_string(), "lead not found: sess-1");
        assert!(not_found.is_caller_error());

        let not_qualified = LeadflowError::NotQualified {
            session_id: "sess-1".into(),
            score: 45,
            threshold: 60,
        };
        assert!(not_qualified.to_string().contains("45"));
        assert!(not_qualified.is_caller_error());

        let storage = LeadflowError::Storage {
            source: Box::new(std::io::Error::other("disk")),
        };
        assert!(!storage.is_caller_error());
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Storage,
            AdapterType::Notifier,
            AdapterType::Observability,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn exit_reason_uses_snake_case() {
        use std::str::FromStr;
        assert_eq!(ExitReason::Abandoned.to_string(), "abandoned");
        assert_eq!(ExitReason::from_str("timeout").unwrap(), ExitReason::Timeout);
        assert!(ExitReason::from_str("bounced").is_err());
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_lead_store<T: LeadStore>() {}
        fn _assert_notifier<T: LeadNotifier>() {}
        fn _assert_clock<T: Clock>() {}
        _assert_clock::<SystemClock>();
    }

    proptest! {
        #[test]
        fn tier_is_monotonic_in_score(a in -500i64..500, b in -500i64..500) {
            let t = TierThresholds::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(t.classify(lo) <= t.classify(hi));
        }

        #[test]
        fn tier_matches_threshold_table(score in -500i64..500) {
            let t = TierThresholds::default();
            let expected = if score >= 60 {
                QualificationTier::SalesQualified
            } else if score >= 30 {
                QualificationTier::MarketingQualified
            } else {
                QualificationTier::Unqualified
            };
            prop_assert_eq!(t.classify(score), expected);
        }
    }
}
