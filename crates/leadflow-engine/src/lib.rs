// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead scoring and funnel state engine for Leadflow.
//!
//! Turns answers, behaviors, page visits, session exits, and form edits into
//! a running lead score, a qualification tier, a funnel completion
//! percentage, and journey analytics. Persistence, time, and qualified-lead
//! delivery are reached through the `leadflow-core` traits.

pub mod analytics;
pub mod cif;
pub mod engine;
pub mod experiments;
pub mod funnel;
pub mod journey;
pub mod leads;
pub mod notify;
pub mod recording;
pub mod scoring;

pub use engine::{Engine, LoggedAnswer};
pub use funnel::FunnelTracker;
pub use notify::TracingNotifier;
pub use scoring::ScoringEngine;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use leadflow_config::model::{LeadflowConfig, StorageConfig};
    use leadflow_core::{
        AdapterType, Clock, HealthStatus, Lead, LeadNotifier, LeadStore, LeadflowError,
        PluginAdapter,
    };
    use leadflow_storage::SqliteStorage;
    use tempfile::TempDir;

    use crate::Engine;

    /// Clock that only moves when told to.
    pub struct StepClock(Mutex<DateTime<Utc>>);

    impl StepClock {
        pub fn advance(&self, secs: i64) {
            let mut now = self.0.lock().unwrap();
            *now += Duration::seconds(secs);
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    /// Notifier that keeps every session it was told about.
    #[derive(Default)]
    pub struct Captured {
        pub sessions: Mutex<Vec<String>>,
        pub fail: bool,
    }

    #[async_trait]
    impl PluginAdapter for Captured {
        fn name(&self) -> &str {
            "captured"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 1)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Notifier
        }
        async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), LeadflowError> {
            Ok(())
        }
    }

    #[async_trait]
    impl LeadNotifier for Captured {
        async fn lead_qualified(&self, lead: &Lead) -> Result<(), LeadflowError> {
            if self.fail {
                return Err(LeadflowError::Notification {
                    message: "webhook unreachable".into(),
                    source: None,
                });
            }
            self.sessions.lock().unwrap().push(lead.session_id.clone());
            Ok(())
        }
    }

    pub struct Fixture {
        pub engine: Engine,
        pub clock: Arc<StepClock>,
        pub notifier: Arc<Captured>,
        db_path: PathBuf,
        _dir: TempDir,
    }

    impl Fixture {
        /// Write rows straight into the database, bypassing the store.
        pub fn plant(&self, sql: &str) {
            let conn = rusqlite::Connection::open(&self.db_path).unwrap();
            conn.execute_batch(sql).unwrap();
        }
    }

    pub async fn fixture() -> Fixture {
        fixture_with(LeadflowConfig::default(), false).await
    }

    pub async fn fixture_with(mut config: LeadflowConfig, failing_notifier: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("leads.db");
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let store = SqliteStorage::new(config.storage.clone());
        store.initialize().await.unwrap();

        let start = Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap();
        let clock = Arc::new(StepClock(Mutex::new(start)));
        let notifier = Arc::new(Captured {
            fail: failing_notifier,
            ..Captured::default()
        });
        let engine = Engine::new(&config, Arc::new(store))
            .with_clock(clock.clone())
            .with_notifier(notifier.clone());
        Fixture {
            engine,
            clock,
            notifier,
            db_path,
            _dir: dir,
        }
    }
}
