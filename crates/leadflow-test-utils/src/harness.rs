// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete engine over a temp SQLite database,
//! a [`ManualClock`], and a [`MockNotifier`].

use std::sync::Arc;

use leadflow_config::model::{LeadflowConfig, StorageConfig};
use leadflow_core::{LeadStore, LeadflowError};
use leadflow_engine::Engine;
use leadflow_storage::SqliteStorage;

use crate::manual_clock::ManualClock;
use crate::mock_notifier::MockNotifier;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: LeadflowConfig,
    failing_notifier: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: LeadflowConfig::default(),
            failing_notifier: false,
        }
    }

    /// Start from a custom configuration. The storage section is replaced.
    pub fn with_config(mut self, config: LeadflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Make every notification delivery fail.
    pub fn with_failing_notifier(mut self) -> Self {
        self.failing_notifier = true;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, LeadflowError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| LeadflowError::Storage { source: e.into() })?;
        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: temp_dir
                .path()
                .join("test.db")
                .to_string_lossy()
                .into_owned(),
            wal_mode: true,
        };

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage: Arc<dyn LeadStore> = Arc::new(storage);

        let clock = Arc::new(ManualClock::default());
        let notifier = Arc::new(if self.failing_notifier {
            MockNotifier::failing()
        } else {
            MockNotifier::new()
        });

        let engine = Engine::new(&config, storage.clone())
            .with_clock(clock.clone())
            .with_notifier(notifier.clone());

        Ok(TestHarness {
            engine: Arc::new(engine),
            storage,
            clock,
            notifier,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// The engine under test.
    pub engine: Arc<Engine>,
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<dyn LeadStore>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<MockNotifier>,
    /// Effective configuration, with the temp database path.
    pub config: LeadflowConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Create a lead with a fixed session id.
    pub async fn lead(&self, session_id: &str, utm_source: &str) -> Result<(), LeadflowError> {
        self.engine.create_lead(session_id, utm_source).await?;
        Ok(())
    }

    /// Current score of a session, for terse assertions.
    pub async fn score(&self, session_id: &str) -> Result<i64, LeadflowError> {
        Ok(self.engine.current_score(session_id).await?.lead_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert!(harness.storage.list_leads().await.unwrap().is_empty());
        harness.lead("s1", "ads").await.unwrap();
        assert_eq!(harness.score("s1").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn temp_db_is_unique_per_harness() {
        let h1 = TestHarness::builder().build().await.unwrap();
        let h2 = TestHarness::builder().build().await.unwrap();
        h1.lead("s1", "ads").await.unwrap();
        assert_eq!(h1.storage.list_leads().await.unwrap().len(), 1);
        assert!(h2.storage.list_leads().await.unwrap().is_empty());
        assert_ne!(h1.config.storage.database_path, h2.config.storage.database_path);
    }

    #[tokio::test]
    async fn failing_notifier_is_wired_in() {
        let harness = TestHarness::builder()
            .with_failing_notifier()
            .build()
            .await
            .unwrap();
        harness.lead("s1", "ads").await.unwrap();
        harness.engine.apply_score_delta("s1", 60).await.unwrap();
        assert_eq!(harness.notifier.delivered_count().await, 0);
        assert_eq!(harness.score("s1").await.unwrap(), 65);
    }

    #[tokio::test]
    async fn custom_config_is_used() {
        let mut config = LeadflowConfig::default();
        config.crm.default_utm_source = "organic".into();
        let harness = TestHarness::builder().with_config(config).build().await.unwrap();
        let lead = harness.engine.create_session_lead(None).await.unwrap();
        assert_eq!(lead.utm_source, "organic");
    }
}
