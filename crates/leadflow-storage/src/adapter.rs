// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the LeadStore trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use leadflow_config::model::StorageConfig;
use leadflow_core::{
    AdapterType, Answer, Behavior, CompletionFn, CustomerForm, FormEdit, FormUpdate,
    HealthStatus, Lead, LeadStore, LeadflowError, NewAnswer, NewBehavior, NewPageVisit,
    NewSessionExit, PageVisit, PluginAdapter, ProfileUpdate, ScoreOutcome, SessionExit,
    TierThresholds,
};

use crate::database::Database;
use crate::queries;
use crate::queries::events::OnceOutcome;

/// SQLite-backed lead store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// The database is opened by [`LeadStore::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a store for the configured path without opening it.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, LeadflowError> {
        self.db.get().ok_or_else(|| LeadflowError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(db: &Database) -> Result<(), LeadflowError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("storage not initialized".into()));
        };
        let probe = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await;
        Ok(match probe {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        if let Some(db) = self.db.get() {
            Self::checkpoint(db).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl LeadStore for SqliteStorage {
    async fn initialize(&self) -> Result<(), LeadflowError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| LeadflowError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), LeadflowError> {
        Self::checkpoint(self.db()?).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Leads ---

    async fn create_lead(
        &self,
        session_id: &str,
        utm_source: &str,
        opening: &NewBehavior,
        thresholds: TierThresholds,
        now: DateTime<Utc>,
    ) -> Result<ScoreOutcome, LeadflowError> {
        queries::leads::create_lead(self.db()?, session_id, utm_source, opening, thresholds, now)
            .await?
            .ok_or_else(|| LeadflowError::Conflict {
                entity: "lead",
                key: session_id.to_string(),
            })
    }

    async fn get_lead(&self, session_id: &str) -> Result<Option<Lead>, LeadflowError> {
        queries::leads::get_lead(self.db()?, session_id).await
    }

    async fn get_lead_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Lead>, LeadflowError> {
        queries::leads::get_lead_by_customer_id(self.db()?, customer_id).await
    }

    async fn list_leads(&self) -> Result<Vec<Lead>, LeadflowError> {
        queries::leads::list_leads(self.db()?).await
    }

    async fn update_profile(
        &self,
        session_id: &str,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Lead>, LeadflowError> {
        queries::leads::update_profile(self.db()?, session_id, update, now).await
    }

    async fn apply_score_delta(
        &self,
        session_id: &str,
        delta: i64,
        thresholds: TierThresholds,
        now: DateTime<Utc>,
    ) -> Result<ScoreOutcome, LeadflowError> {
        queries::leads::apply_score_delta(self.db()?, session_id, delta, thresholds, now)
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(session_id))
    }

    async fn assign_customer_id(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<String, LeadflowError> {
        queries::leads::assign_customer_id(self.db()?, session_id, now)
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(session_id))
    }

    // --- Answers and behaviors ---

    async fn record_answer(
        &self,
        answer: &NewAnswer,
        thresholds: TierThresholds,
        now: DateTime<Utc>,
    ) -> Result<ScoreOutcome, LeadflowError> {
        queries::events::record_answer(self.db()?, answer, thresholds, now)
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(&answer.session_id))
    }

    async fn list_answers(&self, session_id: &str) -> Result<Vec<Answer>, LeadflowError> {
        queries::events::list_answers(self.db()?, session_id).await
    }

    async fn answered_question_ids(&self, session_id: &str) -> Result<Vec<i64>, LeadflowError> {
        queries::events::answered_question_ids(self.db()?, session_id).await
    }

    async fn record_behavior(
        &self,
        behavior: &NewBehavior,
        thresholds: TierThresholds,
        now: DateTime<Utc>,
    ) -> Result<ScoreOutcome, LeadflowError> {
        queries::events::record_behavior(self.db()?, behavior, thresholds, now)
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(&behavior.session_id))
    }

    async fn record_behavior_once(
        &self,
        behavior: &NewBehavior,
        thresholds: TierThresholds,
        now: DateTime<Utc>,
    ) -> Result<Option<ScoreOutcome>, LeadflowError> {
        match queries::events::record_behavior_once(self.db()?, behavior, thresholds, now).await? {
            OnceOutcome::Recorded(outcome) => Ok(Some(outcome)),
            OnceOutcome::AlreadyRecorded => Ok(None),
            OnceOutcome::MissingLead => Err(LeadflowError::lead_not_found(&behavior.session_id)),
        }
    }

    async fn list_behaviors(&self, session_id: &str) -> Result<Vec<Behavior>, LeadflowError> {
        queries::events::list_behaviors(self.db()?, session_id).await
    }

    async fn list_behaviors_by_action(
        &self,
        action: &str,
    ) -> Result<Vec<Behavior>, LeadflowError> {
        queries::events::list_behaviors_by_action(self.db()?, action).await
    }

    // --- Journey ---

    async fn insert_page_visit(
        &self,
        visit: &NewPageVisit,
        now: DateTime<Utc>,
    ) -> Result<PageVisit, LeadflowError> {
        queries::journey::insert_page_visit(self.db()?, visit, now)
            .await?
            .ok_or_else(|| LeadflowError::lead_not_found(&visit.session_id))
    }

    async fn close_page_visit(
        &self,
        visit_id: i64,
        exit_time: DateTime<Utc>,
    ) -> Result<Option<PageVisit>, LeadflowError> {
        queries::journey::close_page_visit(self.db()?, visit_id, exit_time).await
    }

    async fn list_page_visits(&self, session_id: &str) -> Result<Vec<PageVisit>, LeadflowError> {
        queries::journey::list_page_visits(self.db()?, session_id).await
    }

    async fn list_all_page_visits(&self) -> Result<Vec<PageVisit>, LeadflowError> {
        queries::journey::list_all_page_visits(self.db()?).await
    }

    async fn insert_session_exit(
        &self,
        exit: &NewSessionExit,
        now: DateTime<Utc>,
    ) -> Result<SessionExit, LeadflowError> {
        queries::journey::insert_session_exit(self.db()?, exit, now).await
    }

    async fn list_session_exits(&self) -> Result<Vec<SessionExit>, LeadflowError> {
        queries::journey::list_session_exits(self.db()?).await
    }

    // --- Customer information forms ---

    async fn create_form_if_absent(
        &self,
        session_id: &str,
        customer_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(CustomerForm, bool), LeadflowError> {
        queries::forms::create_form_if_absent(self.db()?, session_id, customer_id, now).await
    }

    async fn get_form(&self, customer_id: &str) -> Result<Option<CustomerForm>, LeadflowError> {
        queries::forms::get_form(self.db()?, customer_id).await
    }

    async fn update_form(
        &self,
        customer_id: &str,
        edit: &FormEdit,
        completion: CompletionFn,
        now: DateTime<Utc>,
    ) -> Result<Option<FormUpdate>, LeadflowError> {
        queries::forms::update_form(self.db()?, customer_id, edit, completion, now).await
    }

    async fn list_forms(&self) -> Result<Vec<CustomerForm>, LeadflowError> {
        queries::forms::list_forms(self.db()?).await
    }
}
