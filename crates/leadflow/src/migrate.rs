// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadflow migrate` command implementation.

use leadflow_config::LeadflowConfig;
use leadflow_core::{LeadStore, LeadflowError};
use leadflow_storage::SqliteStorage;

/// Open the configured database, which applies pending migrations, then close it.
pub async fn run_migrate(config: &LeadflowConfig) -> Result<(), LeadflowError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    storage.close().await?;
    println!("database ready: {}", config.storage.database_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_creates_the_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("leadflow.db");
        let mut config = LeadflowConfig::default();
        config.storage.database_path = path.to_string_lossy().into_owned();

        run_migrate(&config).await.unwrap();
        assert!(path.exists());
        // Idempotent on an existing schema.
        run_migrate(&config).await.unwrap();
    }
}
