//! Application state management

use crate::aggregator::belvo::BelvoClient;
use crate::aggregator::Aggregator;
use crate::config::Config;
use crate::db::sqlite::SqliteDb;
use crate::error::Result;
use crate::security::SecurityManager;
use crate::services::credentials::{CredentialSynthesizer, SandboxCredentialSynthesizer};
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    pub config: Config,

    /// SQLite persistence store
    pub sqlite: Arc<SqliteDb>,

    /// Password hashing and encryption at rest
    pub security: Arc<SecurityManager>,

    /// Open-banking aggregator client
    pub aggregator: Arc<dyn Aggregator>,

    /// Credentials used when registering new links
    pub credentials: Arc<dyn CredentialSynthesizer>,
}

impl AppState {
    /// Create application state from configuration
    pub fn new(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        tracing::info!("Data directory: {:?}", config.data_dir);

        let sqlite = Arc::new(SqliteDb::new(&config.database_path)?);
        let security = Arc::new(SecurityManager::new(&config.data_dir)?);
        let aggregator: Arc<dyn Aggregator> = Arc::new(BelvoClient::new(&config.aggregator)?);

        tracing::info!(
            "Aggregator '{}' at {}",
            aggregator.id(),
            config.aggregator.base_url
        );

        Ok(Self {
            config,
            sqlite,
            security,
            aggregator,
            credentials: Arc::new(SandboxCredentialSynthesizer::default()),
        })
    }

    /// Assemble state from already-built components
    pub fn from_parts(
        config: Config,
        sqlite: Arc<SqliteDb>,
        security: Arc<SecurityManager>,
        aggregator: Arc<dyn Aggregator>,
        credentials: Arc<dyn CredentialSynthesizer>,
    ) -> Self {
        Self {
            config,
            sqlite,
            security,
            aggregator,
            credentials,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::aggregator::mock::MockAggregator;

    pub fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "BELVO_CLIENT_ID" => Some("test-id".to_string()),
            "BELVO_SECRET" => Some("test-secret".to_string()),
            _ => None,
        })
        .unwrap()
    }

    /// State over an in-memory store and the given mock aggregator
    pub fn test_state(mock: Arc<MockAggregator>) -> AppState {
        AppState::from_parts(
            test_config(),
            Arc::new(SqliteDb::open_in_memory().unwrap()),
            Arc::new(SecurityManager::ephemeral().unwrap()),
            mock,
            Arc::new(SandboxCredentialSynthesizer::default()),
        )
    }
}
