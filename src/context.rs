use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;

use crate::config::{AppConfig, ConfigError};
use crate::db::{Database, Store};
use crate::error::AppError;

pub type SharedContext = Arc<AppContext>;

/// Everything a request handler needs, built once at startup.
#[derive(Debug)]
pub struct AppContext {
    config: AppConfig,
    tz: Tz,
    database: Database,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let tz = config.tz()?;
        let database = Database::new(config.database_path());
        Ok(Self {
            config,
            tz,
            database,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub async fn initialize(&self) -> Result<(), AppError> {
        let database = self.database.clone();
        let seed = self.config.seed_demo_data;
        tokio::task::spawn_blocking(move || database.initialize(seed, Utc::now())).await??;
        Ok(())
    }

    /// Runs `op` on a fresh connection off the async runtime. The connection
    /// is closed when `op` returns, whatever the outcome.
    pub async fn with_store<T, F>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Store) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let database = self.database.clone();
        tokio::task::spawn_blocking(move || {
            let mut store = database.open()?;
            op(&mut store)
        })
        .await?
    }
}
