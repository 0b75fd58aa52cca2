use std::sync::Arc;

use crate::app::error::{AdlogError, Result};
use crate::config::{Config, ConfigError};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::ingest::Ingestor;
use crate::media::{HttpImageAcquirer, ImageAcquirer};
use crate::store::{ListingStore, SqliteStore};

pub struct AppContext {
    pub config: Config,
    pub ingestor: Arc<Ingestor>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config.storage.database_path().map_err(config_error)?;
        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    /// Context backed by an in-memory database; images still go to the
    /// configured media root.
    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let media_root = config.storage.media_root().map_err(config_error)?;

        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.http)?);
        let images: Arc<dyn ImageAcquirer + Send + Sync> =
            Arc::new(HttpImageAcquirer::new(&config.http, media_root)?);
        let store: Arc<dyn ListingStore + Send + Sync> = store;

        let ingestor = Arc::new(Ingestor::new(store, fetcher, images));

        Ok(Self { config, ingestor })
    }

    pub fn media_url_prefix(&self) -> &str {
        &self.config.storage.media_url_prefix
    }
}

fn config_error(e: ConfigError) -> AdlogError {
    AdlogError::Config(e.to_string())
}
