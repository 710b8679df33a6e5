use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{EddyError, Result};
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::parallel::Ingestor;
use crate::fetcher::Fetcher;
use crate::store::sqlite::SqliteStore;

/// Wires the store, fetcher and ingestor together. Every component receives
/// its collaborators explicitly; there is no ambient global state.
pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub ingestor: Ingestor,
}

impl AppContext {
    pub fn new(config: &Config) -> Result<Self> {
        let db_path = match &config.database.path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let fetcher: Arc<dyn Fetcher + Send + Sync> =
            Arc::new(HttpFetcher::with_timeout(config.fetch.timeout_secs));
        let ingestor = Ingestor::with_workers(fetcher, config.fetch.workers);

        Ok(Self { store, ingestor })
    }

    pub fn in_memory() -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new());
        let ingestor = Ingestor::new(fetcher);

        Ok(Self { store, ingestor })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| EddyError::Config("Could not find data directory".into()))?;
        let eddy_dir = data_dir.join("eddy");
        std::fs::create_dir_all(&eddy_dir)?;
        Ok(eddy_dir.join("eddy.db"))
    }
}
