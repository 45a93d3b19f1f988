// Runtime configuration, read from the environment (and a `.env` file).

use std::{env, path::PathBuf, sync::Arc};

use dotenvy::dotenv;
use tracing::info;

use crate::currency::{CurrencyConverter, CurrencyError};
use crate::orchestrator::Resolver;
use crate::sqlite::SqliteStore;
use crate::store::StoreError;

pub const DB_PATH_ENV: &str = "ITINERARY_DB_PATH";
pub const RATES_PATH_ENV: &str = "ITINERARY_RATES_PATH";
pub const LOG_FILTER_ENV: &str = "RUST_LOG";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite file backing the request cache; `None` disables caching.
    pub database: Option<PathBuf>,
    /// ECB rate document; `None` uses the embedded snapshot.
    pub rates: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            rates: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        // a missing .env file is fine
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            database: non_empty(DB_PATH_ENV).map(PathBuf::from),
            rates: non_empty(RATES_PATH_ENV).map(PathBuf::from),
            log_filter: non_empty(LOG_FILTER_ENV).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    pub fn load_converter(&self) -> Result<CurrencyConverter, CurrencyError> {
        match &self.rates {
            Some(path) => {
                info!("Loading exchange rates from {}", path.display());
                CurrencyConverter::from_path(path)
            }
            None => CurrencyConverter::embedded(),
        }
    }

    pub fn open_store(&self) -> Result<Option<SqliteStore>, StoreError> {
        self.database.as_ref().map(SqliteStore::open).transpose()
    }

    /// Loads the rate table once and wires it, plus the optional store, into a resolver.
    pub fn build_resolver(&self) -> anyhow::Result<Resolver> {
        let converter = Arc::new(self.load_converter()?);
        let resolver = Resolver::new(converter);

        Ok(match self.open_store()? {
            Some(store) => resolver.with_store(Arc::new(store)),
            None => resolver,
        })
    }
}
