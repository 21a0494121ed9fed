//! Shared pipeline logic used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! fetch -> decode -> normalize -> classify/join -> variation
//!
//! The command handlers in `app` then only deal with presentation.

use std::path::Path;

use chrono::Utc;

use crate::app::cache::FetchCache;
use crate::classify::ReferenceTable;
use crate::data::{TesouroClient, parse_market_json};
use crate::domain::{MarketSnapshot, VariationOutcome};
use crate::error::AppError;
use crate::io::ingest::{IngestedQuotes, decode_body, parse_prices_csv};
use crate::variation::{VariationQuery, compute_variation};

/// Settings read from the environment (after `.env`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppConfig {
    pub cache_bucket_secs: i64,
}

const ENV_CACHE_BUCKET_SECS: &str = "TD_CACHE_BUCKET_SECS";

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let cache_bucket_secs = match std::env::var(ENV_CACHE_BUCKET_SECS) {
            Ok(raw) => raw.trim().parse::<i64>().map_err(|_| {
                AppError::input(format!(
                    "{ENV_CACHE_BUCKET_SECS} must be a whole number of seconds, got '{raw}'."
                ))
            })?,
            Err(_) => crate::app::cache::DEFAULT_BUCKET_SECS,
        };
        Ok(Self { cache_bucket_secs })
    }
}

/// History loaded for one run, with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedHistory {
    pub source: String,
    pub ingest: IngestedQuotes,
}

/// One CLI invocation: HTTP client plus the bodies fetched so far.
pub struct Session {
    client: TesouroClient,
    cache: FetchCache,
}

impl Session {
    pub fn from_env() -> Result<Self, AppError> {
        let config = AppConfig::from_env()?;
        let client = TesouroClient::from_env()?;
        Ok(Self::new(client, FetchCache::new(config.cache_bucket_secs)))
    }

    pub fn new(client: TesouroClient, cache: FetchCache) -> Self {
        Self { client, cache }
    }

    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, AppError> {
        let client = &self.client;
        self.cache.get_or_fetch(url, Utc::now(), |u| client.fetch_body(u))
    }

    /// Price history from a local file or the published CSV.
    pub fn load_history(&mut self, file: Option<&Path>) -> Result<LoadedHistory, AppError> {
        let (source, bytes) = match file {
            Some(path) => {
                let bytes = std::fs::read(path).map_err(|e| {
                    AppError::input(format!("Failed to read CSV '{}': {e}", path.display()))
                })?;
                (path.display().to_string(), bytes)
            }
            None => {
                let url = self.client.prices_csv_url().to_string();
                let bytes = self.fetch(&url)?;
                (url, bytes)
            }
        };
        let ingest = parse_prices_csv(&decode_body(&bytes))?;
        tracing::info!(
            source = %source,
            rows_used = ingest.rows_used,
            rows_dropped = ingest.row_errors.len(),
            "loaded price history"
        );
        Ok(LoadedHistory { source, ingest })
    }

    pub fn load_market(&mut self) -> Result<MarketSnapshot, AppError> {
        let url = self.client.market_api_url().to_string();
        let bytes = self.fetch(&url)?;
        let snapshot = parse_market_json(&decode_body(&bytes))?;
        tracing::info!(quotes = snapshot.quotes.len(), status = %snapshot.status.status, "loaded market snapshot");
        Ok(snapshot)
    }
}

/// Built-in table unless a path is given.
pub fn load_reference(path: Option<&Path>) -> Result<ReferenceTable, AppError> {
    let table = match path {
        Some(p) => ReferenceTable::load(p)?,
        None => ReferenceTable::embedded()?,
    };
    tracing::debug!(rows = table.len(), custom = path.is_some(), "loaded reference table");
    Ok(table)
}

/// Run the variation engine on already-normalized history.
pub fn run_variation(
    history: &LoadedHistory,
    reference: &ReferenceTable,
    query: VariationQuery,
) -> VariationOutcome {
    let outcome = compute_variation(&history.ingest.quotes, reference, query);
    if let VariationOutcome::Computed(report) = &outcome {
        tracing::info!(
            latest = %report.latest_date,
            previous = %report.previous_date,
            groups = report.records.len(),
            "variation computed"
        );
    }
    outcome
}
