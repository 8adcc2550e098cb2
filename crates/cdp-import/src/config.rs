//! Configuration management for the import pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ImportError;

// ============================================================================
// Import Configuration Constants
// ============================================================================

/// Default remote location serving the bulk snapshot archives.
pub const DEFAULT_BASE_URL: &str = "https://storage.courtlistener.com/bulk-data";

/// Default local cache directory for downloaded archives and checkpoints.
pub const DEFAULT_CACHE_DIR: &str = "./data/cache";

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/cdp";

/// Default HTTP request timeout in seconds (archives are multi-gigabyte).
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 600;

/// Default database connection timeout in seconds.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default maximum database connections in the pool.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Maximum number of retry attempts for fetch and persistence operations.
pub const MAX_RETRIES: u32 = 3;

/// Base delay between retry attempts (in seconds). Actual delay is this
/// value multiplied by the attempt number (linear backoff).
pub const RETRY_DELAY_SECS: u64 = 5;

/// Seconds between checkpoint saves. Bounds rework on crash to at most one
/// interval's worth of lines without amplifying I/O per record.
pub const DEFAULT_CHECKPOINT_INTERVAL_SECS: u64 = 5;

/// Seconds between progress report lines.
pub const DEFAULT_PROGRESS_INTERVAL_SECS: u64 = 10;

// ============================================================================
// Jurisdiction Defaults (California)
// ============================================================================

/// Identifier prefix of the target state's courts.
pub const DEFAULT_STATE_PREFIX: &str = "cal";

/// Federal courts sitting in the target state.
pub const DEFAULT_FEDERAL_COURT_IDS: &[&str] = &[
    "ca9", "cacd", "caed", "cand", "casd", "cacb", "caeb", "canb", "casb",
];

/// Jurisdiction code matched against the record's jurisdiction field.
pub const DEFAULT_JURISDICTION_CODE: &str = "CA";

/// State name token matched against display names.
pub const DEFAULT_STATE_NAME: &str = "California";

/// State abbreviation token matched against location text.
pub const DEFAULT_STATE_ABBREVIATION: &str = "CA";

/// Top-level import configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Remote base URL the dataset archives are fetched from
    pub base_url: String,

    /// Local cache directory for archives and checkpoint files
    pub cache_dir: PathBuf,

    /// Database connection
    pub database: DatabaseConfig,

    /// Jurisdiction inclusion rules
    pub jurisdiction: JurisdictionConfig,

    /// HTTP request timeout in seconds
    pub http_timeout_secs: u64,

    /// Seconds between checkpoint saves
    pub checkpoint_interval_secs: u64,

    /// Seconds between progress reports
    pub progress_interval_secs: u64,

    /// Maximum retry attempts for fetch and persistence operations
    pub max_retries: u32,

    /// Base delay between retry attempts in milliseconds (linear backoff)
    pub retry_delay_ms: u64,

    /// Relax the courts-before-judges ordering and run both datasets
    /// concurrently. Off by default.
    pub concurrent_datasets: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Rules restricting the nationwide datasets to one jurisdiction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionConfig {
    /// Court identifiers beginning with this prefix are included
    pub state_prefix: String,

    /// Federal court identifiers included regardless of prefix
    pub federal_court_ids: Vec<String>,

    /// Records whose jurisdiction field equals this code are included
    pub jurisdiction_code: String,

    /// Records whose display name contains this token are included
    pub state_name: String,

    /// Records whose location text contains this token (as a word) are
    /// included
    pub state_abbreviation: String,
}

impl Default for JurisdictionConfig {
    fn default() -> Self {
        Self {
            state_prefix: DEFAULT_STATE_PREFIX.to_string(),
            federal_court_ids: DEFAULT_FEDERAL_COURT_IDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            jurisdiction_code: DEFAULT_JURISDICTION_CODE.to_string(),
            state_name: DEFAULT_STATE_NAME.to_string(),
            state_abbreviation: DEFAULT_STATE_ABBREVIATION.to_string(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DB_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DB_CONNECT_TIMEOUT_SECS,
            },
            jurisdiction: JurisdictionConfig::default(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            checkpoint_interval_secs: DEFAULT_CHECKPOINT_INTERVAL_SECS,
            progress_interval_secs: DEFAULT_PROGRESS_INTERVAL_SECS,
            max_retries: MAX_RETRIES,
            retry_delay_ms: RETRY_DELAY_SECS * 1000,
            concurrent_datasets: false,
        }
    }
}

impl ImportConfig {
    /// Load configuration from environment and defaults
    ///
    /// Environment variables:
    /// - `CDP_BASE_URL`: remote snapshot location
    /// - `CDP_CACHE_DIR`: local archive/checkpoint cache directory
    /// - `DATABASE_URL`: entity store connection string
    /// - `DATABASE_MAX_CONNECTIONS`, `DATABASE_CONNECT_TIMEOUT`
    /// - `CDP_HTTP_TIMEOUT`, `CDP_CHECKPOINT_INTERVAL`, `CDP_PROGRESS_INTERVAL`
    /// - `CDP_CONCURRENT_DATASETS`: set to "true" to relax dataset ordering
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(url) = std::env::var("CDP_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(dir) = std::env::var("CDP_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(val) = std::env::var("DATABASE_MAX_CONNECTIONS") {
            if let Ok(parsed) = val.parse() {
                config.database.max_connections = parsed;
            }
        }
        if let Ok(val) = std::env::var("DATABASE_CONNECT_TIMEOUT") {
            if let Ok(parsed) = val.parse() {
                config.database.connect_timeout_secs = parsed;
            }
        }
        if let Ok(val) = std::env::var("CDP_HTTP_TIMEOUT") {
            if let Ok(parsed) = val.parse() {
                config.http_timeout_secs = parsed;
            }
        }
        if let Ok(val) = std::env::var("CDP_CHECKPOINT_INTERVAL") {
            if let Ok(parsed) = val.parse() {
                config.checkpoint_interval_secs = parsed;
            }
        }
        if let Ok(val) = std::env::var("CDP_PROGRESS_INTERVAL") {
            if let Ok(parsed) = val.parse() {
                config.progress_interval_secs = parsed;
            }
        }
        if let Ok(val) = std::env::var("CDP_MAX_RETRIES") {
            if let Ok(parsed) = val.parse() {
                config.max_retries = parsed;
            }
        }
        if let Ok(val) = std::env::var("CDP_RETRY_DELAY_MS") {
            if let Ok(parsed) = val.parse() {
                config.retry_delay_ms = parsed;
            }
        }
        if let Ok(val) = std::env::var("CDP_CONCURRENT_DATASETS") {
            config.concurrent_datasets = val.eq_ignore_ascii_case("true") || val == "1";
        }

        Ok(config)
    }

    /// Validate the configuration before any dataset starts
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.base_url.trim().is_empty() {
            return Err(ImportError::Configuration(
                "base URL must not be empty".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ImportError::Configuration(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        if self.database.url.trim().is_empty() {
            return Err(ImportError::Configuration(
                "database URL must not be empty".to_string(),
            ));
        }
        if self.jurisdiction.state_prefix.trim().is_empty() {
            return Err(ImportError::Configuration(
                "jurisdiction state prefix must not be empty".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(ImportError::Configuration(
                "max retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
