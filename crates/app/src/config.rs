//! Application configuration loaded from environment variables.

use queries::LoaderConfig;

/// Demo configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL`: PostgreSQL connection string (default: unset, use the in-memory store)
/// - `LOADER_BATCH_SIZE`: order keys per child query (default: `100`)
/// - `LOADER_ROOT_LIMIT`: maximum orders per root query (default: `1000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: Option<String>,
    pub batch_size: usize,
    pub root_limit: usize,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from `lookup`. Unparseable numbers fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            batch_size: lookup("LOADER_BATCH_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.batch_size),
            root_limit: lookup("LOADER_ROOT_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.root_limit),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    /// Returns the loader configuration. Zero values are rejected later by
    /// [`LoaderConfig::validate`].
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig::default()
            .with_batch_size(self.batch_size)
            .with_root_limit(self.root_limit)
    }
}

impl Default for Config {
    fn default() -> Self {
        let loader = LoaderConfig::default();
        Self {
            database_url: None,
            batch_size: loader.batch_size,
            root_limit: loader.root_limit,
            log_level: "info".to_string(),
        }
    }
}
