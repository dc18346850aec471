//! Process configuration for the catalog store.
//!
//! Sources, lowest to highest precedence: built-in defaults, an optional
//! configuration file, then `CATALOG_*` environment variables using `__` as
//! the nesting separator (`CATALOG_DATABASE__NAME=/var/lib/catalog.db`).

use crate::db::PoolOptions;
use crate::logging::default_log_level;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "CATALOG";
const IN_MEMORY_NAME: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`.
    pub name: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
    pub connection_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// File logging is enabled only when set. Must be absolute.
    #[serde(default)]
    pub dir: Option<String>,
}

impl CatalogConfig {
    /// Loads defaults, then `file` when given and present, then environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Self::defaults()?;
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(false));
        }
        let builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        Self::from_builder(builder)
    }

    /// Builder pre-filled with every default value.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let pool = PoolOptions::default();
        Config::builder()
            .set_default("database.name", "catalog-manager.db")?
            .set_default("database.max_connections", pool.max_connections)?
            .set_default(
                "database.busy_timeout_ms",
                duration_ms(pool.busy_timeout),
            )?
            .set_default(
                "database.connection_timeout_ms",
                duration_ms(pool.connection_timeout),
            )?
            .set_default("logging.level", default_log_level())
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.name.trim() == IN_MEMORY_NAME
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections.max(1),
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            connection_timeout: Duration::from_millis(self.connection_timeout_ms),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
