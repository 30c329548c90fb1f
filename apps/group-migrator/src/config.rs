//! Configuration module for the group migration worker.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;

use idbridge_db::DEFAULT_MAX_CONNECTIONS;
use idbridge_groups::{MigrationConfig, WorkerConfig};
use thiserror::Error;

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Worker configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` connection string.
    pub database_url: String,

    /// Size of the connection pool.
    pub max_connections: u32,

    /// Default log filter, used when `RUST_LOG` is not set.
    pub rust_log: String,

    /// Apply the bundled schema migrations on startup.
    pub run_migrations: bool,

    pub migration: MigrationConfig,

    pub worker: WorkerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// # Required Variables
    ///
    /// - `DATABASE_URL` - `PostgreSQL` connection string
    ///
    /// # Optional Variables
    ///
    /// - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 5)
    /// - `RUST_LOG` - Log level filter (default: "info")
    /// - `RUN_DB_MIGRATIONS` - Apply schema migrations on startup (default: false)
    /// - `MIGRATION_SWEEP_INTERVAL_SECS` - Full pool sweep interval (default: 3600)
    /// - `MIGRATION_QUEUE_CAPACITY` - Queued job limit (default: 256)
    /// - `MIGRATION_CONFIG_NAMESPACE` - Namespace of the candidate record
    /// - `MIGRATION_CANDIDATES_KEY` - Key of the candidate record
    /// - `MIGRATION_LEGACY_BACKEND` - Backend groups are migrated from
    /// - `MIGRATION_FEDERATED_BACKEND` - Backend groups are migrated to
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development only)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.is_empty());

        let database_url =
            var("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let max_connections: u32 =
            parse_or("DATABASE_MAX_CONNECTIONS", var("DATABASE_MAX_CONNECTIONS"), DEFAULT_MAX_CONNECTIONS)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                var: "DATABASE_MAX_CONNECTIONS".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        let rust_log = var("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let run_migrations = match var("RUN_DB_MIGRATIONS") {
            Some(value) => parse_flag("RUN_DB_MIGRATIONS", &value)?,
            None => false,
        };

        let worker_defaults = WorkerConfig::default();
        let sweep_interval_secs: u64 = parse_or(
            "MIGRATION_SWEEP_INTERVAL_SECS",
            var("MIGRATION_SWEEP_INTERVAL_SECS"),
            worker_defaults.sweep_interval_secs,
        )?;
        if sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "MIGRATION_SWEEP_INTERVAL_SECS".to_string(),
                message: "Must be at least 1 second".to_string(),
            });
        }
        let queue_capacity: usize = parse_or(
            "MIGRATION_QUEUE_CAPACITY",
            var("MIGRATION_QUEUE_CAPACITY"),
            worker_defaults.queue_capacity,
        )?;

        let defaults = MigrationConfig::default();
        let migration = MigrationConfig {
            config_namespace: var("MIGRATION_CONFIG_NAMESPACE").unwrap_or(defaults.config_namespace),
            candidates_key: var("MIGRATION_CANDIDATES_KEY").unwrap_or(defaults.candidates_key),
            legacy_backend: var("MIGRATION_LEGACY_BACKEND").unwrap_or(defaults.legacy_backend),
            federated_backend: var("MIGRATION_FEDERATED_BACKEND").unwrap_or(defaults.federated_backend),
        };

        if migration.legacy_backend == migration.federated_backend {
            return Err(ConfigError::InvalidValue {
                var: "MIGRATION_FEDERATED_BACKEND".to_string(),
                message: "Must differ from MIGRATION_LEGACY_BACKEND".to_string(),
            });
        }

        Ok(Self {
            database_url,
            max_connections,
            rust_log,
            run_migrations,
            migration,
            worker: WorkerConfig {
                sweep_interval_secs,
                queue_capacity,
            },
        })
    }
}

fn parse_or<T>(var: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_flag(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("Expected a boolean, got '{other}'"),
        }),
    }
}
