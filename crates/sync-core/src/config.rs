//! Configuration management for the sync engine
//!
//! Implements hierarchical configuration loading:
//! 1. Default values in code
//! 2. Environment-specific overrides (config/*.toml)
//! 3. Environment variables (SYNCCORE_*)

use config::{ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application metadata
    pub app: AppConfig,

    /// Storage settings (event store / sync-state store)
    pub storage: StorageConfig,

    /// Server settings
    pub server: ServerConfig,

    /// Sync engine behavior
    pub sync: SyncConfig,

    /// Realtime bus / connection hub settings
    pub bus: BusConfig,
}

/// Application metadata configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name
    pub name: String,

    /// Version string
    pub version: String,

    /// Data directory path
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database backing the event store and
    /// sync-state store.
    pub database_path: PathBuf,

    /// Maximum number of pooled database connections.
    pub max_connections: u32,

    /// Database query timeout in milliseconds.
    pub query_timeout_ms: u64,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Enable CORS
    pub enable_cors: bool,

    /// Secret used to verify JWT principals at the request surface.
    pub jwt_secret: String,
}

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum number of events returned by a single delta-sync call.
    pub max_delta_batch_size: usize,

    /// Maximum number of retry attempts the offline queue will make
    /// before an event is marked `failed`.
    pub offline_retry_budget: u32,

    /// Interval, in seconds, at which the offline-replay job sweeps the
    /// queue for pending events.
    pub offline_replay_interval_secs: u64,
}

/// Realtime bus / connection hub configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Per-user broadcast channel capacity.
    pub channel_capacity: usize,

    /// Heartbeat ping interval, in seconds, for active sessions.
    pub heartbeat_interval_secs: u64,

    /// How long a session waits for a pong before it is closed.
    pub pong_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                name: "sync-core".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                data_dir: dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("bookmarksync"),
                log_level: "info".to_string(),
            },
            storage: StorageConfig {
                database_path: PathBuf::from("sync.db"),
                max_connections: 10,
                query_timeout_ms: 5000,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                enable_cors: true,
                jwt_secret: "change-me-in-production".to_string(),
            },
            sync: SyncConfig {
                max_delta_batch_size: 500,
                offline_retry_budget: 5,
                offline_replay_interval_secs: 30,
            },
            bus: BusConfig {
                channel_capacity: 256,
                heartbeat_interval_secs: 30,
                pong_timeout_secs: 60,
            },
        }
    }
}

impl Config {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration with a custom config directory
    pub fn load_from_path(config_dir: Option<PathBuf>) -> Result<Self> {
        let default_config = Config::default();

        let builder = ConfigBuilder::<config::builder::DefaultState>::default()
            // Start with defaults
            .set_default("app.name", default_config.app.name)?
            .set_default("app.version", default_config.app.version)?
            .set_default(
                "app.data_dir",
                default_config.app.data_dir.to_string_lossy().to_string(),
            )?
            .set_default("app.log_level", default_config.app.log_level)?
            .set_default(
                "storage.database_path",
                default_config
                    .storage
                    .database_path
                    .to_string_lossy()
                    .to_string(),
            )?
            .set_default(
                "storage.max_connections",
                default_config.storage.max_connections as i64,
            )?
            .set_default(
                "storage.query_timeout_ms",
                default_config.storage.query_timeout_ms as i64,
            )?
            .set_default("server.host", default_config.server.host)?
            .set_default("server.port", default_config.server.port as i64)?
            .set_default("server.enable_cors", default_config.server.enable_cors)?
            .set_default("server.jwt_secret", default_config.server.jwt_secret)?
            .set_default(
                "sync.max_delta_batch_size",
                default_config.sync.max_delta_batch_size as i64,
            )?
            .set_default(
                "sync.offline_retry_budget",
                default_config.sync.offline_retry_budget as i64,
            )?
            .set_default(
                "sync.offline_replay_interval_secs",
                default_config.sync.offline_replay_interval_secs as i64,
            )?
            .set_default(
                "bus.channel_capacity",
                default_config.bus.channel_capacity as i64,
            )?
            .set_default(
                "bus.heartbeat_interval_secs",
                default_config.bus.heartbeat_interval_secs as i64,
            )?
            .set_default(
                "bus.pong_timeout_secs",
                default_config.bus.pong_timeout_secs as i64,
            )?;

        // Add config file if exists
        let builder = if let Some(dir) = config_dir {
            let config_file = dir.join("default.toml");
            if config_file.exists() {
                builder.add_source(File::from(config_file))
            } else {
                builder
            }
        } else {
            // Try default locations
            let config_file = PathBuf::from("config/default.toml");
            if config_file.exists() {
                builder.add_source(File::from(config_file))
            } else {
                builder
            }
        };

        // Add environment variables with SYNCCORE_ prefix
        let builder = builder.add_source(
            Environment::with_prefix("SYNCCORE")
                .separator("_")
                .try_parsing(true),
        );

        let settings = builder.build()?;
        let config: Config = settings.try_deserialize()?;

        Ok(config)
    }
}
