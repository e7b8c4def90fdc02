//! Configuration for Elevator
//!
//! Centralized configuration with sensible defaults. A configuration file is
//! TOML with one section per concern:
//!
//! ```toml
//! [server]
//! endpoint = "127.0.0.1:4141"
//! num_workers = 5
//!
//! [core]
//! store_path = "/var/lib/elevator/store.json"
//! storage_path = "/var/lib/elevator"
//! default_db = "default"
//!
//! [storage_engine]
//! cache_size = 536870912
//!
//! [log]
//! level = "info"
//! ```
//!
//! Every field is optional; missing fields keep their default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ElevatorError, Result};

/// Main configuration for an Elevator server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network and worker pool settings
    pub server: ServerConfig,

    /// Store layout: manifest, storage root, default database
    pub core: CoreConfig,

    /// Tuning knobs handed to the storage engine on every mount
    pub storage_engine: EngineOptions,

    /// Logging settings
    pub log: LogConfig,
}

/// Server specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP listen address (host:port)
    pub endpoint: String,

    /// Number of workers pulling requests off the inbound queue
    pub num_workers: usize,

    /// Optional pid file written on startup and removed on exit
    pub pidfile: Option<PathBuf>,
}

/// Store specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Manifest file describing registered databases
    pub store_path: PathBuf,

    /// Root directory under which named databases are stored
    pub storage_path: PathBuf,

    /// Database created when no manifest can be loaded
    pub default_db: String,
}

/// Storage engine options, passed through unmodified to [`crate::engine::Engine::open`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub compression: bool,
    pub block_size: usize,
    /// Page cache size (in bytes)
    pub cache_size: usize,
    pub bloom_filter_bits: usize,
    pub max_open_files: usize,
    /// Run a full integrity check when a database is opened
    pub verify_checksums: bool,
    pub write_buffer_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:4141".to_string(),
            num_workers: 5,
            pidfile: None,
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("/var/lib/elevator/store.json"),
            storage_path: PathBuf::from("/var/lib/elevator"),
            default_db: "default".to_string(),
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            compression: true,
            block_size: 131072,
            cache_size: 512 * 1024 * 1024, // 512 MB
            bloom_filter_bits: 100,
            max_open_files: 150,
            verify_checksums: false,
            write_buffer_size: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Read and parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ElevatorError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_toml(&content).map_err(|e| {
            ElevatorError::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        tracing::info!("Loaded configuration file {}", path.display());
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| ElevatorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.endpoint.trim().is_empty() {
            return Err(ElevatorError::Config("endpoint must not be empty".to_string()));
        }
        if self.server.num_workers == 0 {
            return Err(ElevatorError::Config(
                "num_workers must be at least 1".to_string(),
            ));
        }
        if self.core.default_db.trim().is_empty() {
            return Err(ElevatorError::Config(
                "default_db must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.server.endpoint = endpoint.into();
        self
    }

    /// Set the worker pool size
    pub fn num_workers(mut self, count: usize) -> Self {
        self.config.server.num_workers = count;
        self
    }

    /// Set the pid file path
    pub fn pidfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.server.pidfile = Some(path.into());
        self
    }

    /// Set the manifest file path
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.core.store_path = path.into();
        self
    }

    /// Set the storage root directory
    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.core.storage_path = path.into();
        self
    }

    /// Set the default database name
    pub fn default_db(mut self, name: impl Into<String>) -> Self {
        self.config.core.default_db = name.into();
        self
    }

    /// Replace the storage engine options
    pub fn engine_options(mut self, options: EngineOptions) -> Self {
        self.config.storage_engine = options;
        self
    }

    /// Set the engine cache size (in bytes)
    pub fn cache_size(mut self, bytes: usize) -> Self {
        self.config.storage_engine.cache_size = bytes;
        self
    }

    /// Set the default log level
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log.level = level.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
