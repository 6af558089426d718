//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - batchsave.toml (default configuration)
//! - batchsave.local.toml (git-ignored local overrides)
//! - Environment variables (BATCHSAVE_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # batchsave.toml
//! [api]
//! base_url = "https://agro.example.com"
//!
//! [batch]
//! stop_on_error = true
//! validate_schema = true
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! BATCHSAVE_API__BASE_URL=http://localhost:3000
//! BATCHSAVE_BATCH__STOP_ON_ERROR=false
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::protocol::{BatchOperation, BatchSaveRequest, BATCH_PATH};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the batch endpoint
    #[serde(default = "default_batch_path")]
    pub batch_path: String,

    /// Per-request timeout in milliseconds. 0 = no timeout.
    #[serde(default)]
    pub request_timeout_ms: u64,
}

impl ApiConfig {
    pub fn batch_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.batch_path)
    }
}

/// Flags passed through to the server with every batch request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Server aborts the remaining operations of a call on the first failure
    #[serde(default = "default_true")]
    pub stop_on_error: bool,

    #[serde(default = "default_true")]
    pub validate_dependencies: bool,

    #[serde(default = "default_true")]
    pub validate_schema: bool,

    /// Prefix for the main entity's correlation id
    #[serde(default = "default_temp_id_prefix")]
    pub temp_id_prefix: String,
}

impl BatchConfig {
    /// Build a request carrying these flags.
    pub fn request(&self, operations: Vec<BatchOperation>) -> BatchSaveRequest {
        BatchSaveRequest {
            operations,
            stop_on_error: self.stop_on_error,
            validate_dependencies: self.validate_dependencies,
            validate_schema: self.validate_schema,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_batch_path() -> String {
    BATCH_PATH.to_string()
}
fn default_temp_id_prefix() -> String {
    "main".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. batchsave.toml (base configuration)
    /// 2. batchsave.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (BATCHSAVE_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("batchsave.toml"))
            .merge(Toml::file("batchsave.local.toml"))
            .merge(Env::prefixed("BATCHSAVE_").split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("BATCHSAVE_").split("__"))
            .extract()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_base_url(),
            batch_path: default_batch_path(),
            request_timeout_ms: 0,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            stop_on_error: true,
            validate_dependencies: true,
            validate_schema: true,
            temp_id_prefix: default_temp_id_prefix(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
