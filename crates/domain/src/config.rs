//! Configuration structures
//!
//! Plain data carried between the loader and the components it configures.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DB_FILE, DEFAULT_POOL_SIZE, DEFAULT_STRICT_MODE};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Queue behaviour settings.
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path.
    pub path: String,
    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

/// Queue behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// When true, payloads are validated as structured JSON objects before
    /// they are persisted.
    #[serde(default = "default_strict")]
    pub strict: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { strict: DEFAULT_STRICT_MODE }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: DEFAULT_DB_FILE.to_string(), pool_size: DEFAULT_POOL_SIZE }
    }
}

fn default_pool_size() -> u32 {
    DEFAULT_POOL_SIZE
}

fn default_strict() -> bool {
    DEFAULT_STRICT_MODE
}
