//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `REQUEUE_DB_PATH`: Database file path
//! - `REQUEUE_DB_POOL_SIZE`: Connection pool size (optional)
//! - `REQUEUE_STRICT`: Whether strict payload validation is enabled
//!   (optional, true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.toml` or `./config.json` (current working directory)
//! 2. `./requeue.toml` or `./requeue.json` (current working directory)
//! 3. The same names in the parent directory

use std::path::{Path, PathBuf};

use requeue_domain::constants::{DEFAULT_POOL_SIZE, DEFAULT_STRICT_MODE};
use requeue_domain::{Config, DatabaseConfig, QueueConfig, RequeueError, Result};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `RequeueError::Config` if configuration cannot be loaded from
/// either source, the file format is invalid, or required fields are
/// missing.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `REQUEUE_DB_PATH` must be present; the remaining variables fall back to
/// their defaults.
///
/// # Errors
/// Returns `RequeueError::Config` if `REQUEUE_DB_PATH` is missing or a
/// present variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let db_path = env_var("REQUEUE_DB_PATH")?;

    let pool_size = match std::env::var("REQUEUE_DB_POOL_SIZE") {
        Ok(raw) => raw
            .parse::<u32>()
            .map_err(|e| RequeueError::Config(format!("Invalid pool size: {e}")))?,
        Err(_) => DEFAULT_POOL_SIZE,
    };
    let strict = env_bool("REQUEUE_STRICT", DEFAULT_STRICT_MODE);

    Ok(Config {
        database: DatabaseConfig { path: db_path, pool_size },
        queue: QueueConfig { strict },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `RequeueError::Config` if the file is not found, no probed
/// location holds a config file, or the contents fail to parse.
pub fn load_from_file(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => probe_config_paths().ok_or_else(|| {
            RequeueError::Config("No configuration file found in probed locations".into())
        })?,
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| {
        RequeueError::Config(format!("Failed to read {}: {e}", path.display()))
    })?;

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&contents)
            .map_err(|e| RequeueError::Config(format!("Invalid TOML: {e}")))?,
        Some("json") => serde_json::from_str(&contents)
            .map_err(|e| RequeueError::Config(format!("Invalid JSON: {e}")))?,
        _ => {
            return Err(RequeueError::Config(format!(
                "Unsupported config format: {}",
                path.display()
            )))
        }
    };

    tracing::info!(path = %path.display(), "Configuration loaded from file");
    Ok(config)
}

fn probe_config_paths() -> Option<PathBuf> {
    const CANDIDATES: [&str; 4] = ["config.toml", "config.json", "requeue.toml", "requeue.json"];

    for dir in [Path::new("."), Path::new("..")] {
        for name in CANDIDATES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| RequeueError::Config(format!("Missing environment variable: {name}")))
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name).map_or(default, |raw| raw.eq_ignore_ascii_case("true") || raw == "1")
}
