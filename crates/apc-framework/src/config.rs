//! # Runtime Configuration
//!
//! [`RuntimeConfig`] sizes the worker pool and the mailbox buffers. Values can
//! come from a TOML document, from `APC_*` environment variables, or from
//! [`Default`]. Missing keys fall back to their defaults.
//!
//! ```toml
//! worker_threads = 8
//! thread_name_prefix = "apc-worker"
//! initial_buffer_capacity = 16
//! ```

use std::path::Path;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::buffered::DEFAULT_INITIAL_BUFFER_CAPACITY;

pub const ENV_WORKER_THREADS: &str = "APC_WORKER_THREADS";
pub const ENV_THREAD_NAME_PREFIX: &str = "APC_THREAD_NAME_PREFIX";
pub const ENV_INITIAL_BUFFER_CAPACITY: &str = "APC_INITIAL_BUFFER_CAPACITY";

const FALLBACK_WORKER_THREADS: usize = 4;

/// Errors raised while loading a [`RuntimeConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("worker_threads must be at least 1")]
    NoWorkers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of OS threads in the worker pool.
    pub worker_threads: usize,
    /// Worker threads are named `{prefix}-{index}`.
    pub thread_name_prefix: String,
    /// Sizing hint for outbox batches of newly spawned actors.
    pub initial_buffer_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(FALLBACK_WORKER_THREADS),
            thread_name_prefix: "apc-worker".to_string(),
            initial_buffer_capacity: DEFAULT_INITIAL_BUFFER_CAPACITY,
        }
    }
}

impl RuntimeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Defaults overridden by any `APC_*` variables present in the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`RuntimeConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_WORKER_THREADS) {
            config.worker_threads = parse_usize(ENV_WORKER_THREADS, value)?;
        }
        if let Some(value) = lookup(ENV_THREAD_NAME_PREFIX) {
            config.thread_name_prefix = value;
        }
        if let Some(value) = lookup(ENV_INITIAL_BUFFER_CAPACITY) {
            config.initial_buffer_capacity = parse_usize(ENV_INITIAL_BUFFER_CAPACITY, value)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }
}

fn parse_usize(key: &'static str, value: String) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { key, value })
}
