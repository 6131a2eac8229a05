//! Service configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Credits charged per generation attempt.
pub const DEFAULT_GENERATION_COST: u64 = 5;

/// Starting balance granted to first-seen users (free tier: 10 posts).
pub const DEFAULT_INITIAL_BALANCE: u64 = 50;

/// History entries shown before the list is expanded.
pub const DEFAULT_HISTORY_PREVIEW_LIMIT: usize = 3;

/// Environment variable prefix for configuration overrides.
pub const CONFIG_ENV_PREFIX: &str = "POSTFORGE";

/// Errors loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Underlying file/env source failed to load or deserialize.
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Runtime configuration for the generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Credits charged per generation attempt.
    #[serde(default = "default_generation_cost")]
    pub generation_cost: u64,

    /// Balance granted to first-seen users.
    #[serde(default = "default_initial_balance")]
    pub initial_balance: u64,

    /// History entries shown in the collapsed preview.
    #[serde(default = "default_history_preview_limit")]
    pub history_preview_limit: usize,

    /// Generation provider endpoint URL.
    #[serde(default = "default_provider_endpoint")]
    pub provider_endpoint: String,

    /// Model name forwarded to the provider.
    #[serde(default = "default_provider_model")]
    pub provider_model: String,

    /// Provider request timeout in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Service bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Data directory for the filesystem store. `None` keeps state in
    /// memory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_generation_cost() -> u64 {
    DEFAULT_GENERATION_COST
}

fn default_initial_balance() -> u64 {
    DEFAULT_INITIAL_BALANCE
}

fn default_history_preview_limit() -> usize {
    DEFAULT_HISTORY_PREVIEW_LIMIT
}

fn default_provider_endpoint() -> String {
    "http://127.0.0.1:8091/v1/generate".to_string()
}

fn default_provider_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    60
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            generation_cost: default_generation_cost(),
            initial_balance: default_initial_balance(),
            history_preview_limit: default_history_preview_limit(),
            provider_endpoint: default_provider_endpoint(),
            provider_model: default_provider_model(),
            provider_timeout_secs: default_provider_timeout_secs(),
            bind_address: default_bind_address(),
            data_dir: None,
        }
    }
}

impl ServiceConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file, with `POSTFORGE_*` environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix(CONFIG_ENV_PREFIX))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Load from `POSTFORGE_*` environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix(CONFIG_ENV_PREFIX))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Set the per-generation cost.
    pub fn with_generation_cost(mut self, cost: u64) -> Self {
        self.generation_cost = cost;
        self
    }

    /// Set the first-use balance grant.
    pub fn with_initial_balance(mut self, balance: u64) -> Self {
        self.initial_balance = balance;
        self
    }

    /// Set the history preview size.
    pub fn with_history_preview_limit(mut self, limit: usize) -> Self {
        self.history_preview_limit = limit;
        self
    }

    /// Set the provider endpoint URL.
    pub fn with_provider_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.provider_endpoint = endpoint.into();
        self
    }

    /// Set the provider model name.
    pub fn with_provider_model(mut self, model: impl Into<String>) -> Self {
        self.provider_model = model.into();
        self
    }

    /// Set the service bind address.
    pub fn with_bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }

    /// Set the filesystem store data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Provider request timeout as a [`Duration`].
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}
