//! Configuration for the `refrain` CLI
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. A TOML file: `--config`, else `REFRAIN_CONFIG_PATH`, else `refrain.toml`
//!    in the working directory if present
//! 3. `REFRAIN_*` environment variables (a `.env` file is loaded first)
//! 4. Explicit overrides set on [`ConfigBuilder`]

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::samples::MAX_TRIANGULAR_SEED;

const ENV_PREFIX: &str = "REFRAIN";
const CONFIG_PATH_VAR: &str = "REFRAIN_CONFIG_PATH";
const DEFAULT_CONFIG_NAME: &str = "refrain";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Effective configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_level: String,

    /// Byte budget for recursive continuation storage (unlimited if unset)
    pub budget_bytes: Option<usize>,

    /// Seed for `triangular` when `--seed` is not given
    pub default_seed: u64,

    /// Exclusive end for `range` when `--end` is not given
    pub default_range_end: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            budget_bytes: None,
            default_seed: 50,
            default_range_end: 10,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from the default sources with no overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log_level must not be empty".to_string()));
        }
        if let Err(err) = EnvFilter::try_new(&self.log_level) {
            return Err(ConfigError::Invalid(format!(
                "log_level `{}` is not a valid filter: {}",
                self.log_level, err
            )));
        }
        if self.budget_bytes == Some(0) {
            return Err(ConfigError::Invalid(
                "budget_bytes must be greater than zero".to_string(),
            ));
        }
        if self.default_seed > MAX_TRIANGULAR_SEED {
            return Err(ConfigError::Invalid(format!(
                "default_seed must be at most {}",
                MAX_TRIANGULAR_SEED
            )));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

/// Builder that layers explicit overrides on top of the loaded sources
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    log_level: Option<String>,
    budget_bytes: Option<usize>,
}

impl ConfigBuilder {
    /// Set the config file path (overrides default search)
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn log_level(mut self, level: Option<String>) -> Self {
        self.log_level = level;
        self
    }

    pub fn budget_bytes(mut self, budget: Option<usize>) -> Self {
        self.budget_bytes = budget;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        dotenvy::dotenv().ok();

        let path = self
            .config_path
            .or_else(|| env::var_os(CONFIG_PATH_VAR).map(PathBuf::from));

        let mut sources = config::Config::builder();
        sources = match &path {
            Some(path) => sources.add_source(config::File::from(path.as_path())),
            None => sources.add_source(config::File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };
        sources = sources.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let mut config: Config = sources.build()?.try_deserialize()?;

        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(budget) = self.budget_bytes {
            config.budget_bytes = Some(budget);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Serializes tests that touch the process environment
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
