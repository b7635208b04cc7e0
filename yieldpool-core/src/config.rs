//! Pool configuration — TOML-serializable description of a pool.
//!
//! ```toml
//! owner = "treasury"
//! max_strategies = 16
//!
//! [[strategies]]
//! name = "staked_eth"
//! weight = 1
//! adapter = { type = "SIMULATED", initial_balance = 0 }
//!
//! [[strategies]]
//! name = "legacy_vault"
//! weight = 0
//! enabled = false
//! adapter = { type = "FAILING" }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::DEFAULT_MAX_STRATEGIES;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse pool TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid pool config: {0}")]
    Invalid(String),
}

fn default_max_strategies() -> usize {
    DEFAULT_MAX_STRATEGIES
}

fn default_enabled() -> bool {
    true
}

/// Serializable description of a pool and its initial strategies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolConfig {
    pub owner: String,

    #[serde(default = "default_max_strategies")]
    pub max_strategies: usize,

    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
}

/// One registry entry to create at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyConfig {
    pub name: String,

    /// Signed so that a negative weight is reported, not mis-parsed.
    pub weight: i64,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    pub adapter: AdapterConfig,
}

/// Which adapter implementation backs a strategy.
///
/// Amounts are `u64` here because TOML integers are 64-bit; the factory
/// widens them to pool amounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdapterConfig {
    /// In-memory venue.
    Simulated {
        #[serde(default)]
        initial_balance: u64,
        #[serde(default)]
        capacity: Option<u64>,
        #[serde(default)]
        paused: bool,
    },

    /// Venue that rejects every call.
    Failing {
        #[serde(default)]
        stuck_balance: u64,
    },
}

impl PoolConfig {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            max_strategies: DEFAULT_MAX_STRATEGIES,
            strategies: Vec::new(),
        }
    }

    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string and validate it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that do not need a live pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.trim().is_empty() {
            return Err(ConfigError::Invalid("owner must not be empty".into()));
        }
        if self.max_strategies == 0 {
            return Err(ConfigError::Invalid("max_strategies must be at least 1".into()));
        }
        if self.strategies.len() > self.max_strategies {
            return Err(ConfigError::Invalid(format!(
                "{} strategies configured, max_strategies is {}",
                self.strategies.len(),
                self.max_strategies
            )));
        }

        let mut seen = HashSet::new();
        for s in &self.strategies {
            if s.name.trim().is_empty() {
                return Err(ConfigError::Invalid("strategy name must not be empty".into()));
            }
            if !seen.insert(s.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate strategy name '{}'",
                    s.name
                )));
            }
            if s.weight < 0 {
                return Err(ConfigError::Invalid(format!(
                    "strategy '{}' has negative weight {}",
                    s.name, s.weight
                )));
            }
        }
        Ok(())
    }
}
