//! Scenario files — a pool description plus a scripted sequence of steps.
//!
//! ```toml
//! name = "proportional_split"
//! description = "1:3 weights split a 400 deposit into 100 / 300"
//!
//! [pool]
//! owner = "treasury"
//!
//! [[pool.strategies]]
//! name = "steth"
//! weight = 1
//! adapter = { type = "SIMULATED" }
//!
//! [[steps]]
//! action = "deposit"
//! holder = "alice"
//! amount = 400
//!
//! [[steps]]
//! action = "set_weight"
//! caller = "mallory"
//! strategy = "steth"
//! weight = 5
//! expect_error = true
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use yieldpool_core::{ConfigError, PoolConfig, StrategyConfig};

/// Errors from loading a scenario file.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse scenario TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("scenario '{name}': {source}")]
    Pool { name: String, source: ConfigError },

    #[error("scenario name must not be empty")]
    Unnamed,
}

/// A pool plus the operations to run against it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub pool: PoolConfig,

    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// One scripted step and whether it is supposed to be rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepSpec {
    #[serde(flatten)]
    pub step: Step,

    #[serde(default)]
    pub expect_error: bool,
}

/// Refers to a strategy by registry index or by configured name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StrategyRef {
    Index(usize),
    Name(String),
}

impl fmt::Display for StrategyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyRef::Index(i) => write!(f, "#{i}"),
            StrategyRef::Name(name) => f.write_str(name),
        }
    }
}

/// Operations a scenario can perform.
///
/// Admin steps run as `caller` when given, otherwise as whoever owns the
/// pool at that point in the script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Deposit {
        holder: String,
        amount: u64,
    },
    Withdraw {
        holder: String,
        units: u64,
    },
    /// Withdraw the holder's entire balance.
    WithdrawAll {
        holder: String,
    },
    Transfer {
        from: String,
        to: String,
        units: u64,
    },

    /// Simulated yield on a venue.
    Accrue {
        strategy: StrategyRef,
        amount: u64,
    },
    /// Simulated loss on a venue.
    Slash {
        strategy: StrategyRef,
        amount: u64,
    },
    SetPaused {
        strategy: StrategyRef,
        #[serde(default)]
        deposits: bool,
        #[serde(default)]
        withdrawals: bool,
    },

    AddStrategy {
        #[serde(default)]
        caller: Option<String>,
        strategy: StrategyConfig,
    },
    SetWeight {
        #[serde(default)]
        caller: Option<String>,
        strategy: StrategyRef,
        weight: i64,
    },
    SetEnabled {
        #[serde(default)]
        caller: Option<String>,
        strategy: StrategyRef,
        enabled: bool,
    },
    TransferOwnership {
        #[serde(default)]
        caller: Option<String>,
        new_owner: String,
    },
}

impl Step {
    /// Short action name, as written in scenario files.
    pub fn action(&self) -> &'static str {
        match self {
            Step::Deposit { .. } => "deposit",
            Step::Withdraw { .. } => "withdraw",
            Step::WithdrawAll { .. } => "withdraw_all",
            Step::Transfer { .. } => "transfer",
            Step::Accrue { .. } => "accrue",
            Step::Slash { .. } => "slash",
            Step::SetPaused { .. } => "set_paused",
            Step::AddStrategy { .. } => "add_strategy",
            Step::SetWeight { .. } => "set_weight",
            Step::SetEnabled { .. } => "set_enabled",
            Step::TransferOwnership { .. } => "transfer_ownership",
        }
    }
}

impl ScenarioConfig {
    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate. Steps are not dry-run here; the runner reports
    /// step failures with their position.
    pub fn from_toml(content: &str) -> Result<Self, ScenarioError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.name.trim().is_empty() {
            return Err(ScenarioError::Unnamed);
        }
        self.pool.validate().map_err(|source| ScenarioError::Pool {
            name: self.name.clone(),
            source,
        })
    }

    /// Content hash of the scenario, stable across runs.
    pub fn content_hash(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yieldpool_core::AdapterConfig;

    const SAMPLE: &str = r#"
name = "sample"

[pool]
owner = "treasury"

[[pool.strategies]]
name = "a"
weight = 1
adapter = { type = "SIMULATED" }

[[steps]]
action = "deposit"
holder = "alice"
amount = 400

[[steps]]
action = "accrue"
strategy = 0
amount = 10

[[steps]]
action = "set_enabled"
caller = "mallory"
strategy = "a"
enabled = false
expect_error = true

[[steps]]
action = "add_strategy"
strategy = { name = "dead", weight = 1, adapter = { type = "FAILING" } }
"#;

    #[test]
    fn parses_steps_in_order() {
        let s = ScenarioConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(s.steps.len(), 4);
        assert_eq!(
            s.steps[0].step,
            Step::Deposit { holder: "alice".into(), amount: 400 }
        );
        assert!(!s.steps[0].expect_error);
        assert_eq!(
            s.steps[1].step,
            Step::Accrue { strategy: StrategyRef::Index(0), amount: 10 }
        );
        assert!(s.steps[2].expect_error);
        match &s.steps[3].step {
            Step::AddStrategy { caller, strategy } => {
                assert!(caller.is_none());
                assert_eq!(strategy.adapter, AdapterConfig::Failing { stuck_balance: 0 });
                assert!(strategy.enabled);
            }
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn strategy_ref_by_name() {
        let s = ScenarioConfig::from_toml(SAMPLE).unwrap();
        match &s.steps[2].step {
            Step::SetEnabled { strategy, caller, .. } => {
                assert_eq!(strategy, &StrategyRef::Name("a".into()));
                assert_eq!(caller.as_deref(), Some("mallory"));
            }
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        let toml = r#"
name = "x"
[pool]
owner = "o"
[[steps]]
action = "rug_pull"
"#;
        assert!(matches!(ScenarioConfig::from_toml(toml), Err(ScenarioError::Parse(_))));
    }

    #[test]
    fn invalid_pool_is_reported_with_scenario_name() {
        let toml = r#"
name = "bad"
[pool]
owner = ""
"#;
        let err = ScenarioConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn content_hash_is_deterministic() {
        let a = ScenarioConfig::from_toml(SAMPLE).unwrap();
        let b = ScenarioConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());

        let mut c = a.clone();
        c.steps.pop();
        assert_ne!(a.content_hash().unwrap(), c.content_hash().unwrap());
    }

    #[test]
    fn action_names_match_serde_tags() {
        let s = ScenarioConfig::from_toml(SAMPLE).unwrap();
        let names: Vec<&str> = s.steps.iter().map(|st| st.step.action()).collect();
        assert_eq!(names, vec!["deposit", "accrue", "set_enabled", "add_strategy"]);
    }
}
