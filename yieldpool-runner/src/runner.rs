//! Scenario runner — builds a pool from config and plays its steps.
//!
//! Entry points:
//! - `run_scenario()`: one parsed scenario, no I/O.
//! - `run_file()`: load a TOML file, then run it.
//! - `run_files()`: many files in parallel (rayon). Each scenario owns its
//!   own pool, so there is no shared state between workers.
//!
//! After every step the pool's supply invariant is checked; a violation
//! aborts the run.

use std::path::{Path, PathBuf};

use anyhow::Context;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use yieldpool_core::{
    build_pool, Allocation, Amount, BuiltPool, BuiltStrategy, ClaimUnits, FactoryError, HolderId,
    PoolError, PoolSnapshot, SkippedStrategy, StrategyIndex, VenueHandle,
};

use crate::scenario::{ScenarioConfig, Step, StepSpec, StrategyRef};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors that abort a scenario run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("pool construction failed: {0}")]
    Build(#[from] FactoryError),

    #[error("step {step}: unknown strategy {reference}")]
    UnknownStrategy { step: usize, reference: String },

    #[error("step {step}: strategy '{name}' is not a simulated venue")]
    NoVenueHandle { step: usize, name: String },

    #[error("step {step} ({action}) failed: {error}")]
    UnexpectedFailure {
        step: usize,
        action: String,
        error: String,
    },

    #[error("step {step} ({action}) was expected to fail but succeeded")]
    UnexpectedSuccess { step: usize, action: String },

    #[error("after step {step}: {source}")]
    InvariantViolated { step: usize, source: PoolError },

    #[error("failed to hash scenario: {0}")]
    Hash(#[from] serde_json::Error),
}

/// What a step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Deposited {
        units_minted: ClaimUnits,
        allocations: Vec<Allocation>,
    },
    Withdrew {
        units_burned: ClaimUnits,
        amount_returned: Amount,
        skipped: Vec<SkippedStrategy>,
    },
    Transferred {
        units: ClaimUnits,
    },
    VenueAdjusted {
        strategy: String,
        balance: Amount,
    },
    StrategyAdded {
        index: StrategyIndex,
    },
    Updated,
    /// Rejected as the script expected.
    Rejected {
        error: String,
    },
}

impl StepOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, StepOutcome::Rejected { .. })
    }
}

/// One executed step with the pool state right after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub action: String,
    pub outcome: StepOutcome,
    pub total_units: ClaimUnits,
    pub pool_value: Amount,
}

/// Totals over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub steps: usize,
    pub rejected: usize,
    pub deposited: Amount,
    pub units_minted: ClaimUnits,
    pub returned: Amount,
    pub units_burned: ClaimUnits,
    /// Withdrawals that left at least one share behind.
    pub partial_withdrawals: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &StepOutcome) {
        self.steps += 1;
        match outcome {
            StepOutcome::Deposited {
                units_minted,
                allocations,
            } => {
                let deposited = allocations
                    .iter()
                    .fold(0, |acc: Amount, a| acc.saturating_add(a.amount));
                self.deposited = self.deposited.saturating_add(deposited);
                self.units_minted = self.units_minted.saturating_add(*units_minted);
            }
            StepOutcome::Withdrew {
                units_burned,
                amount_returned,
                skipped,
            } => {
                self.returned = self.returned.saturating_add(*amount_returned);
                self.units_burned = self.units_burned.saturating_add(*units_burned);
                if !skipped.is_empty() {
                    self.partial_withdrawals += 1;
                }
            }
            StepOutcome::Rejected { .. } => self.rejected += 1,
            _ => {}
        }
    }
}

/// Complete result of a scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub scenario: String,
    pub description: String,
    pub scenario_hash: String,
    pub steps: Vec<StepRecord>,
    pub summary: RunSummary,
    pub final_snapshot: PoolSnapshot,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a parsed scenario.
pub fn run_scenario(config: &ScenarioConfig) -> Result<ScenarioReport, RunError> {
    let scenario_hash = config.content_hash()?;
    info!(
        scenario = %config.name,
        steps = config.steps.len(),
        hash = &scenario_hash[..12],
        "running scenario"
    );

    let mut built = build_pool(&config.pool)?;
    let mut records = Vec::with_capacity(config.steps.len());
    let mut summary = RunSummary::default();

    for (step, spec) in config.steps.iter().enumerate() {
        let outcome = execute(&mut built, step, spec)?;
        summary.record(&outcome);

        let pool = &built.pool;
        pool.check_invariants()
            .map_err(|source| RunError::InvariantViolated { step, source })?;
        let pool_value = pool
            .aggregate_value()
            .map_err(|source| RunError::InvariantViolated { step, source })?;

        records.push(StepRecord {
            step,
            action: spec.step.action().to_string(),
            outcome,
            total_units: pool.total_units(),
            pool_value,
        });
    }

    let final_snapshot = built
        .pool
        .snapshot()
        .map_err(|source| RunError::InvariantViolated {
            step: config.steps.len(),
            source,
        })?;

    info!(
        scenario = %config.name,
        rejected = summary.rejected,
        total_units = final_snapshot.total_units,
        pool_value = final_snapshot.pool_value,
        "scenario complete"
    );

    Ok(ScenarioReport {
        schema_version: SCHEMA_VERSION,
        scenario: config.name.clone(),
        description: config.description.clone(),
        scenario_hash,
        steps: records,
        summary,
        final_snapshot,
    })
}

/// Load and run one scenario file.
pub fn run_file(path: &Path) -> anyhow::Result<ScenarioReport> {
    let config = ScenarioConfig::from_file(path)
        .with_context(|| format!("failed to load scenario {}", path.display()))?;
    run_scenario(&config).with_context(|| format!("scenario '{}' failed", config.name))
}

/// Run many scenario files in parallel. Results keep the input order.
pub fn run_files(paths: &[PathBuf]) -> Vec<(PathBuf, anyhow::Result<ScenarioReport>)> {
    paths
        .par_iter()
        .map(|path| (path.clone(), run_file(path)))
        .collect()
}

/// Execute one step, folding pool rejections against `expect_error`.
fn execute(
    built: &mut BuiltPool,
    step: usize,
    spec: &StepSpec,
) -> Result<StepOutcome, RunError> {
    let action = spec.step.action();
    debug!(step, action, expect_error = spec.expect_error, "executing step");

    match (apply(built, step, &spec.step)?, spec.expect_error) {
        (Ok(outcome), false) => Ok(outcome),
        (Ok(_), true) => Err(RunError::UnexpectedSuccess {
            step,
            action: action.to_string(),
        }),
        (Err(error), true) => {
            debug!(step, action, %error, "step rejected as expected");
            Ok(StepOutcome::Rejected { error })
        }
        (Err(error), false) => {
            warn!(step, action, %error, "step failed");
            Err(RunError::UnexpectedFailure {
                step,
                action: action.to_string(),
                error,
            })
        }
    }
}

/// Apply a step to the pool.
///
/// The outer `Result` is a scripting error (bad reference); the inner one
/// is the pool's own verdict, which may be expected.
fn apply(
    built: &mut BuiltPool,
    step: usize,
    action: &Step,
) -> Result<Result<StepOutcome, String>, RunError> {
    let owner = built.pool.owner().clone();
    let caller_or_owner = |caller: &Option<String>| {
        caller
            .as_deref()
            .map(HolderId::from)
            .unwrap_or_else(|| owner.clone())
    };

    let outcome = match action {
        Step::Deposit { holder, amount } => built
            .pool
            .deposit_detailed(&HolderId::from(holder.as_str()), u128::from(*amount))
            .map(|out| StepOutcome::Deposited {
                units_minted: out.units_minted,
                allocations: out.allocations,
            })
            .map_err(|e| e.to_string()),

        Step::Withdraw { holder, units } => {
            withdraw(built, &HolderId::from(holder.as_str()), u128::from(*units))
        }

        Step::WithdrawAll { holder } => {
            let holder = HolderId::from(holder.as_str());
            let units = built.pool.balance_of(&holder);
            withdraw(built, &holder, units)
        }

        Step::Transfer { from, to, units } => {
            let units = u128::from(*units);
            built
                .pool
                .transfer(&from.as_str().into(), &to.as_str().into(), units)
                .map(|()| StepOutcome::Transferred { units })
                .map_err(|e| e.to_string())
        }

        Step::Accrue { strategy, amount } => {
            let (name, handle) = venue(built, step, strategy)?;
            handle.accrue(u128::from(*amount));
            Ok(StepOutcome::VenueAdjusted {
                strategy: name,
                balance: handle.balance(),
            })
        }

        Step::Slash { strategy, amount } => {
            let (name, handle) = venue(built, step, strategy)?;
            handle.slash(u128::from(*amount));
            Ok(StepOutcome::VenueAdjusted {
                strategy: name,
                balance: handle.balance(),
            })
        }

        Step::SetPaused {
            strategy,
            deposits,
            withdrawals,
        } => {
            let (name, handle) = venue(built, step, strategy)?;
            handle.set_deposits_paused(*deposits);
            handle.set_withdrawals_paused(*withdrawals);
            Ok(StepOutcome::VenueAdjusted {
                strategy: name,
                balance: handle.balance(),
            })
        }

        Step::AddStrategy { caller, strategy } => built
            .add_strategy(&caller_or_owner(caller), strategy)
            .map(|index| StepOutcome::StrategyAdded { index })
            .map_err(|e| e.to_string()),

        Step::SetWeight {
            caller,
            strategy,
            weight,
        } => {
            let index = resolve(built, step, strategy)?;
            built
                .pool
                .set_weight(&caller_or_owner(caller), index, *weight)
                .map(|()| StepOutcome::Updated)
                .map_err(|e| e.to_string())
        }

        Step::SetEnabled {
            caller,
            strategy,
            enabled,
        } => {
            let index = resolve(built, step, strategy)?;
            built
                .pool
                .set_enabled(&caller_or_owner(caller), index, *enabled)
                .map(|()| StepOutcome::Updated)
                .map_err(|e| e.to_string())
        }

        Step::TransferOwnership { caller, new_owner } => built
            .pool
            .transfer_ownership(&caller_or_owner(caller), new_owner.as_str())
            .map(|()| StepOutcome::Updated)
            .map_err(|e| e.to_string()),
    };
    Ok(outcome)
}

fn withdraw(
    built: &mut BuiltPool,
    holder: &HolderId,
    units: ClaimUnits,
) -> Result<StepOutcome, String> {
    built
        .pool
        .withdraw(holder, units)
        .map(|out| StepOutcome::Withdrew {
            units_burned: out.units_burned,
            amount_returned: out.amount_returned,
            skipped: out.skipped,
        })
        .map_err(|e| e.to_string())
}

/// Resolve a reference to a registry index.
///
/// Numeric references pass through unchecked so the pool can reject an
/// out-of-range index itself.
fn resolve(
    built: &BuiltPool,
    step: usize,
    reference: &StrategyRef,
) -> Result<StrategyIndex, RunError> {
    match reference {
        StrategyRef::Index(i) => Ok(StrategyIndex(*i)),
        StrategyRef::Name(name) => built
            .find(name)
            .map(|s| s.index)
            .ok_or_else(|| RunError::UnknownStrategy {
                step,
                reference: reference.to_string(),
            }),
    }
}

fn lookup<'a>(
    built: &'a BuiltPool,
    step: usize,
    reference: &StrategyRef,
) -> Result<&'a BuiltStrategy, RunError> {
    let found = match reference {
        StrategyRef::Index(i) => built.get(StrategyIndex(*i)),
        StrategyRef::Name(name) => built.find(name),
    };
    found.ok_or_else(|| RunError::UnknownStrategy {
        step,
        reference: reference.to_string(),
    })
}

fn venue(
    built: &BuiltPool,
    step: usize,
    reference: &StrategyRef,
) -> Result<(String, VenueHandle), RunError> {
    let strategy = lookup(built, step, reference)?;
    let handle = strategy.handle.clone().ok_or_else(|| RunError::NoVenueHandle {
        step,
        name: strategy.name.clone(),
    })?;
    Ok((strategy.name.clone(), handle))
}
