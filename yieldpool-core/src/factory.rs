//! Factory system — converts configs into live adapters and pools.
//!
//! `create_adapter` turns one `AdapterConfig` into a boxed adapter (plus a
//! control handle for simulated venues); `build_pool` applies a whole
//! `PoolConfig` through the owner-gated admin surface, so a configured pool
//! is subject to exactly the same checks as one assembled by hand.

use crate::adapter::{FailingAdapter, SimulatedVenue, StrategyAdapter, VenueHandle};
use crate::config::{AdapterConfig, ConfigError, PoolConfig, StrategyConfig};
use crate::domain::{HolderId, StrategyIndex};
use crate::pool::{Pool, PoolError};

/// Errors that can occur while building a pool from config.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("strategy '{name}': {source}")]
    Strategy { name: String, source: PoolError },

    #[error("strategy name '{0}' is already registered")]
    DuplicateName(String),
}

/// An adapter ready to hand to the registry.
pub struct BuiltAdapter {
    pub adapter: Box<dyn StrategyAdapter>,
    /// Present for simulated venues only.
    pub handle: Option<VenueHandle>,
}

/// Create an adapter from its config.
pub fn create_adapter(name: &str, config: &AdapterConfig) -> BuiltAdapter {
    match config {
        AdapterConfig::Simulated {
            initial_balance,
            capacity,
            paused,
        } => {
            let mut venue = SimulatedVenue::new(name).with_balance(u128::from(*initial_balance));
            if let Some(cap) = capacity {
                venue = venue.with_capacity(u128::from(*cap));
            }
            if *paused {
                venue = venue.paused();
            }
            let handle = venue.handle();
            BuiltAdapter {
                adapter: Box::new(venue),
                handle: Some(handle),
            }
        }
        AdapterConfig::Failing { stuck_balance } => BuiltAdapter {
            adapter: Box::new(
                FailingAdapter::new(name).with_stuck_balance(u128::from(*stuck_balance)),
            ),
            handle: None,
        },
    }
}

/// A registered strategy and its control handle.
#[derive(Debug, Clone)]
pub struct BuiltStrategy {
    pub name: String,
    pub index: StrategyIndex,
    pub handle: Option<VenueHandle>,
}

/// A pool assembled from config, with handles to its simulated venues.
#[derive(Debug)]
pub struct BuiltPool {
    pub pool: Pool,
    pub strategies: Vec<BuiltStrategy>,
}

impl BuiltPool {
    pub fn find(&self, name: &str) -> Option<&BuiltStrategy> {
        self.strategies.iter().find(|s| s.name == name)
    }

    pub fn get(&self, index: StrategyIndex) -> Option<&BuiltStrategy> {
        self.strategies.iter().find(|s| s.index == index)
    }

    /// Register one more configured strategy as `caller`.
    ///
    /// Names stay unique so [`BuiltPool::find`] keeps resolving to one entry.
    pub fn add_strategy(
        &mut self,
        caller: &HolderId,
        config: &StrategyConfig,
    ) -> Result<StrategyIndex, FactoryError> {
        if self.find(&config.name).is_some() {
            return Err(FactoryError::DuplicateName(config.name.clone()));
        }
        let strategy_err = |source| FactoryError::Strategy {
            name: config.name.clone(),
            source,
        };
        let built = create_adapter(&config.name, &config.adapter);
        let index = self
            .pool
            .add_strategy(caller, built.adapter, config.weight)
            .map_err(strategy_err)?;
        if !config.enabled {
            self.pool
                .set_enabled(caller, index, false)
                .map_err(strategy_err)?;
        }
        self.strategies.push(BuiltStrategy {
            name: config.name.clone(),
            index,
            handle: built.handle,
        });
        Ok(index)
    }
}

/// Validate `config` and build the pool it describes.
pub fn build_pool(config: &PoolConfig) -> Result<BuiltPool, FactoryError> {
    config.validate()?;
    let owner = HolderId::new(config.owner.clone());
    let mut built = BuiltPool {
        pool: Pool::with_max_strategies(owner.clone(), config.max_strategies),
        strategies: Vec::with_capacity(config.strategies.len()),
    };
    for strategy in &config.strategies {
        built.add_strategy(&owner, strategy)?;
    }
    Ok(built)
}
