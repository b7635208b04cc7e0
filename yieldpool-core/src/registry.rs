//! Strategy registry — append-only list of adapters with weights and flags.
//!
//! The registry is the single owner of every adapter the pool has ever
//! allocated into. Entries are never removed: an index, once handed out,
//! names the same adapter forever, so historical accounting (which share of
//! which venue belongs to claim holders) can never be invalidated by reuse.
//! A bad entry can only be disabled, which stops new deposits but keeps its
//! balance in the withdrawal pro-ration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapter::StrategyAdapter;
use crate::domain::{Amount, StrategyIndex, Weight};

/// Upper bound on registry length unless configured otherwise. Every deposit
/// and withdrawal iterates the whole registry.
pub const DEFAULT_MAX_STRATEGIES: usize = 32;

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid adapter: {0}")]
    InvalidAdapter(String),

    #[error("strategy index {index} out of range (registry has {len} entries)")]
    IndexOutOfRange { index: StrategyIndex, len: usize },

    #[error("invalid weight {0}: weights must be non-negative")]
    InvalidWeight(i64),

    #[error("registry is full ({max} strategies)")]
    CapacityExceeded { max: usize },
}

/// Convert an externally supplied weight, rejecting negatives.
pub fn parse_weight(weight: i64) -> Result<Weight, RegistryError> {
    Weight::try_from(weight).map_err(|_| RegistryError::InvalidWeight(weight))
}

/// One registered strategy.
pub struct StrategyEntry {
    adapter: Box<dyn StrategyAdapter>,
    weight: Weight,
    enabled: bool,
}

impl StrategyEntry {
    pub fn adapter(&self) -> &dyn StrategyAdapter {
        self.adapter.as_ref()
    }

    pub(crate) fn adapter_mut(&mut self) -> &mut dyn StrategyAdapter {
        self.adapter.as_mut()
    }

    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    /// Configured weight, regardless of the enabled flag.
    pub fn weight(&self) -> Weight {
        self.weight
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Weight as seen by new deposits: zero while disabled.
    pub fn effective_weight(&self) -> Weight {
        if self.enabled {
            self.weight
        } else {
            0
        }
    }
}

impl std::fmt::Debug for StrategyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyEntry")
            .field("adapter", &self.adapter.name())
            .field("weight", &self.weight)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Serializable view of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub index: StrategyIndex,
    pub name: String,
    pub weight: Weight,
    pub enabled: bool,
    pub valuation: Amount,
}

/// Ordered, append-only collection of strategy entries.
#[derive(Debug)]
pub struct StrategyRegistry {
    entries: Vec<StrategyEntry>,
    max_strategies: usize,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::with_capacity_limit(DEFAULT_MAX_STRATEGIES)
    }

    pub fn with_capacity_limit(max_strategies: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_strategies,
        }
    }

    pub fn max_strategies(&self) -> usize {
        self.max_strategies
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a new, enabled entry and return its index.
    pub fn add_strategy(
        &mut self,
        adapter: Box<dyn StrategyAdapter>,
        weight: Weight,
    ) -> Result<StrategyIndex, RegistryError> {
        if adapter.name().trim().is_empty() {
            return Err(RegistryError::InvalidAdapter("adapter has no name".into()));
        }
        if !adapter.is_reachable() {
            return Err(RegistryError::InvalidAdapter(format!(
                "adapter '{}' is unreachable",
                adapter.name()
            )));
        }
        if self.entries.len() >= self.max_strategies {
            return Err(RegistryError::CapacityExceeded {
                max: self.max_strategies,
            });
        }

        let index = StrategyIndex(self.entries.len());
        self.entries.push(StrategyEntry {
            adapter,
            weight,
            enabled: true,
        });
        Ok(index)
    }

    /// Change the weight used by later deposits. Held balances are untouched.
    pub fn set_weight(&mut self, index: StrategyIndex, weight: Weight) -> Result<(), RegistryError> {
        self.entry_mut(index)?.weight = weight;
        Ok(())
    }

    /// Toggle participation in new deposits.
    pub fn set_enabled(&mut self, index: StrategyIndex, enabled: bool) -> Result<(), RegistryError> {
        self.entry_mut(index)?.enabled = enabled;
        Ok(())
    }

    pub fn entry(&self, index: StrategyIndex) -> Result<&StrategyEntry, RegistryError> {
        self.entries
            .get(index.0)
            .ok_or(RegistryError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })
    }

    pub(crate) fn entry_mut(
        &mut self,
        index: StrategyIndex,
    ) -> Result<&mut StrategyEntry, RegistryError> {
        let len = self.entries.len();
        self.entries
            .get_mut(index.0)
            .ok_or(RegistryError::IndexOutOfRange { index, len })
    }

    /// Entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (StrategyIndex, &StrategyEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (StrategyIndex(i), e))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (StrategyIndex, &mut StrategyEntry)> {
        self.entries
            .iter_mut()
            .enumerate()
            .map(|(i, e)| (StrategyIndex(i), e))
    }

    /// Look up an entry by adapter name. Names are not required to be unique;
    /// the lowest index wins.
    pub fn find_by_name(&self, name: &str) -> Option<StrategyIndex> {
        self.iter().find(|(_, e)| e.name() == name).map(|(i, _)| i)
    }

    /// `(index, weight)` for every enabled entry, in index order.
    pub fn active_weights(&self) -> Vec<(StrategyIndex, Weight)> {
        self.iter()
            .filter(|(_, e)| e.is_enabled())
            .map(|(i, e)| (i, e.weight()))
            .collect()
    }

    /// Sum of weights over enabled entries.
    pub fn total_active_weight(&self) -> u128 {
        self.entries
            .iter()
            .map(|e| u128::from(e.effective_weight()))
            .sum()
    }

    pub fn summaries(&self) -> Vec<StrategySummary> {
        self.iter()
            .map(|(index, e)| StrategySummary {
                index,
                name: e.name().to_string(),
                weight: e.weight(),
                enabled: e.is_enabled(),
                valuation: e.adapter().valuation(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterError, DepositReceipt, SimulatedVenue};

    fn venue(name: &str) -> Box<dyn StrategyAdapter> {
        Box::new(SimulatedVenue::new(name))
    }

    struct Unreachable;

    impl StrategyAdapter for Unreachable {
        fn name(&self) -> &str {
            "ghost"
        }
        fn is_reachable(&self) -> bool {
            false
        }
        fn deposit_funds(&mut self, _: Amount) -> Result<DepositReceipt, AdapterError> {
            unreachable!()
        }
        fn withdraw_funds(&mut self, _: Amount) -> Result<Amount, AdapterError> {
            unreachable!()
        }
        fn valuation(&self) -> Amount {
            0
        }
    }

    #[test]
    fn add_assigns_sequential_indices() {
        let mut reg = StrategyRegistry::new();
        assert_eq!(reg.add_strategy(venue("a"), 1).unwrap(), StrategyIndex(0));
        assert_eq!(reg.add_strategy(venue("b"), 3).unwrap(), StrategyIndex(1));
        assert_eq!(reg.len(), 2);
        assert!(reg.entry(StrategyIndex(1)).unwrap().is_enabled());
    }

    #[test]
    fn add_rejects_unreachable_and_unnamed_adapters() {
        let mut reg = StrategyRegistry::new();
        assert!(matches!(
            reg.add_strategy(Box::new(Unreachable), 1),
            Err(RegistryError::InvalidAdapter(_))
        ));
        assert!(matches!(
            reg.add_strategy(venue("  "), 1),
            Err(RegistryError::InvalidAdapter(_))
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn capacity_limit_is_enforced() {
        let mut reg = StrategyRegistry::with_capacity_limit(2);
        reg.add_strategy(venue("a"), 1).unwrap();
        reg.add_strategy(venue("b"), 1).unwrap();
        assert_eq!(
            reg.add_strategy(venue("c"), 1).unwrap_err(),
            RegistryError::CapacityExceeded { max: 2 }
        );
    }

    #[test]
    fn set_weight_and_enabled_validate_index() {
        let mut reg = StrategyRegistry::new();
        reg.add_strategy(venue("a"), 1).unwrap();
        assert_eq!(
            reg.set_weight(StrategyIndex(5), 2).unwrap_err(),
            RegistryError::IndexOutOfRange { index: StrategyIndex(5), len: 1 }
        );
        assert!(reg.set_enabled(StrategyIndex(1), false).is_err());
        reg.set_weight(StrategyIndex(0), 7).unwrap();
        assert_eq!(reg.entry(StrategyIndex(0)).unwrap().weight(), 7);
    }

    #[test]
    fn disabled_entries_have_zero_effective_weight() {
        let mut reg = StrategyRegistry::new();
        reg.add_strategy(venue("a"), 1).unwrap();
        reg.add_strategy(venue("b"), 3).unwrap();
        reg.set_enabled(StrategyIndex(1), false).unwrap();
        assert_eq!(reg.total_active_weight(), 1);
        assert_eq!(reg.active_weights(), vec![(StrategyIndex(0), 1)]);
        // configured weight survives the toggle
        assert_eq!(reg.entry(StrategyIndex(1)).unwrap().weight(), 3);
    }

    #[test]
    fn parse_weight_rejects_negative() {
        assert_eq!(parse_weight(-1), Err(RegistryError::InvalidWeight(-1)));
        assert_eq!(parse_weight(0), Ok(0));
        assert_eq!(parse_weight(42), Ok(42));
    }

    #[test]
    fn find_by_name_returns_lowest_index() {
        let mut reg = StrategyRegistry::new();
        reg.add_strategy(venue("a"), 1).unwrap();
        reg.add_strategy(venue("b"), 1).unwrap();
        reg.add_strategy(venue("a"), 1).unwrap();
        assert_eq!(reg.find_by_name("a"), Some(StrategyIndex(0)));
        assert_eq!(reg.find_by_name("zzz"), None);
    }

    #[test]
    fn summaries_include_disabled_entries() {
        let mut reg = StrategyRegistry::new();
        reg.add_strategy(Box::new(SimulatedVenue::new("a").with_balance(10)), 1)
            .unwrap();
        reg.add_strategy(venue("b"), 2).unwrap();
        reg.set_enabled(StrategyIndex(0), false).unwrap();
        let summaries = reg.summaries();
        assert_eq!(summaries.len(), 2);
        assert!(!summaries[0].enabled);
        assert_eq!(summaries[0].valuation, 10);
    }
}
