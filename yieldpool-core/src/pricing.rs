//! Pricing — aggregate pool value and the claim-unit exchange rate.
//!
//! Pool value is the sum of every registry entry's valuation, enabled or
//! not: a disabled entry still holds value owed to claim holders. The rate is
//! recomputed from live adapter valuations on every call and never cached.
//!
//! The rate is kept as an exact ratio (`pool_value / total_units`). All
//! conversions truncate, so rounding dust always stays with the pool.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{checked_sum, mul_div_floor, Amount, ClaimUnits};
use crate::registry::StrategyRegistry;

/// Errors from pricing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("arithmetic overflow while pricing the pool")]
    ArithmeticOverflow,

    #[error("pool value is zero while {total_units} claim units are outstanding")]
    PoolValueDepleted { total_units: ClaimUnits },
}

/// Deposit units per claim unit, as an exact ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Aggregate pool value (numerator).
    pub pool_value: Amount,
    /// Outstanding claim units (denominator).
    pub total_units: ClaimUnits,
}

impl ExchangeRate {
    /// One deposit unit per claim unit. Used while no claim units exist.
    pub const BOOTSTRAP: ExchangeRate = ExchangeRate {
        pool_value: 1,
        total_units: 1,
    };

    /// Claim units minted for a deposit of `amount` (truncating).
    pub fn claim_units_for(&self, amount: Amount) -> Result<ClaimUnits, PricingError> {
        if self.pool_value == 0 {
            return Err(PricingError::PoolValueDepleted {
                total_units: self.total_units,
            });
        }
        mul_div_floor(amount, self.total_units, self.pool_value)
            .ok_or(PricingError::ArithmeticOverflow)
    }

    /// Deposit-asset value of `units` claim units (truncating).
    pub fn deposit_units_for(&self, units: ClaimUnits) -> Result<Amount, PricingError> {
        if self.total_units == 0 {
            return Ok(0);
        }
        mul_div_floor(units, self.pool_value, self.total_units)
            .ok_or(PricingError::ArithmeticOverflow)
    }

    /// Rate as a fixed-point integer: deposit units per `precision` claim units.
    pub fn scaled(&self, precision: u128) -> Result<u128, PricingError> {
        self.deposit_units_for(precision)
    }

    /// Approximate rate for display only.
    pub fn as_f64(&self) -> f64 {
        if self.total_units == 0 {
            return 0.0;
        }
        self.pool_value as f64 / self.total_units as f64
    }
}

/// Sum of valuations over every registry entry.
pub fn aggregate_value(registry: &StrategyRegistry) -> Result<Amount, PricingError> {
    checked_sum(registry.iter().map(|(_, e)| e.adapter().valuation()))
        .ok_or(PricingError::ArithmeticOverflow)
}

/// Current exchange rate given the outstanding claim supply.
pub fn compute_exchange_rate(
    registry: &StrategyRegistry,
    total_units: ClaimUnits,
) -> Result<ExchangeRate, PricingError> {
    if total_units == 0 {
        return Ok(ExchangeRate::BOOTSTRAP);
    }
    Ok(ExchangeRate {
        pool_value: aggregate_value(registry)?,
        total_units,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{FailingAdapter, SimulatedVenue};
    use crate::domain::StrategyIndex;

    #[test]
    fn bootstrap_when_no_units() {
        let mut reg = StrategyRegistry::new();
        reg.add_strategy(Box::new(SimulatedVenue::new("a").with_balance(999)), 1)
            .unwrap();
        let rate = compute_exchange_rate(&reg, 0).unwrap();
        assert_eq!(rate, ExchangeRate::BOOTSTRAP);
        assert_eq!(rate.claim_units_for(100).unwrap(), 100);
    }

    #[test]
    fn aggregate_includes_disabled_and_failing_entries() {
        let mut reg = StrategyRegistry::new();
        reg.add_strategy(Box::new(SimulatedVenue::new("a").with_balance(100)), 1)
            .unwrap();
        reg.add_strategy(Box::new(SimulatedVenue::new("b").with_balance(200)), 1)
            .unwrap();
        reg.add_strategy(Box::new(FailingAdapter::new("c").with_stuck_balance(50)), 1)
            .unwrap();
        reg.set_enabled(StrategyIndex(1), false).unwrap();
        assert_eq!(aggregate_value(&reg).unwrap(), 350);
    }

    #[test]
    fn aggregate_overflow_is_reported() {
        let mut reg = StrategyRegistry::new();
        reg.add_strategy(Box::new(SimulatedVenue::new("a").with_balance(u128::MAX)), 1)
            .unwrap();
        reg.add_strategy(Box::new(SimulatedVenue::new("b").with_balance(1)), 1)
            .unwrap();
        assert_eq!(aggregate_value(&reg), Err(PricingError::ArithmeticOverflow));
    }

    #[test]
    fn conversions_truncate_in_favor_of_pool() {
        // 1000 value over 300 units: 3.333.. per unit
        let rate = ExchangeRate { pool_value: 1_000, total_units: 300 };
        // 10 deposit units buy floor(10 * 300 / 1000) = 3 units
        assert_eq!(rate.claim_units_for(10).unwrap(), 3);
        // 3 units redeem floor(3 * 1000 / 300) = 10
        assert_eq!(rate.deposit_units_for(3).unwrap(), 10);
        // 1 unit redeems floor(3.33) = 3
        assert_eq!(rate.deposit_units_for(1).unwrap(), 3);
    }

    #[test]
    fn depleted_pool_refuses_to_price_deposits() {
        let rate = ExchangeRate { pool_value: 0, total_units: 500 };
        assert_eq!(
            rate.claim_units_for(10),
            Err(PricingError::PoolValueDepleted { total_units: 500 })
        );
    }

    #[test]
    fn scaled_rate_uses_fixed_point() {
        let rate = ExchangeRate { pool_value: 1_500, total_units: 1_000 };
        assert_eq!(rate.scaled(1_000_000).unwrap(), 1_500_000);
        assert!((rate.as_f64() - 1.5).abs() < 1e-12);
    }
}
