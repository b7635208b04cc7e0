//! Failing adapter — a venue that rejects every deposit and withdrawal.
//!
//! Models an adapter that was registered by mistake or whose venue has gone
//! permanently dark. It may still report value it is holding (funds stuck
//! in the venue), which keeps counting towards the pool's aggregate value.

use crate::domain::Amount;

use super::{AdapterError, DepositReceipt, StrategyAdapter};

/// Adapter whose every state-changing call fails.
#[derive(Debug, Clone)]
pub struct FailingAdapter {
    name: String,
    stuck_balance: Amount,
}

impl FailingAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stuck_balance: 0,
        }
    }

    /// Report `balance` as held but unredeemable.
    pub fn with_stuck_balance(mut self, balance: Amount) -> Self {
        self.stuck_balance = balance;
        self
    }
}

impl StrategyAdapter for FailingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn deposit_funds(&mut self, _amount: Amount) -> Result<DepositReceipt, AdapterError> {
        Err(AdapterError::deposit(&self.name, "venue unavailable"))
    }

    fn withdraw_funds(&mut self, _amount: Amount) -> Result<Amount, AdapterError> {
        Err(AdapterError::withdraw(&self.name, "venue unavailable"))
    }

    fn valuation(&self) -> Amount {
        self.stuck_balance
    }
}
