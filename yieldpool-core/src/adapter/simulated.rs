//! Simulated venue — an in-memory yield venue for scenarios and tests.
//!
//! The venue's state is shared between the adapter (owned by the registry)
//! and any number of [`VenueHandle`]s, so a scenario can accrue yield, slash,
//! or pause the venue after the adapter has been handed to the pool.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::Amount;

use super::{AdapterError, DepositReceipt, StrategyAdapter};

#[derive(Debug, Clone, Default)]
struct VenueState {
    balance: Amount,
    capacity: Option<Amount>,
    deposits_paused: bool,
    withdrawals_paused: bool,
    sequence: u64,
}

fn lock(state: &Mutex<VenueState>) -> MutexGuard<'_, VenueState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory venue that holds deposits 1:1 and lets the outside world move
/// its value.
#[derive(Debug)]
pub struct SimulatedVenue {
    name: String,
    state: Arc<Mutex<VenueState>>,
}

impl SimulatedVenue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(VenueState::default())),
        }
    }

    /// Start the venue already holding `balance` on the pool's behalf.
    pub fn with_balance(self, balance: Amount) -> Self {
        lock(&self.state).balance = balance;
        self
    }

    /// Reject deposits that would push the balance above `capacity`.
    pub fn with_capacity(self, capacity: Amount) -> Self {
        lock(&self.state).capacity = Some(capacity);
        self
    }

    /// Start with deposits and withdrawals paused.
    pub fn paused(self) -> Self {
        {
            let mut state = lock(&self.state);
            state.deposits_paused = true;
            state.withdrawals_paused = true;
        }
        self
    }

    /// Handle for driving this venue from outside the pool.
    pub fn handle(&self) -> VenueHandle {
        VenueHandle {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl StrategyAdapter for SimulatedVenue {
    fn name(&self) -> &str {
        &self.name
    }

    fn deposit_funds(&mut self, amount: Amount) -> Result<DepositReceipt, AdapterError> {
        let mut state = lock(&self.state);
        if state.deposits_paused {
            return Err(AdapterError::deposit(&self.name, "venue paused"));
        }
        let new_balance = state
            .balance
            .checked_add(amount)
            .ok_or_else(|| AdapterError::deposit(&self.name, "balance overflow"))?;
        if let Some(cap) = state.capacity {
            if new_balance > cap {
                return Err(AdapterError::deposit(
                    &self.name,
                    format!("capacity {cap} exceeded"),
                ));
            }
        }
        state.balance = new_balance;
        state.sequence += 1;
        Ok(DepositReceipt {
            amount,
            sequence: state.sequence,
        })
    }

    fn withdraw_funds(&mut self, amount: Amount) -> Result<Amount, AdapterError> {
        let mut state = lock(&self.state);
        if state.withdrawals_paused {
            return Err(AdapterError::withdraw(&self.name, "venue paused"));
        }
        if amount > state.balance {
            return Err(AdapterError::withdraw(
                &self.name,
                format!("requested {amount}, holding {}", state.balance),
            ));
        }
        state.balance -= amount;
        Ok(amount)
    }

    fn valuation(&self) -> Amount {
        lock(&self.state).balance
    }

    fn unwind_deposit(&mut self, receipt: &DepositReceipt) -> Result<Amount, AdapterError> {
        // Unwinding ignores the withdrawal pause: the funds never left this call.
        let mut state = lock(&self.state);
        let returned = receipt.amount.min(state.balance);
        state.balance -= returned;
        Ok(returned)
    }
}

/// Shared control surface for a [`SimulatedVenue`].
#[derive(Debug, Clone)]
pub struct VenueHandle {
    name: String,
    state: Arc<Mutex<VenueState>>,
}

impl VenueHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current balance held by the venue.
    pub fn balance(&self) -> Amount {
        lock(&self.state).balance
    }

    /// Credit yield to the venue. Saturates at `Amount::MAX`.
    pub fn accrue(&self, amount: Amount) {
        let mut state = lock(&self.state);
        state.balance = state.balance.saturating_add(amount);
    }

    /// Remove value from the venue (a loss event). Floors at zero.
    pub fn slash(&self, amount: Amount) {
        let mut state = lock(&self.state);
        state.balance = state.balance.saturating_sub(amount);
    }

    pub fn set_deposits_paused(&self, paused: bool) {
        lock(&self.state).deposits_paused = paused;
    }

    pub fn set_withdrawals_paused(&self, paused: bool) {
        lock(&self.state).withdrawals_paused = paused;
    }

    pub fn set_capacity(&self, capacity: Option<Amount>) {
        lock(&self.state).capacity = capacity;
    }
}
