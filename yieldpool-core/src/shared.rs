//! Thread-shareable pool.
//!
//! [`SharedPool`] wraps a [`Pool`] in one exclusive lock. Every public
//! operation holds the lock for its full duration, registry and ledger
//! together, so concurrent callers observe the same serialized sequence of
//! transitions a single-threaded host would. No finer-grained locking.
//!
//! A panic inside an operation (typically a misbehaving adapter) poisons the
//! lock. The pool may then hold venue balances with no matching claim units,
//! so every later call returns [`PoolError::LockPoisoned`] instead of pricing
//! against that state.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::adapter::StrategyAdapter;
use crate::allocation::{DepositOutcome, WithdrawOutcome};
use crate::domain::{Amount, ClaimUnits, HolderId, StrategyIndex};
use crate::pool::{Pool, PoolError, PoolSnapshot};
use crate::pricing::ExchangeRate;

/// Cloneable handle to a pool behind a single critical section.
#[derive(Debug, Clone)]
pub struct SharedPool {
    inner: Arc<Mutex<Pool>>,
}

impl SharedPool {
    pub fn new(pool: Pool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Pool>, PoolError> {
        self.inner.lock().map_err(|_| PoolError::LockPoisoned)
    }

    /// Whether an earlier operation panicked while holding the lock.
    pub fn is_poisoned(&self) -> bool {
        self.inner.is_poisoned()
    }

    /// Run `f` with exclusive access to the pool.
    pub fn with<R>(&self, f: impl FnOnce(&mut Pool) -> R) -> Result<R, PoolError> {
        Ok(f(&mut *self.lock()?))
    }

    pub fn add_strategy(
        &self,
        caller: &HolderId,
        adapter: Box<dyn StrategyAdapter>,
        initial_weight: i64,
    ) -> Result<StrategyIndex, PoolError> {
        self.lock()?.add_strategy(caller, adapter, initial_weight)
    }

    pub fn set_weight(
        &self,
        caller: &HolderId,
        index: StrategyIndex,
        weight: i64,
    ) -> Result<(), PoolError> {
        self.lock()?.set_weight(caller, index, weight)
    }

    pub fn set_enabled(
        &self,
        caller: &HolderId,
        index: StrategyIndex,
        enabled: bool,
    ) -> Result<(), PoolError> {
        self.lock()?.set_enabled(caller, index, enabled)
    }

    pub fn transfer_ownership(
        &self,
        caller: &HolderId,
        new_owner: impl Into<HolderId>,
    ) -> Result<(), PoolError> {
        self.lock()?.transfer_ownership(caller, new_owner)
    }

    pub fn deposit(&self, holder: &HolderId, amount: Amount) -> Result<ClaimUnits, PoolError> {
        self.lock()?.deposit(holder, amount)
    }

    pub fn deposit_detailed(
        &self,
        holder: &HolderId,
        amount: Amount,
    ) -> Result<DepositOutcome, PoolError> {
        self.lock()?.deposit_detailed(holder, amount)
    }

    pub fn withdraw(
        &self,
        holder: &HolderId,
        units: ClaimUnits,
    ) -> Result<WithdrawOutcome, PoolError> {
        self.lock()?.withdraw(holder, units)
    }

    pub fn transfer(
        &self,
        from: &HolderId,
        to: &HolderId,
        units: ClaimUnits,
    ) -> Result<(), PoolError> {
        self.lock()?.transfer(from, to, units)
    }

    pub fn preview_exchange_rate(&self) -> Result<ExchangeRate, PoolError> {
        self.lock()?.preview_exchange_rate()
    }

    pub fn balance_of(&self, holder: &HolderId) -> Result<ClaimUnits, PoolError> {
        Ok(self.lock()?.balance_of(holder))
    }

    pub fn snapshot(&self) -> Result<PoolSnapshot, PoolError> {
        self.lock()?.snapshot()
    }

    pub fn check_invariants(&self) -> Result<(), PoolError> {
        self.lock()?.check_invariants()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterError, DepositReceipt, SimulatedVenue};
    use std::panic::{self, AssertUnwindSafe};
    use std::thread;

    /// Accepts its first deposit, then panics mid-operation.
    struct PanicsOnSecondDeposit {
        balance: Amount,
        deposits: u64,
    }

    impl StrategyAdapter for PanicsOnSecondDeposit {
        fn name(&self) -> &str {
            "unstable"
        }

        fn deposit_funds(&mut self, amount: Amount) -> Result<DepositReceipt, AdapterError> {
            self.deposits += 1;
            if self.deposits == 2 {
                panic!("venue crashed");
            }
            self.balance += amount;
            Ok(DepositReceipt {
                amount,
                sequence: self.deposits,
            })
        }

        fn withdraw_funds(&mut self, amount: Amount) -> Result<Amount, AdapterError> {
            self.balance -= amount;
            Ok(amount)
        }

        fn valuation(&self) -> Amount {
            self.balance
        }
    }

    #[test]
    fn concurrent_deposits_keep_ledger_consistent() {
        let mut pool = Pool::new("owner");
        pool.add_strategy(&"owner".into(), Box::new(SimulatedVenue::new("a")), 1)
            .unwrap();
        pool.add_strategy(&"owner".into(), Box::new(SimulatedVenue::new("b")), 2)
            .unwrap();
        let shared = SharedPool::new(pool);

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let pool = shared.clone();
                thread::spawn(move || {
                    let holder = HolderId::new(format!("h{i}"));
                    for _ in 0..25 {
                        pool.deposit(&holder, 30).unwrap();
                    }
                    pool.withdraw(&holder, 300).unwrap();
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        shared.check_invariants().unwrap();
        let snap = shared.snapshot().unwrap();
        // 8 holders * (750 deposited - 300 withdrawn), no yield, 1:1 throughout
        assert_eq!(snap.total_units, 8 * 450);
        assert_eq!(snap.pool_value, 8 * 450);
    }

    #[test]
    fn panic_mid_deposit_poisons_the_pool() {
        let owner = HolderId::from("owner");
        let mut pool = Pool::new("owner");
        pool.add_strategy(&owner, Box::new(SimulatedVenue::new("a")), 1)
            .unwrap();
        pool.add_strategy(
            &owner,
            Box::new(PanicsOnSecondDeposit {
                balance: 0,
                deposits: 0,
            }),
            1,
        )
        .unwrap();
        let shared = SharedPool::new(pool);
        shared.deposit(&"alice".into(), 100).unwrap();

        // "a" accepts bob's first half before the second venue panics
        let crashed = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = shared.deposit(&"bob".into(), 100);
        }));
        assert!(crashed.is_err());
        assert!(shared.is_poisoned());

        assert_eq!(
            shared.deposit(&"carol".into(), 100),
            Err(PoolError::LockPoisoned)
        );
        assert_eq!(shared.preview_exchange_rate(), Err(PoolError::LockPoisoned));
        assert_eq!(shared.balance_of(&"alice".into()), Err(PoolError::LockPoisoned));
        assert!(matches!(
            shared.withdraw(&"alice".into(), 10),
            Err(PoolError::LockPoisoned)
        ));
        assert!(matches!(shared.snapshot(), Err(PoolError::LockPoisoned)));
    }
}
