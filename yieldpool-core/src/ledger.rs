//! Claim ledger — fungible claim units representing pool ownership.
//!
//! Invariant: `Σ balances == total_units` after every mutation. Every
//! mutation is checked before it is applied, so a failed call leaves the
//! ledger unchanged. Holders whose balance drops to zero keep their row.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{checked_sum, ClaimUnits, HolderId};

/// Errors from ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{holder} holds {available} claim units, {requested} requested")]
    InsufficientBalance {
        holder: HolderId,
        requested: ClaimUnits,
        available: ClaimUnits,
    },

    #[error("claim unit supply overflow")]
    SupplyOverflow,
}

/// Per-holder claim balances plus the total supply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimLedger {
    balances: BTreeMap<HolderId, ClaimUnits>,
    total_units: ClaimUnits,
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_units(&self) -> ClaimUnits {
        self.total_units
    }

    pub fn balance_of(&self, holder: &HolderId) -> ClaimUnits {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Every holder that has ever held units, in holder order.
    pub fn holders(&self) -> impl Iterator<Item = (&HolderId, ClaimUnits)> {
        self.balances.iter().map(|(h, b)| (h, *b))
    }

    /// Whether minting `units` more would fit in the supply counter.
    pub fn can_mint(&self, units: ClaimUnits) -> bool {
        self.total_units.checked_add(units).is_some()
    }

    pub fn mint(&mut self, holder: &HolderId, units: ClaimUnits) -> Result<(), LedgerError> {
        let new_total = self
            .total_units
            .checked_add(units)
            .ok_or(LedgerError::SupplyOverflow)?;
        // balance <= total, so it cannot overflow if the total did not
        let balance = self.balances.entry(holder.clone()).or_insert(0);
        *balance += units;
        self.total_units = new_total;
        Ok(())
    }

    pub fn burn(&mut self, holder: &HolderId, units: ClaimUnits) -> Result<(), LedgerError> {
        self.ensure_balance(holder, units)?;
        if let Some(balance) = self.balances.get_mut(holder) {
            *balance -= units;
        }
        self.total_units -= units;
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: &HolderId,
        to: &HolderId,
        units: ClaimUnits,
    ) -> Result<(), LedgerError> {
        self.ensure_balance(from, units)?;
        if from == to {
            return Ok(());
        }
        if let Some(balance) = self.balances.get_mut(from) {
            *balance -= units;
        }
        *self.balances.entry(to.clone()).or_insert(0) += units;
        Ok(())
    }

    /// Recompute the holder sum and compare it with the supply counter.
    pub fn is_consistent(&self) -> bool {
        checked_sum(self.balances.values().copied()) == Some(self.total_units)
    }

    fn ensure_balance(&self, holder: &HolderId, units: ClaimUnits) -> Result<(), LedgerError> {
        let available = self.balance_of(holder);
        if available < units {
            return Err(LedgerError::InsufficientBalance {
                holder: holder.clone(),
                requested: units,
                available,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> HolderId {
        HolderId::new("alice")
    }

    fn bob() -> HolderId {
        HolderId::new("bob")
    }

    #[test]
    fn mint_and_burn_track_supply() {
        let mut ledger = ClaimLedger::new();
        ledger.mint(&alice(), 100).unwrap();
        ledger.mint(&bob(), 50).unwrap();
        assert_eq!(ledger.total_units(), 150);
        ledger.burn(&alice(), 40).unwrap();
        assert_eq!(ledger.balance_of(&alice()), 60);
        assert_eq!(ledger.total_units(), 110);
        assert!(ledger.is_consistent());
    }

    #[test]
    fn burn_more_than_held_is_rejected_without_side_effects() {
        let mut ledger = ClaimLedger::new();
        ledger.mint(&alice(), 10).unwrap();
        let err = ledger.burn(&alice(), 11).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance { holder: alice(), requested: 11, available: 10 }
        );
        assert_eq!(ledger.total_units(), 10);
    }

    #[test]
    fn zero_balance_rows_remain() {
        let mut ledger = ClaimLedger::new();
        ledger.mint(&alice(), 10).unwrap();
        ledger.burn(&alice(), 10).unwrap();
        assert_eq!(ledger.holders().count(), 1);
        assert_eq!(ledger.total_units(), 0);
    }

    #[test]
    fn transfer_moves_units_without_changing_supply() {
        let mut ledger = ClaimLedger::new();
        ledger.mint(&alice(), 10).unwrap();
        ledger.transfer(&alice(), &bob(), 4).unwrap();
        assert_eq!(ledger.balance_of(&alice()), 6);
        assert_eq!(ledger.balance_of(&bob()), 4);
        assert_eq!(ledger.total_units(), 10);
        assert!(ledger.transfer(&bob(), &alice(), 5).is_err());
    }

    #[test]
    fn self_transfer_is_a_checked_no_op() {
        let mut ledger = ClaimLedger::new();
        ledger.mint(&alice(), 10).unwrap();
        ledger.transfer(&alice(), &alice(), 10).unwrap();
        assert_eq!(ledger.balance_of(&alice()), 10);
        assert!(ledger.transfer(&alice(), &alice(), 11).is_err());
    }

    #[test]
    fn supply_overflow_is_rejected() {
        let mut ledger = ClaimLedger::new();
        ledger.mint(&alice(), u128::MAX).unwrap();
        assert_eq!(ledger.mint(&bob(), 1), Err(LedgerError::SupplyOverflow));
        assert_eq!(ledger.balance_of(&bob()), 0);
        assert!(ledger.is_consistent());
    }
}
