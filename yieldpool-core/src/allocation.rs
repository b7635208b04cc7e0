//! Allocation engine — weighted deposit split and pro-rata withdrawal.
//!
//! Deposit is all-or-nothing: funds are split across enabled entries by
//! weight, every adapter must accept its portion, and only then are claim
//! units minted at the pre-deposit rate. If an adapter fails midway, the
//! adapters that already accepted funds in this call are unwound in reverse.
//!
//! Withdrawal is best-effort per adapter: claim units are burned first,
//! then every entry (enabled or not) is asked for its pro-rata share of its
//! current balance. An adapter that fails is skipped and reported; the
//! caller is paid from the rest. One broken venue must never block every
//! holder's exit.
//!
//! Entries are always processed in increasing index order.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapter::{AdapterError, DepositReceipt};
use crate::domain::{mul_div_floor, Amount, ClaimUnits, HolderId, StrategyIndex, Weight};
use crate::ledger::{ClaimLedger, LedgerError};
use crate::pricing::{compute_exchange_rate, ExchangeRate, PricingError};
use crate::registry::{RegistryError, StrategyRegistry};

/// Errors from deposit and withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("no enabled strategy has a positive weight")]
    NoActiveStrategies,

    #[error("deposit of {amount} would mint zero claim units")]
    DepositTooSmall { amount: Amount },

    #[error("strategy {index} rejected its deposit: {source}")]
    StrategyDepositFailed {
        index: StrategyIndex,
        source: AdapterError,
        /// Entries whose earlier portion could not be unwound.
        unwind_failed: Vec<StrategyIndex>,
    },

    #[error("arithmetic overflow during allocation")]
    ArithmeticOverflow,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Portion of a deposit routed to one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub index: StrategyIndex,
    pub amount: Amount,
}

/// Result of a successful deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositOutcome {
    pub units_minted: ClaimUnits,
    /// Pre-deposit rate the units were priced at.
    pub rate: ExchangeRate,
    pub allocations: Vec<Allocation>,
}

/// What one strategy returned during a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    pub index: StrategyIndex,
    pub requested: Amount,
    pub returned: Amount,
}

/// A strategy that could not pay its share during a withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStrategy {
    pub index: StrategyIndex,
    /// Share that stayed behind in the venue.
    pub unredeemed: Amount,
    pub reason: String,
}

/// Result of a withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawOutcome {
    pub units_burned: ClaimUnits,
    pub amount_returned: Amount,
    pub redemptions: Vec<Redemption>,
    pub skipped: Vec<SkippedStrategy>,
}

impl WithdrawOutcome {
    pub fn skipped_indices(&self) -> Vec<StrategyIndex> {
        self.skipped.iter().map(|s| s.index).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Split `amount` across `weights` proportionally.
///
/// Entries with zero weight receive nothing and are omitted. The last
/// positive-weight entry absorbs the truncation remainder, so the returned
/// portions always sum to exactly `amount`.
pub fn split_by_weights(
    amount: Amount,
    weights: &[(StrategyIndex, Weight)],
) -> Result<Vec<Allocation>, AllocationError> {
    let active: Vec<(StrategyIndex, Weight)> =
        weights.iter().copied().filter(|(_, w)| *w > 0).collect();
    let total_weight: u128 = active.iter().map(|(_, w)| u128::from(*w)).sum();
    if total_weight == 0 {
        return Err(AllocationError::NoActiveStrategies);
    }

    let mut allocations = Vec::with_capacity(active.len());
    let mut assigned: Amount = 0;
    let last = active.len() - 1;
    for (pos, (index, weight)) in active.into_iter().enumerate() {
        let portion = if pos == last {
            amount - assigned
        } else {
            mul_div_floor(amount, u128::from(weight), total_weight)
                .ok_or(AllocationError::ArithmeticOverflow)?
        };
        assigned += portion;
        allocations.push(Allocation { index, amount: portion });
    }
    Ok(allocations)
}

/// Plan how a deposit of `amount` is spread over the registry's enabled entries.
pub fn split_deposit(
    registry: &StrategyRegistry,
    amount: Amount,
) -> Result<Vec<Allocation>, AllocationError> {
    split_by_weights(amount, &registry.active_weights())
}

/// Allocate `amount` into the registry and mint claim units to `holder`.
pub fn deposit(
    registry: &mut StrategyRegistry,
    ledger: &mut ClaimLedger,
    holder: &HolderId,
    amount: Amount,
) -> Result<DepositOutcome, AllocationError> {
    if amount == 0 {
        return Err(AllocationError::ZeroAmount);
    }

    let rate = compute_exchange_rate(registry, ledger.total_units())?;
    let allocations = split_deposit(registry, amount)?;
    let units = rate.claim_units_for(amount)?;
    if units == 0 {
        return Err(AllocationError::DepositTooSmall { amount });
    }
    if !ledger.can_mint(units) {
        return Err(LedgerError::SupplyOverflow.into());
    }

    let mut receipts: Vec<(StrategyIndex, DepositReceipt)> =
        Vec::with_capacity(allocations.len());
    for allocation in &allocations {
        let entry = registry.entry_mut(allocation.index)?;
        debug!(
            index = %allocation.index,
            adapter = entry.name(),
            amount = allocation.amount,
            "depositing portion"
        );
        match entry.adapter_mut().deposit_funds(allocation.amount) {
            Ok(receipt) => receipts.push((allocation.index, receipt)),
            Err(source) => {
                warn!(
                    index = %allocation.index,
                    error = %source,
                    "strategy deposit failed, unwinding"
                );
                let unwind_failed = unwind(registry, receipts);
                return Err(AllocationError::StrategyDepositFailed {
                    index: allocation.index,
                    source,
                    unwind_failed,
                });
            }
        }
    }

    ledger.mint(holder, units)?;
    info!(%holder, amount, units, strategies = allocations.len(), "deposit allocated");
    Ok(DepositOutcome {
        units_minted: units,
        rate,
        allocations,
    })
}

/// Reverse accepted portions, newest first. Returns entries that refused.
fn unwind(
    registry: &mut StrategyRegistry,
    receipts: Vec<(StrategyIndex, DepositReceipt)>,
) -> Vec<StrategyIndex> {
    let mut failed = Vec::new();
    for (index, receipt) in receipts.into_iter().rev() {
        let result = registry
            .entry_mut(index)
            .map_err(|e| e.to_string())
            .and_then(|entry| {
                entry
                    .adapter_mut()
                    .unwind_deposit(&receipt)
                    .map_err(|e| e.to_string())
            });
        if let Err(reason) = result {
            warn!(%index, %reason, "could not unwind deposit portion");
            failed.push(index);
        }
    }
    failed
}

/// Burn `units` from `holder` and redeem their share of every entry.
pub fn withdraw(
    registry: &mut StrategyRegistry,
    ledger: &mut ClaimLedger,
    holder: &HolderId,
    units: ClaimUnits,
) -> Result<WithdrawOutcome, AllocationError> {
    if units == 0 {
        return Err(AllocationError::ZeroAmount);
    }
    let available = ledger.balance_of(holder);
    if available < units {
        return Err(LedgerError::InsufficientBalance {
            holder: holder.clone(),
            requested: units,
            available,
        }
        .into());
    }

    // Shares are fixed against the pre-burn supply before anything mutates.
    let total_units = ledger.total_units();
    let mut shares = Vec::with_capacity(registry.len());
    for (index, entry) in registry.iter() {
        let share = mul_div_floor(entry.adapter().valuation(), units, total_units)
            .ok_or(AllocationError::ArithmeticOverflow)?;
        shares.push((index, entry.is_enabled(), share));
    }

    ledger.burn(holder, units)?;

    let mut amount_returned: Amount = 0;
    let mut redemptions = Vec::new();
    let mut skipped = Vec::new();
    for ((index, entry), (_, enabled, share)) in registry.iter_mut().zip(shares) {
        if !enabled && share == 0 {
            continue;
        }
        debug!(%index, adapter = entry.name(), share, "redeeming share");
        match entry.adapter_mut().withdraw_funds(share) {
            Ok(returned) => {
                amount_returned = amount_returned.saturating_add(returned);
                redemptions.push(Redemption {
                    index,
                    requested: share,
                    returned,
                });
            }
            Err(err) => {
                warn!(
                    %index,
                    error = %err,
                    unredeemed = share,
                    "skipping strategy on withdrawal"
                );
                skipped.push(SkippedStrategy {
                    index,
                    unredeemed: share,
                    reason: err.to_string(),
                });
            }
        }
    }

    info!(%holder, units, amount_returned, skipped = skipped.len(), "withdrawal settled");
    Ok(WithdrawOutcome {
        units_burned: units,
        amount_returned,
        redemptions,
        skipped,
    })
}
