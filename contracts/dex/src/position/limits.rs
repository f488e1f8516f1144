//! Per-user withdrawal and borrow limits.
//!
//! Limits expand linearly with time: a user above the base withdrawal limit
//! may withdraw `expand_percent` of its shares per `expand_duration`, and a
//! borrower's ceiling grows by `expand_percent` of its debt per
//! `expand_duration`, capped by `max_debt_ceiling`.

use crate::{
    constants::SIX_DECIMALS,
    errors::DexError,
    math::{mul_div, Rounding},
    storage::{UserBorrowConfig, UserShares, UserSupplyConfig},
};

fn elapsed_share(amount: u128, elapsed: u64, duration: u64) -> Result<u128, DexError> {
    if duration == 0 || elapsed >= duration {
        return Ok(amount);
    }
    mul_div(amount, elapsed as u128, duration as u128, Rounding::Down)
}

/// Lowest share balance the user may withdraw down to at `now`.
pub fn withdrawal_limit(
    record: &UserShares,
    config: &UserSupplyConfig,
    now: u64,
) -> Result<u128, DexError> {
    if record.shares < config.base_withdrawal_limit {
        return Ok(0);
    }
    let expandable = mul_div(
        record.shares,
        config.expand_percent as u128,
        SIX_DECIMALS,
        Rounding::Down,
    )?;
    let elapsed = now.saturating_sub(record.last_update);
    let released = elapsed_share(expandable, elapsed, config.expand_duration)?;
    let decayed = record.limit.saturating_sub(released);
    Ok(decayed.max(record.shares - expandable))
}

/// Snapshot stored after a collateral operation moved the balance to
/// `new_shares`.
pub fn withdrawal_snapshot(limit: u128, new_shares: u128, config: &UserSupplyConfig) -> u128 {
    if new_shares < config.base_withdrawal_limit {
        0
    } else {
        limit
    }
}

/// Highest debt share balance the user may borrow up to at `now`.
pub fn borrow_limit(
    record: &UserShares,
    config: &UserBorrowConfig,
    now: u64,
) -> Result<u128, DexError> {
    let expandable = mul_div(
        record.shares,
        config.expand_percent as u128,
        SIX_DECIMALS,
        Rounding::Down,
    )?;
    let elapsed = now.saturating_sub(record.last_update);
    let grown = record
        .limit
        .saturating_add(elapsed_share(expandable, elapsed, config.expand_duration)?);
    let expanded = grown.min(record.shares.saturating_add(expandable));
    Ok(expanded.max(config.base_debt_ceiling).min(config.max_debt_ceiling))
}
