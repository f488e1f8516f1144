//! Collateral (deposit/withdraw) and debt (borrow/payback) positions.
//!
//! Perfect operations move both tokens in pool proportion for an exact
//! share amount. Arbitrary operations split the requested token amounts
//! into a proportional part and a one-token excess that goes through an
//! implicit swap (see [`implicit`]). Every operation ends with an
//! arbitrage between the two pools.

pub mod collateral;
pub mod debt;
pub mod implicit;
pub mod limits;

use soroban_sdk::{Address, Env};

use crate::{
    arbitrage,
    constants::{MINIMUM_LIQUIDITY_USER_OPERATIONS, OPERATION_BOUNDS_RATIO},
    errors::DexError,
    math::{from_adjusted, mul, mul_div, wide, Rounding},
    pool::Pool,
    storage::{
        get_user_borrow_config, get_user_collateral, get_user_debt, get_user_supply_config,
        UserBorrowConfig, UserShares, UserSupplyConfig,
    },
};

/// Rejects amounts too small to move or too far from the reference total
/// to keep precision.
pub fn check_bounds(amount: u128, total: u128) -> Result<(), DexError> {
    if amount < MINIMUM_LIQUIDITY_USER_OPERATIONS {
        return Err(DexError::OperationAmountOutOfBounds);
    }
    if total == 0 {
        return Ok(());
    }
    if mul(wide(amount), wide(OPERATION_BOUNDS_RATIO))? < wide(total)
        || wide(amount) > mul(wide(total), wide(OPERATION_BOUNDS_RATIO))?
    {
        return Err(DexError::OperationAmountOutOfBounds);
    }
    Ok(())
}

/// Token amount backing `shares` out of `total`, in token units.
pub fn share_amount(
    shares: u128,
    reserve: u128,
    total: u128,
    decimals: u32,
    rounding: Rounding,
) -> Result<u128, DexError> {
    if total == 0 {
        return Err(DexError::InsufficientReserves);
    }
    from_adjusted(mul_div(shares, reserve, total, rounding)?, decimals, rounding)
}

/// Two-token change split into its proportional part and the leftover of
/// one token.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Decomposition {
    /// Shares matching the proportional part.
    pub perfect: u128,
    pub excess_is_token0: bool,
    /// Leftover of the excess token, decimal-adjusted.
    pub excess: u128,
    /// Amounts of both tokens consumed by the proportional part.
    pub used0: u128,
    pub used1: u128,
}

/// Shares implied by `amount` against `reserve`; `None` when the reserve is
/// empty and any amount is out of proportion.
fn implied(amount: u128, reserve: u128, total: u128, rounding: Rounding) -> Result<Option<u128>, DexError> {
    if amount == 0 {
        return Ok(Some(0));
    }
    if reserve == 0 {
        return Ok(None);
    }
    Ok(Some(mul_div(amount, total, reserve, rounding)?))
}

pub fn decompose(
    amounts: (u128, u128),
    reserves: (u128, u128),
    total: u128,
    share_rounding: Rounding,
    amount_rounding: Rounding,
) -> Result<Decomposition, DexError> {
    if total == 0 {
        return Err(DexError::InsufficientReserves);
    }
    let s0 = implied(amounts.0, reserves.0, total, share_rounding)?;
    let s1 = implied(amounts.1, reserves.1, total, share_rounding)?;
    let (perfect, excess_is_token0) = match (s0, s1) {
        (None, None) => return Err(DexError::InsufficientReserves),
        (None, Some(s1)) => (s1, true),
        (Some(s0), None) => (s0, false),
        (Some(s0), Some(s1)) if s0 == s1 => return Err(DexError::InvalidProportion),
        (Some(s0), Some(s1)) => (s0.min(s1), s0 > s1),
    };
    let used0 = mul_div(perfect, reserves.0, total, amount_rounding)?.min(amounts.0);
    let used1 = mul_div(perfect, reserves.1, total, amount_rounding)?.min(amounts.1);
    let excess = if excess_is_token0 {
        amounts.0 - used0
    } else {
        amounts.1 - used1
    };
    Ok(Decomposition { perfect, excess_is_token0, excess, used0, used1 })
}

/// `value * numerator / denominator`, for scaling reserves with shares.
pub fn scale(value: u128, numerator: u128, denominator: u128) -> Result<u128, DexError> {
    mul_div(value, numerator, denominator, Rounding::Down)
}

pub fn collateral_user(
    env: &Env,
    user: &Address,
) -> Result<(UserShares, UserSupplyConfig), DexError> {
    let config = get_user_supply_config(env, user).ok_or(DexError::UserNotEnabled)?;
    let record = get_user_collateral(env, user);
    if !record.enabled {
        return Err(DexError::UserNotEnabled);
    }
    Ok((record, config))
}

pub fn debt_user(env: &Env, user: &Address) -> Result<(UserShares, UserBorrowConfig), DexError> {
    let config = get_user_borrow_config(env, user).ok_or(DexError::UserNotEnabled)?;
    let record = get_user_debt(env, user);
    if !record.enabled {
        return Err(DexError::UserNotEnabled);
    }
    Ok((record, config))
}

/// Arbitrages the pools and persists the primary record.
pub fn finish(env: &Env, pool: &mut Pool) -> Result<(), DexError> {
    arbitrage::rebalance(env, pool)?;
    pool.commit(env);
    Ok(())
}
