use soroban_sdk::{Address, Env};

use crate::{
    constants::SIX_DECIMALS,
    errors::DexError,
    events::DexEvents,
    liquidity,
    math::{from_adjusted, mul_div, signed, to_adjusted, unsigned, Rounding},
    pool::Pool,
    position::{
        check_bounds, collateral_user, decompose, finish,
        implicit::{swap_and_deposit, withdraw_and_swap},
        limits::{withdrawal_limit, withdrawal_snapshot},
        scale, share_amount,
    },
    reserves::CollateralReserves,
    routing,
    storage::{get_total_shares, set_total_shares, set_user_collateral, UserShares},
};

/// Collateral curve seen from the token being added or removed.
#[derive(Clone, Copy, Debug)]
struct Curve {
    real_in: u128,
    real_other: u128,
    imaginary_in: u128,
    imaginary_other: u128,
}

impl Curve {
    fn new(reserves: &CollateralReserves, token0: bool) -> Self {
        if token0 {
            Curve {
                real_in: reserves.token0_real_reserves,
                real_other: reserves.token1_real_reserves,
                imaginary_in: reserves.token0_imaginary_reserves,
                imaginary_other: reserves.token1_imaginary_reserves,
            }
        } else {
            Curve {
                real_in: reserves.token1_real_reserves,
                real_other: reserves.token0_real_reserves,
                imaginary_in: reserves.token1_imaginary_reserves,
                imaginary_other: reserves.token0_imaginary_reserves,
            }
        }
    }

    /// The curve after total shares moved from `from` to `to`.
    fn scaled(&self, to: u128, from: u128) -> Result<Self, DexError> {
        Ok(Curve {
            real_in: scale(self.real_in, to, from)?,
            real_other: scale(self.real_other, to, from)?,
            imaginary_in: scale(self.imaginary_in, to, from)?,
            imaginary_other: scale(self.imaginary_other, to, from)?,
        })
    }
}

/// Shares minted for depositing `(c0, c1)` decimal-adjusted.
pub fn deposit_shares(
    reserves: &CollateralReserves,
    total: u128,
    c0: u128,
    c1: u128,
    fee: u32,
) -> Result<u128, DexError> {
    let (rx, ry) = (reserves.token0_real_reserves, reserves.token1_real_reserves);
    if total == 0 {
        return Err(DexError::InsufficientReserves);
    }
    // One-sided pool and a deposit of the same token only.
    if ry == 0 && c1 == 0 && rx > 0 {
        return mul_div(c0, total, rx, Rounding::Down);
    }
    if rx == 0 && c0 == 0 && ry > 0 {
        return mul_div(c1, total, ry, Rounding::Down);
    }

    let split = decompose((c0, c1), (rx, ry), total, Rounding::Down, Rounding::Up)?;
    if split.excess == 0 {
        return Ok(split.perfect);
    }
    let after = total + split.perfect;
    let curve = Curve::new(reserves, split.excess_is_token0).scaled(after, total)?;

    let swapped = swap_and_deposit(
        split.excess,
        curve.real_in,
        curve.real_other,
        curve.imaginary_in,
        curve.imaginary_other,
    )?;
    let fee_amount = mul_div(swapped, fee as u128, SIX_DECIMALS, Rounding::Up)?;
    let c = split.excess.saturating_sub(fee_amount);
    let s = swap_and_deposit(c, curve.real_in, curve.real_other, curve.imaginary_in, curve.imaginary_other)?;
    if routing::amount_out(s, curve.imaginary_in, curve.imaginary_other)? >= curve.real_other {
        return Err(DexError::InsufficientReserves);
    }
    let extra = mul_div(c - s.min(c), after, curve.real_in + s, Rounding::Down)?;
    Ok(split.perfect + extra)
}

/// Shares burned for withdrawing `(w0, w1)` decimal-adjusted.
pub fn withdraw_shares(
    reserves: &CollateralReserves,
    total: u128,
    w0: u128,
    w1: u128,
    fee: u32,
) -> Result<u128, DexError> {
    let (rx, ry) = (reserves.token0_real_reserves, reserves.token1_real_reserves);
    if total == 0 {
        return Err(DexError::InsufficientReserves);
    }
    if ry == 0 && w1 == 0 && rx > 0 {
        return mul_div(w0, total, rx, Rounding::Up);
    }
    if rx == 0 && w0 == 0 && ry > 0 {
        return mul_div(w1, total, ry, Rounding::Up);
    }

    let split = decompose((w0, w1), (rx, ry), total, Rounding::Up, Rounding::Down)?;
    if split.excess == 0 {
        return Ok(split.perfect);
    }
    let after = total
        .checked_sub(split.perfect)
        .ok_or(DexError::InsufficientReserves)?;
    let curve = Curve::new(reserves, split.excess_is_token0).scaled(after, total)?;

    let fraction = withdraw_and_swap(
        split.excess,
        curve.real_in,
        curve.real_other,
        curve.imaginary_in,
        curve.imaginary_other,
    )?;
    let direct = fraction.of(curve.real_in, Rounding::Down)?;
    let fee_amount = mul_div(
        split.excess.saturating_sub(direct),
        fee as u128,
        SIX_DECIMALS,
        Rounding::Up,
    )?;
    let fraction = withdraw_and_swap(
        split.excess + fee_amount,
        curve.real_in,
        curve.real_other,
        curve.imaginary_in,
        curve.imaginary_other,
    )?;
    Ok(split.perfect + fraction.of(after, Rounding::Up)?)
}

/// Amount of one token received for burning `shares`: the proportional
/// part of that token plus the other token's part swapped into it.
pub fn withdraw_one_token_amount(
    reserves: &CollateralReserves,
    total: u128,
    shares: u128,
    token0: bool,
    fee: u32,
) -> Result<u128, DexError> {
    if shares >= total {
        return Err(DexError::InsufficientShares);
    }
    let curve = Curve::new(reserves, token0);
    let direct = mul_div(shares, curve.real_in, total, Rounding::Down)?;
    let other = mul_div(shares, curve.real_other, total, Rounding::Down)?;
    let remaining = curve.scaled(total - shares, total)?;
    let swap_in = mul_div(other, SIX_DECIMALS - fee as u128, SIX_DECIMALS, Rounding::Down)?;
    let swapped = routing::amount_out(swap_in, remaining.imaginary_other, remaining.imaginary_in)?;
    let amount = direct + swapped;
    if amount > curve.real_in {
        return Err(DexError::InsufficientReserves);
    }
    Ok(amount)
}

fn ensure_enabled(pool: &Pool) -> Result<(), DexError> {
    if !pool.config.smart_collateral_enabled {
        return Err(DexError::CollateralPoolDisabled);
    }
    Ok(())
}

/// Checks caps and limits for minting `minted` shares and returns the
/// record to store.
fn prepare_mint(env: &Env, pool: &Pool, user: &Address, minted: u128) -> Result<UserShares, DexError> {
    let totals = get_total_shares(env);
    let after = totals.collateral.checked_add(minted).ok_or(DexError::Overflow)?;
    if after > pool.config.max_supply_shares {
        return Err(DexError::SupplySharesCapReached);
    }
    let (record, config) = collateral_user(env, user)?;
    let limit = withdrawal_limit(&record, &config, pool.now)?;
    let shares = record.shares.checked_add(minted).ok_or(DexError::Overflow)?;
    Ok(UserShares {
        shares,
        limit: withdrawal_snapshot(limit, shares, &config),
        last_update: pool.now,
        enabled: true,
    })
}

/// Checks balance and the withdrawal limit for burning `burned` shares.
fn prepare_burn(env: &Env, pool: &Pool, user: &Address, burned: u128) -> Result<UserShares, DexError> {
    let (record, config) = collateral_user(env, user)?;
    let limit = withdrawal_limit(&record, &config, pool.now)?;
    let shares = record.shares.checked_sub(burned).ok_or(DexError::InsufficientShares)?;
    if shares < limit {
        return Err(DexError::WithdrawalLimitReached);
    }
    Ok(UserShares {
        shares,
        limit: withdrawal_snapshot(limit, shares, &config),
        last_update: pool.now,
        enabled: true,
    })
}

fn apply_deposit(
    env: &Env,
    pool: &mut Pool,
    user: &Address,
    record: &UserShares,
    minted: u128,
    amounts: (u128, u128),
) -> Result<(), DexError> {
    let dex = env.current_contract_address();
    let constants = pool.constants.clone();
    liquidity::transfer_in(env, &constants, &constants.token0, user, amounts.0)?;
    liquidity::transfer_in(env, &constants, &constants.token1, user, amounts.1)?;
    liquidity::operate(env, &constants, &constants.token0, signed(amounts.0)?, 0, &dex);
    liquidity::operate(env, &constants, &constants.token1, signed(amounts.1)?, 0, &dex);

    set_user_collateral(env, user, record);
    let mut totals = get_total_shares(env);
    totals.collateral = totals.collateral.checked_add(minted).ok_or(DexError::Overflow)?;
    set_total_shares(env, &totals);

    finish(env, pool)?;
    DexEvents::deposit(env, user, minted, signed(amounts.0)?, signed(amounts.1)?);
    Ok(())
}

fn apply_withdraw(
    env: &Env,
    pool: &mut Pool,
    user: &Address,
    record: &UserShares,
    burned: u128,
    amounts: (u128, u128),
    to: &Address,
) -> Result<(), DexError> {
    let constants = pool.constants.clone();
    liquidity::operate(env, &constants, &constants.token0, -signed(amounts.0)?, 0, to);
    liquidity::operate(env, &constants, &constants.token1, -signed(amounts.1)?, 0, to);

    set_user_collateral(env, user, record);
    let mut totals = get_total_shares(env);
    totals.collateral = totals.collateral.checked_sub(burned).ok_or(DexError::Overflow)?;
    set_total_shares(env, &totals);

    finish(env, pool)?;
    DexEvents::withdraw(env, user, burned, signed(amounts.0)?, signed(amounts.1)?, to);
    Ok(())
}

pub fn deposit_perfect(
    env: &Env,
    user: &Address,
    shares: u128,
    max_amount0: i128,
    max_amount1: i128,
    estimate: bool,
) -> Result<(i128, i128), DexError> {
    let mut pool = Pool::load_active(env)?;
    ensure_enabled(&pool)?;
    let total = get_total_shares(env).collateral;
    check_bounds(shares, total)?;

    let amount0 = share_amount(
        shares,
        pool.collateral.token0_real_reserves,
        total,
        pool.constants.token0_decimals,
        Rounding::Up,
    )?;
    let amount1 = share_amount(
        shares,
        pool.collateral.token1_real_reserves,
        total,
        pool.constants.token1_decimals,
        Rounding::Up,
    )?;
    if amount0 > unsigned(max_amount0)? || amount1 > unsigned(max_amount1)? {
        return Err(DexError::ExcessiveInputAmount);
    }
    let record = prepare_mint(env, &pool, user, shares)?;
    if estimate {
        return Ok((signed(amount0)?, signed(amount1)?));
    }

    apply_deposit(env, &mut pool, user, &record, shares, (amount0, amount1))?;
    Ok((signed(amount0)?, signed(amount1)?))
}

pub fn withdraw_perfect(
    env: &Env,
    user: &Address,
    shares: u128,
    min_amount0: i128,
    min_amount1: i128,
    to: &Address,
    estimate: bool,
) -> Result<(i128, i128), DexError> {
    let mut pool = Pool::load_active(env)?;
    ensure_enabled(&pool)?;
    let total = get_total_shares(env).collateral;
    check_bounds(shares, total)?;

    let amount0 = share_amount(
        shares,
        pool.collateral.token0_real_reserves,
        total,
        pool.constants.token0_decimals,
        Rounding::Down,
    )?;
    let amount1 = share_amount(
        shares,
        pool.collateral.token1_real_reserves,
        total,
        pool.constants.token1_decimals,
        Rounding::Down,
    )?;
    if amount0 < unsigned(min_amount0)? || amount1 < unsigned(min_amount1)? {
        return Err(DexError::InsufficientOutputAmount);
    }
    let record = prepare_burn(env, &pool, user, shares)?;
    if estimate {
        return Ok((signed(amount0)?, signed(amount1)?));
    }

    apply_withdraw(env, &mut pool, user, &record, shares, (amount0, amount1), to)?;
    Ok((signed(amount0)?, signed(amount1)?))
}

fn adjusted_amounts(
    pool: &Pool,
    amount0: u128,
    amount1: u128,
    rounding: Rounding,
) -> Result<(u128, u128), DexError> {
    if amount0 == 0 && amount1 == 0 {
        return Err(DexError::ZeroAmount);
    }
    let c0 = to_adjusted(amount0, pool.constants.token0_decimals, rounding)?;
    let c1 = to_adjusted(amount1, pool.constants.token1_decimals, rounding)?;
    if c0 > 0 {
        check_bounds(c0, pool.collateral.token0_real_reserves)?;
    }
    if c1 > 0 {
        check_bounds(c1, pool.collateral.token1_real_reserves)?;
    }
    Ok((c0, c1))
}

pub fn deposit(
    env: &Env,
    user: &Address,
    amount0: i128,
    amount1: i128,
    min_shares: u128,
    estimate: bool,
) -> Result<u128, DexError> {
    let (amount0, amount1) = (unsigned(amount0)?, unsigned(amount1)?);
    let mut pool = Pool::load_active(env)?;
    ensure_enabled(&pool)?;
    let (c0, c1) = adjusted_amounts(&pool, amount0, amount1, Rounding::Down)?;
    let total = get_total_shares(env).collateral;

    let shares = deposit_shares(&pool.collateral, total, c0, c1, pool.config.fee)?;
    if shares < min_shares {
        return Err(DexError::SharesSlippage);
    }
    let record = prepare_mint(env, &pool, user, shares)?;
    if estimate {
        return Ok(shares);
    }

    apply_deposit(env, &mut pool, user, &record, shares, (amount0, amount1))?;
    Ok(shares)
}

pub fn withdraw(
    env: &Env,
    user: &Address,
    amount0: i128,
    amount1: i128,
    max_shares: u128,
    to: &Address,
    estimate: bool,
) -> Result<u128, DexError> {
    let (amount0, amount1) = (unsigned(amount0)?, unsigned(amount1)?);
    let mut pool = Pool::load_active(env)?;
    ensure_enabled(&pool)?;
    let (w0, w1) = adjusted_amounts(&pool, amount0, amount1, Rounding::Up)?;
    let total = get_total_shares(env).collateral;

    let shares = withdraw_shares(&pool.collateral, total, w0, w1, pool.config.fee)?;
    if shares > max_shares {
        return Err(DexError::SharesSlippage);
    }
    let record = prepare_burn(env, &pool, user, shares)?;
    if estimate {
        return Ok(shares);
    }

    apply_withdraw(env, &mut pool, user, &record, shares, (amount0, amount1), to)?;
    Ok(shares)
}

/// Burns `shares` and pays out a single token: token0 when `min_amount0`
/// is set, token1 when `min_amount1` is set.
pub fn withdraw_perfect_in_one_token(
    env: &Env,
    user: &Address,
    shares: u128,
    min_amount0: i128,
    min_amount1: i128,
    to: &Address,
    estimate: bool,
) -> Result<(i128, i128), DexError> {
    let (min0, min1) = (unsigned(min_amount0)?, unsigned(min_amount1)?);
    let token0 = match (min0 > 0, min1 > 0) {
        (true, false) => true,
        (false, true) => false,
        _ => return Err(DexError::InvalidProportion),
    };
    let mut pool = Pool::load_active(env)?;
    ensure_enabled(&pool)?;
    let total = get_total_shares(env).collateral;
    check_bounds(shares, total)?;

    let adjusted = withdraw_one_token_amount(&pool.collateral, total, shares, token0, pool.config.fee)?;
    let amount = from_adjusted(adjusted, pool.decimals(token0), Rounding::Down)?;
    let amounts = if token0 { (amount, 0) } else { (0, amount) };
    if amount < min0.max(min1) {
        return Err(DexError::InsufficientOutputAmount);
    }
    let record = prepare_burn(env, &pool, user, shares)?;
    if estimate {
        return Ok((signed(amounts.0)?, signed(amounts.1)?));
    }

    apply_withdraw(env, &mut pool, user, &record, shares, amounts, to)?;
    Ok((signed(amounts.0)?, signed(amounts.1)?))
}
