use soroban_sdk::{Address, Env};

use crate::{
    constants::SIX_DECIMALS,
    errors::DexError,
    events::DexEvents,
    liquidity,
    math::{from_adjusted, mul_div, signed, to_adjusted, unsigned, Rounding},
    pool::Pool,
    position::{
        check_bounds, debt_user, decompose, finish,
        implicit::{borrow_and_swap, swap_and_payback},
        limits::borrow_limit,
        scale, share_amount,
    },
    reserves::DebtReserves,
    routing,
    storage::{get_total_shares, set_total_shares, set_user_debt, UserShares},
};

/// Debt curve seen from the token being borrowed or paid back.
#[derive(Clone, Copy, Debug)]
struct Curve {
    debt_in: u128,
    debt_other: u128,
    imaginary_in: u128,
    imaginary_other: u128,
}

impl Curve {
    fn new(reserves: &DebtReserves, token0: bool) -> Self {
        if token0 {
            Curve {
                debt_in: reserves.token0_debt,
                debt_other: reserves.token1_debt,
                imaginary_in: reserves.token0_imaginary_reserves,
                imaginary_other: reserves.token1_imaginary_reserves,
            }
        } else {
            Curve {
                debt_in: reserves.token1_debt,
                debt_other: reserves.token0_debt,
                imaginary_in: reserves.token1_imaginary_reserves,
                imaginary_other: reserves.token0_imaginary_reserves,
            }
        }
    }

    fn scaled(&self, to: u128, from: u128) -> Result<Self, DexError> {
        Ok(Curve {
            debt_in: scale(self.debt_in, to, from)?,
            debt_other: scale(self.debt_other, to, from)?,
            imaginary_in: scale(self.imaginary_in, to, from)?,
            imaginary_other: scale(self.imaginary_other, to, from)?,
        })
    }
}

/// Debt shares minted for borrowing `(b0, b1)` decimal-adjusted.
pub fn borrow_shares(
    reserves: &DebtReserves,
    total: u128,
    b0: u128,
    b1: u128,
    fee: u32,
) -> Result<u128, DexError> {
    let (dx, dy) = (reserves.token0_debt, reserves.token1_debt);
    if total == 0 {
        return Err(DexError::InsufficientReserves);
    }
    if dy == 0 && b1 == 0 && dx > 0 {
        return mul_div(b0, total, dx, Rounding::Up);
    }
    if dx == 0 && b0 == 0 && dy > 0 {
        return mul_div(b1, total, dy, Rounding::Up);
    }

    let split = decompose((b0, b1), (dx, dy), total, Rounding::Up, Rounding::Down)?;
    if split.excess == 0 {
        return Ok(split.perfect);
    }
    let after = total + split.perfect;
    let curve = Curve::new(reserves, split.excess_is_token0).scaled(after, total)?;

    let fraction = borrow_and_swap(
        split.excess,
        curve.debt_in,
        curve.debt_other,
        curve.imaginary_in,
        curve.imaginary_other,
    )?;
    let direct = fraction.of(curve.debt_in, Rounding::Down)?;
    let fee_amount = mul_div(
        split.excess.saturating_sub(direct),
        fee as u128,
        SIX_DECIMALS,
        Rounding::Up,
    )?;
    let fraction = borrow_and_swap(
        split.excess + fee_amount,
        curve.debt_in,
        curve.debt_other,
        curve.imaginary_in,
        curve.imaginary_other,
    )?;
    Ok(split.perfect + fraction.of(after, Rounding::Up)?)
}

/// Debt shares burned for paying back `(p0, p1)` decimal-adjusted.
pub fn payback_shares(
    reserves: &DebtReserves,
    total: u128,
    p0: u128,
    p1: u128,
    fee: u32,
) -> Result<u128, DexError> {
    let (dx, dy) = (reserves.token0_debt, reserves.token1_debt);
    if total == 0 {
        return Err(DexError::InsufficientReserves);
    }
    if dy == 0 && p1 == 0 && dx > 0 {
        return mul_div(p0, total, dx, Rounding::Down);
    }
    if dx == 0 && p0 == 0 && dy > 0 {
        return mul_div(p1, total, dy, Rounding::Down);
    }

    let split = decompose((p0, p1), (dx, dy), total, Rounding::Down, Rounding::Up)?;
    if split.excess == 0 {
        return Ok(split.perfect);
    }
    let after = total
        .checked_sub(split.perfect)
        .ok_or(DexError::InsufficientShares)?;
    let curve = Curve::new(reserves, split.excess_is_token0).scaled(after, total)?;

    let swapped = swap_and_payback(
        split.excess,
        curve.debt_in,
        curve.debt_other,
        curve.imaginary_in,
        curve.imaginary_other,
    )?;
    let fee_amount = mul_div(swapped, fee as u128, SIX_DECIMALS, Rounding::Up)?;
    let c = split.excess.saturating_sub(fee_amount);
    let s = swap_and_payback(c, curve.debt_in, curve.debt_other, curve.imaginary_in, curve.imaginary_other)?;
    if s >= curve.debt_in || c >= curve.debt_in {
        return Err(DexError::InsufficientReserves);
    }
    let extra = mul_div(c - s.min(c), after, curve.debt_in - s, Rounding::Down)?;
    Ok(split.perfect + extra)
}

/// Amount of one token that pays back `shares` of debt: the proportional
/// debt of that token plus what buys the other token's part through the
/// debt curve. The other token's debt is left unchanged.
pub fn payback_one_token_amount(
    reserves: &DebtReserves,
    total: u128,
    shares: u128,
    token0: bool,
    fee: u32,
) -> Result<u128, DexError> {
    if shares >= total {
        return Err(DexError::InsufficientShares);
    }
    let curve = Curve::new(reserves, token0);
    let remaining = total - shares;
    // Token-other bought through the curve so that paying back its share of
    // the new debt consumes exactly what was bought.
    let bought = mul_div(shares, curve.debt_other, remaining, Rounding::Up)?;
    let swap_in = routing::amount_in(bought, curve.imaginary_in, curve.imaginary_other)?;
    let swap_in = mul_div(swap_in, SIX_DECIMALS, SIX_DECIMALS - fee as u128, Rounding::Up)?;
    let amount = mul_div(swap_in, remaining, total, Rounding::Up)?
        + mul_div(shares, curve.debt_in, total, Rounding::Up)?;
    if amount > curve.debt_in {
        return Err(DexError::InsufficientReserves);
    }
    Ok(amount)
}

fn ensure_enabled(pool: &Pool) -> Result<(), DexError> {
    if !pool.config.smart_debt_enabled {
        return Err(DexError::DebtPoolDisabled);
    }
    Ok(())
}

fn prepare_mint(env: &Env, pool: &Pool, user: &Address, minted: u128) -> Result<UserShares, DexError> {
    let totals = get_total_shares(env);
    let after = totals.debt.checked_add(minted).ok_or(DexError::Overflow)?;
    if after > pool.config.max_borrow_shares {
        return Err(DexError::BorrowSharesCapReached);
    }
    let (record, config) = debt_user(env, user)?;
    let limit = borrow_limit(&record, &config, pool.now)?;
    let shares = record.shares.checked_add(minted).ok_or(DexError::Overflow)?;
    if shares > limit {
        return Err(DexError::BorrowLimitReached);
    }
    Ok(UserShares { shares, limit, last_update: pool.now, enabled: true })
}

fn prepare_burn(env: &Env, pool: &Pool, user: &Address, burned: u128) -> Result<UserShares, DexError> {
    let (record, config) = debt_user(env, user)?;
    let limit = borrow_limit(&record, &config, pool.now)?;
    Ok(UserShares {
        shares: record.shares.checked_sub(burned).ok_or(DexError::InsufficientShares)?,
        limit,
        last_update: pool.now,
        enabled: true,
    })
}

fn apply_borrow(
    env: &Env,
    pool: &mut Pool,
    user: &Address,
    record: &UserShares,
    minted: u128,
    amounts: (u128, u128),
    to: &Address,
) -> Result<(), DexError> {
    let constants = pool.constants.clone();
    liquidity::operate(env, &constants, &constants.token0, 0, signed(amounts.0)?, to);
    liquidity::operate(env, &constants, &constants.token1, 0, signed(amounts.1)?, to);

    set_user_debt(env, user, record);
    let mut totals = get_total_shares(env);
    totals.debt = totals.debt.checked_add(minted).ok_or(DexError::Overflow)?;
    set_total_shares(env, &totals);

    finish(env, pool)?;
    DexEvents::borrow(env, user, minted, signed(amounts.0)?, signed(amounts.1)?, to);
    Ok(())
}

fn apply_payback(
    env: &Env,
    pool: &mut Pool,
    user: &Address,
    record: &UserShares,
    burned: u128,
    amounts: (u128, u128),
) -> Result<(), DexError> {
    let dex = env.current_contract_address();
    let constants = pool.constants.clone();
    liquidity::transfer_in(env, &constants, &constants.token0, user, amounts.0)?;
    liquidity::transfer_in(env, &constants, &constants.token1, user, amounts.1)?;
    liquidity::operate(env, &constants, &constants.token0, 0, -signed(amounts.0)?, &dex);
    liquidity::operate(env, &constants, &constants.token1, 0, -signed(amounts.1)?, &dex);

    set_user_debt(env, user, record);
    let mut totals = get_total_shares(env);
    totals.debt = totals.debt.checked_sub(burned).ok_or(DexError::Overflow)?;
    set_total_shares(env, &totals);

    finish(env, pool)?;
    DexEvents::payback(env, user, burned, signed(amounts.0)?, signed(amounts.1)?);
    Ok(())
}

pub fn borrow_perfect(
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
    let total = get_total_shares(env).debt;
    check_bounds(shares, total)?;

    let amount0 = share_amount(
        shares,
        pool.debt.token0_debt,
        total,
        pool.constants.token0_decimals,
        Rounding::Down,
    )?;
    let amount1 = share_amount(
        shares,
        pool.debt.token1_debt,
        total,
        pool.constants.token1_decimals,
        Rounding::Down,
    )?;
    if amount0 < unsigned(min_amount0)? || amount1 < unsigned(min_amount1)? {
        return Err(DexError::InsufficientOutputAmount);
    }
    let record = prepare_mint(env, &pool, user, shares)?;
    if estimate {
        return Ok((signed(amount0)?, signed(amount1)?));
    }

    apply_borrow(env, &mut pool, user, &record, shares, (amount0, amount1), to)?;
    Ok((signed(amount0)?, signed(amount1)?))
}

pub fn payback_perfect(
    env: &Env,
    user: &Address,
    shares: u128,
    max_amount0: i128,
    max_amount1: i128,
    estimate: bool,
) -> Result<(i128, i128), DexError> {
    let mut pool = Pool::load_active(env)?;
    ensure_enabled(&pool)?;
    let total = get_total_shares(env).debt;
    check_bounds(shares, total)?;

    let amount0 = share_amount(
        shares,
        pool.debt.token0_debt,
        total,
        pool.constants.token0_decimals,
        Rounding::Up,
    )?;
    let amount1 = share_amount(
        shares,
        pool.debt.token1_debt,
        total,
        pool.constants.token1_decimals,
        Rounding::Up,
    )?;
    if amount0 > unsigned(max_amount0)? || amount1 > unsigned(max_amount1)? {
        return Err(DexError::ExcessiveInputAmount);
    }
    let record = prepare_burn(env, &pool, user, shares)?;
    if estimate {
        return Ok((signed(amount0)?, signed(amount1)?));
    }

    apply_payback(env, &mut pool, user, &record, shares, (amount0, amount1))?;
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
    let d0 = to_adjusted(amount0, pool.constants.token0_decimals, rounding)?;
    let d1 = to_adjusted(amount1, pool.constants.token1_decimals, rounding)?;
    if d0 > 0 {
        check_bounds(d0, pool.debt.token0_debt)?;
    }
    if d1 > 0 {
        check_bounds(d1, pool.debt.token1_debt)?;
    }
    Ok((d0, d1))
}

pub fn borrow(
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
    let (b0, b1) = adjusted_amounts(&pool, amount0, amount1, Rounding::Up)?;
    let total = get_total_shares(env).debt;

    let shares = borrow_shares(&pool.debt, total, b0, b1, pool.config.fee)?;
    if shares > max_shares {
        return Err(DexError::SharesSlippage);
    }
    let record = prepare_mint(env, &pool, user, shares)?;
    if estimate {
        return Ok(shares);
    }

    apply_borrow(env, &mut pool, user, &record, shares, (amount0, amount1), to)?;
    Ok(shares)
}

pub fn payback(
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
    let (p0, p1) = adjusted_amounts(&pool, amount0, amount1, Rounding::Down)?;
    let total = get_total_shares(env).debt;

    let shares = payback_shares(&pool.debt, total, p0, p1, pool.config.fee)?;
    if shares < min_shares {
        return Err(DexError::SharesSlippage);
    }
    let record = prepare_burn(env, &pool, user, shares)?;
    if estimate {
        return Ok(shares);
    }

    apply_payback(env, &mut pool, user, &record, shares, (amount0, amount1))?;
    Ok(shares)
}

/// Pays back `shares` of debt in a single token: token0 when `max_amount0`
/// is set, token1 when `max_amount1` is set.
pub fn payback_perfect_in_one_token(
    env: &Env,
    user: &Address,
    shares: u128,
    max_amount0: i128,
    max_amount1: i128,
    estimate: bool,
) -> Result<(i128, i128), DexError> {
    let (max0, max1) = (unsigned(max_amount0)?, unsigned(max_amount1)?);
    let token0 = match (max0 > 0, max1 > 0) {
        (true, false) => true,
        (false, true) => false,
        _ => return Err(DexError::InvalidProportion),
    };
    let mut pool = Pool::load_active(env)?;
    ensure_enabled(&pool)?;
    let total = get_total_shares(env).debt;
    check_bounds(shares, total)?;

    let adjusted = payback_one_token_amount(&pool.debt, total, shares, token0, pool.config.fee)?;
    let amount = from_adjusted(adjusted, pool.decimals(token0), Rounding::Up)?;
    if amount > max0.max(max1) {
        return Err(DexError::ExcessiveInputAmount);
    }
    let amounts = if token0 { (amount, 0) } else { (0, amount) };
    let record = prepare_burn(env, &pool, user, shares)?;
    if estimate {
        return Ok((signed(amounts.0)?, signed(amounts.1)?));
    }

    apply_payback(env, &mut pool, user, &record, shares, amounts)?;
    Ok((signed(amounts.0)?, signed(amounts.1)?))
}
