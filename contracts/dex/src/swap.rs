//! Swaps across the collateral and debt pools.
//!
//! The input side is deposited into the collateral pool and/or paid back to
//! the debt pool; the output side is withdrawn from the collateral pool
//! and/or borrowed from the debt pool, straight to the recipient. When the
//! router sends the whole trade through one pool while both are enabled,
//! the pools are arbitraged back to one price before the price is recorded.

use soroban_sdk::{token::TokenClient, Address, Env};

use crate::{
    arbitrage,
    constants::{MAX_SWAP_AMOUNT, MIN_SWAP_AMOUNT, SIX_DECIMALS},
    errors::DexError,
    events::DexEvents,
    hooks, liquidity,
    math::{from_adjusted, mul_div, signed, to_adjusted, unsigned, Rounding},
    oracle,
    pool::Pool,
    reentrancy,
    routing::{self, PoolSide, Route},
    storage::{get_revenue, set_revenue, DexConfig},
};

/// Outcome of a swap in token units (not decimal-adjusted).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SwapQuote {
    pub amount_in: u128,
    pub amount_out: u128,
    pub collateral_in: u128,
    pub debt_in: u128,
    pub collateral_out: u128,
    pub debt_out: u128,
    pub revenue: u128,
    pub price: u128,
}

/// Per-pool legs, decimal-adjusted.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct Legs {
    collateral_in: u128,
    collateral_out: u128,
    debt_in: u128,
    debt_out: u128,
}

fn sides(pool: &Pool, swap0to1: bool) -> (PoolSide, PoolSide) {
    let c = &pool.collateral;
    let d = &pool.debt;
    if swap0to1 {
        (
            PoolSide {
                in_imaginary: c.token0_imaginary_reserves,
                out_imaginary: c.token1_imaginary_reserves,
                in_real: c.token0_real_reserves,
                out_real: c.token1_real_reserves,
            },
            PoolSide {
                in_imaginary: d.token0_imaginary_reserves,
                out_imaginary: d.token1_imaginary_reserves,
                in_real: d.token0_real_reserves,
                out_real: d.token1_real_reserves,
            },
        )
    } else {
        (
            PoolSide {
                in_imaginary: c.token1_imaginary_reserves,
                out_imaginary: c.token0_imaginary_reserves,
                in_real: c.token1_real_reserves,
                out_real: c.token0_real_reserves,
            },
            PoolSide {
                in_imaginary: d.token1_imaginary_reserves,
                out_imaginary: d.token0_imaginary_reserves,
                in_real: d.token1_real_reserves,
                out_real: d.token0_real_reserves,
            },
        )
    }
}

fn select_route(
    config: &DexConfig,
    collateral: &PoolSide,
    debt: &PoolSide,
    total: u128,
    exact_in: bool,
) -> Result<Route, DexError> {
    match (config.smart_collateral_enabled, config.smart_debt_enabled) {
        (true, false) => Ok(Route::Collateral),
        (false, true) => Ok(Route::Debt),
        (true, true) if exact_in => routing::route_in(
            total,
            collateral.in_imaginary,
            collateral.out_imaginary,
            debt.in_imaginary,
            debt.out_imaginary,
        ),
        (true, true) => routing::route_out(
            total,
            collateral.in_imaginary,
            collateral.out_imaginary,
            debt.in_imaginary,
            debt.out_imaginary,
        ),
        (false, false) => Err(DexError::UnreachableRoute),
    }
}

fn split(route: Route, total: u128) -> (u128, u128) {
    match route {
        Route::Collateral => (total, 0),
        Route::Debt => (0, total),
        Route::Split { collateral, debt } => (collateral, debt),
    }
}

fn legs_for_input(
    route: Route,
    total: u128,
    collateral: &PoolSide,
    debt: &PoolSide,
) -> Result<Legs, DexError> {
    let (collateral_in, debt_in) = split(route, total);
    let mut legs = Legs { collateral_in, debt_in, ..Legs::default() };
    if collateral_in > 0 {
        legs.collateral_out =
            routing::amount_out(collateral_in, collateral.in_imaginary, collateral.out_imaginary)?;
        collateral.check_after(collateral_in, legs.collateral_out)?;
    }
    if debt_in > 0 {
        legs.debt_out = routing::amount_out(debt_in, debt.in_imaginary, debt.out_imaginary)?;
        debt.check_after(debt_in, legs.debt_out)?;
    }
    Ok(legs)
}

fn legs_for_output(
    route: Route,
    total: u128,
    collateral: &PoolSide,
    debt: &PoolSide,
) -> Result<Legs, DexError> {
    let (collateral_out, debt_out) = split(route, total);
    let mut legs = Legs { collateral_out, debt_out, ..Legs::default() };
    if collateral_out > 0 {
        legs.collateral_in =
            routing::amount_in(collateral_out, collateral.in_imaginary, collateral.out_imaginary)?;
        collateral.check_after(legs.collateral_in, collateral_out)?;
    }
    if debt_out > 0 {
        legs.debt_in = routing::amount_in(debt_out, debt.in_imaginary, debt.out_imaginary)?;
        debt.check_after(legs.debt_in, debt_out)?;
    }
    Ok(legs)
}

/// Post-trade price of whichever pool carried the larger leg.
fn legs_price(
    swap0to1: bool,
    legs: &Legs,
    collateral: &PoolSide,
    debt: &PoolSide,
) -> Result<u128, DexError> {
    if legs.collateral_in >= legs.debt_in {
        collateral.price_after(swap0to1, legs.collateral_in, legs.collateral_out)
    } else {
        debt.price_after(swap0to1, legs.debt_in, legs.debt_out)
    }
}

/// Splits `amount` pro rata to the `(collateral, debt)` legs.
fn pro_rata(amount: u128, collateral: u128, debt: u128) -> Result<(u128, u128), DexError> {
    if debt == 0 {
        return Ok((amount, 0));
    }
    if collateral == 0 {
        return Ok((0, amount));
    }
    let to_collateral = mul_div(amount, collateral, collateral + debt, Rounding::Down)?;
    Ok((to_collateral, amount - to_collateral))
}

fn check_amount(adjusted: u128) -> Result<(), DexError> {
    if adjusted < MIN_SWAP_AMOUNT {
        return Err(DexError::SwapAmountTooSmall);
    }
    if adjusted > MAX_SWAP_AMOUNT {
        return Err(DexError::SwapAmountTooLarge);
    }
    Ok(())
}

/// The debt leg pays back the input token; it cannot exceed that debt.
fn check_payback(pool: &Pool, swap0to1: bool, debt_in: u128) -> Result<(), DexError> {
    let (debt, decimals) = if swap0to1 {
        (pool.debt.token0_debt, pool.constants.token0_decimals)
    } else {
        (pool.debt.token1_debt, pool.constants.token1_decimals)
    };
    if to_adjusted(debt_in, decimals, Rounding::Up)? > debt {
        return Err(DexError::InsufficientReserves);
    }
    Ok(())
}

pub fn quote_in(pool: &Pool, swap0to1: bool, amount_in: u128) -> Result<SwapQuote, DexError> {
    let decimals_in = pool.decimals(swap0to1);
    let decimals_out = pool.decimals(!swap0to1);
    check_amount(to_adjusted(amount_in, decimals_in, Rounding::Down)?)?;

    let fee = mul_div(amount_in, pool.config.fee as u128, SIX_DECIMALS, Rounding::Up)?;
    let revenue = mul_div(fee, pool.config.revenue_cut as u128, SIX_DECIMALS, Rounding::Down)?;
    let net = to_adjusted(amount_in - fee, decimals_in, Rounding::Down)?;

    let (collateral, debt) = sides(pool, swap0to1);
    let route = select_route(&pool.config, &collateral, &debt, net, true)?;
    let legs = legs_for_input(route, net, &collateral, &debt)?;

    let collateral_out = from_adjusted(legs.collateral_out, decimals_out, Rounding::Down)?;
    let debt_out = from_adjusted(legs.debt_out, decimals_out, Rounding::Down)?;
    let amount_out = collateral_out + debt_out;
    if amount_out == 0 {
        return Err(DexError::InsufficientOutputAmount);
    }
    let (collateral_in, debt_in) = pro_rata(amount_in - revenue, legs.collateral_in, legs.debt_in)?;
    check_payback(pool, swap0to1, debt_in)?;

    Ok(SwapQuote {
        amount_in,
        amount_out,
        collateral_in,
        debt_in,
        collateral_out,
        debt_out,
        revenue,
        price: legs_price(swap0to1, &legs, &collateral, &debt)?,
    })
}

pub fn quote_out(pool: &Pool, swap0to1: bool, amount_out: u128) -> Result<SwapQuote, DexError> {
    let decimals_in = pool.decimals(swap0to1);
    let decimals_out = pool.decimals(!swap0to1);
    let out = to_adjusted(amount_out, decimals_out, Rounding::Up)?;
    check_amount(out)?;

    let (collateral, debt) = sides(pool, swap0to1);
    let route = select_route(&pool.config, &collateral, &debt, out, false)?;
    let legs = legs_for_output(route, out, &collateral, &debt)?;
    let (collateral_out, debt_out) = pro_rata(amount_out, legs.collateral_out, legs.debt_out)?;

    let net = from_adjusted(legs.collateral_in + legs.debt_in, decimals_in, Rounding::Up)?;
    let fee_rate = pool.config.fee as u128;
    let amount_in = mul_div(net, SIX_DECIMALS, SIX_DECIMALS - fee_rate, Rounding::Up)?;
    let revenue = mul_div(
        amount_in - net,
        pool.config.revenue_cut as u128,
        SIX_DECIMALS,
        Rounding::Down,
    )?;
    let (collateral_in, debt_in) = pro_rata(amount_in - revenue, legs.collateral_in, legs.debt_in)?;
    check_payback(pool, swap0to1, debt_in)?;

    Ok(SwapQuote {
        amount_in,
        amount_out,
        collateral_in,
        debt_in,
        collateral_out,
        debt_out,
        revenue,
        price: legs_price(swap0to1, &legs, &collateral, &debt)?,
    })
}

fn positive(amount: i128) -> Result<u128, DexError> {
    if amount <= 0 {
        return Err(DexError::ZeroAmount);
    }
    Ok(amount as u128)
}

/// Moves funds for `quote`, records the price and persists the pool.
fn settle(
    env: &Env,
    pool: &mut Pool,
    user: &Address,
    swap0to1: bool,
    quote: &SwapQuote,
    to: &Address,
) -> Result<(), DexError> {
    hooks::check_swap(env, &pool.constants, &pool.config, swap0to1, quote.price)?;

    let (token_in, token_out, cap) = if swap0to1 {
        (
            pool.constants.token0.clone(),
            pool.constants.token1.clone(),
            pool.config.token1_utilization_cap,
        )
    } else {
        (
            pool.constants.token1.clone(),
            pool.constants.token0.clone(),
            pool.config.token0_utilization_cap,
        )
    };
    let dex = env.current_contract_address();

    liquidity::transfer_in(env, &pool.constants, &token_in, user, quote.collateral_in + quote.debt_in)?;
    if quote.revenue > 0 {
        TokenClient::new(env, &token_in).transfer(user, &dex, &signed(quote.revenue)?);
        let total = get_revenue(env, &token_in) + signed(quote.revenue)?;
        set_revenue(env, &token_in, total);
    }
    liquidity::operate(
        env,
        &pool.constants,
        &token_in,
        signed(quote.collateral_in)?,
        -signed(quote.debt_in)?,
        &dex,
    );
    liquidity::operate(
        env,
        &pool.constants,
        &token_out,
        -signed(quote.collateral_out)?,
        signed(quote.debt_out)?,
        to,
    );
    liquidity::check_utilization(env, &pool.constants, &token_out, cap)?;

    // A trade routed through one pool leaves the other behind.
    let both_pools = pool.config.smart_collateral_enabled && pool.config.smart_debt_enabled;
    let price = if both_pools && (quote.collateral_in == 0 || quote.debt_in == 0) {
        pool.refresh_reserves(env)?;
        arbitrage::equalize(env, pool)?;
        arbitrage::current_price(pool)?.unwrap_or(quote.price)
    } else {
        quote.price
    };
    oracle::record_price(
        env,
        &mut pool.variables,
        &pool.config,
        price,
        pool.pricing.external_center,
        pool.now,
    )?;
    pool.commit(env);

    DexEvents::swap(
        env,
        user,
        swap0to1,
        signed(quote.amount_in)?,
        signed(quote.amount_out)?,
        to,
    );
    Ok(())
}

pub fn swap_in(
    env: &Env,
    user: &Address,
    swap0to1: bool,
    amount_in: i128,
    amount_out_min: i128,
    to: &Address,
) -> Result<i128, DexError> {
    let amount_in = positive(amount_in)?;
    let amount_out_min = unsigned(amount_out_min)?;
    let mut pool = Pool::load_active(env)?;
    let quote = quote_in(&pool, swap0to1, amount_in)?;
    if quote.amount_out < amount_out_min {
        return Err(DexError::InsufficientOutputAmount);
    }
    settle(env, &mut pool, user, swap0to1, &quote, to)?;
    signed(quote.amount_out)
}

pub fn swap_out(
    env: &Env,
    user: &Address,
    swap0to1: bool,
    amount_out: i128,
    amount_in_max: i128,
    to: &Address,
) -> Result<i128, DexError> {
    let amount_out = positive(amount_out)?;
    let amount_in_max = unsigned(amount_in_max)?;
    let mut pool = Pool::load_active(env)?;
    let quote = quote_out(&pool, swap0to1, amount_out)?;
    if quote.amount_in > amount_in_max {
        return Err(DexError::ExcessiveInputAmount);
    }
    settle(env, &mut pool, user, swap0to1, &quote, to)?;
    signed(quote.amount_in)
}

/// Output of `swap_in` at the current state, without side effects.
pub fn estimate_swap_in(env: &Env, swap0to1: bool, amount_in: i128) -> Result<i128, DexError> {
    reentrancy::ensure_unlocked(env)?;
    let pool = Pool::load_active(env)?;
    let quote = quote_in(&pool, swap0to1, positive(amount_in)?)?;
    oracle::check_price(
        &pool.variables,
        &pool.config,
        quote.price,
        pool.pricing.external_center,
        pool.now,
    )?;
    signed(quote.amount_out)
}

/// Input `swap_out` would charge at the current state, without side effects.
pub fn estimate_swap_out(env: &Env, swap0to1: bool, amount_out: i128) -> Result<i128, DexError> {
    reentrancy::ensure_unlocked(env)?;
    let pool = Pool::load_active(env)?;
    let quote = quote_out(&pool, swap0to1, positive(amount_out)?)?;
    oracle::check_price(
        &pool.variables,
        &pool.config,
        quote.price,
        pool.pricing.external_center,
        pool.now,
    )?;
    signed(quote.amount_in)
}
