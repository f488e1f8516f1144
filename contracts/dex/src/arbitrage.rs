//! Re-equalizes the collateral and debt pool prices after every position
//! change, after swaps routed through a single pool and whenever both pools
//! come online. The trade nets out at the reserve service: one token is supplied
//! to one pool and borrowed from the other, the other token is withdrawn
//! from one pool and paid back to the other.

use soroban_sdk::{log, Env};

use crate::{
    constants::ARBITRAGE_DUST_RATIO,
    errors::DexError,
    events::DexEvents,
    hooks, liquidity,
    math::{from_adjusted, mul, signed, wide, Rounding},
    oracle,
    pool::Pool,
    pricing::reserves_price,
    reserves::{CollateralReserves, DebtReserves},
    routing,
};

/// Token0 and token1 moved by one arbitrage, decimal-adjusted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Arbitrage {
    /// Token0 moves from the debt pool into the collateral pool when set.
    pub into_collateral: bool,
    pub token0: u128,
    pub token1: u128,
}

/// Sizes the arbitrage for the given reserves; `None` when either pool is
/// empty or the move is dust.
pub fn plan(c: &CollateralReserves, d: &DebtReserves) -> Result<Option<Arbitrage>, DexError> {
    if c.token0_imaginary_reserves == 0 || d.token0_imaginary_reserves == 0 {
        return Ok(None);
    }

    let (into_collateral, amount) = routing::equalizing_amount(
        (c.token0_imaginary_reserves, c.token1_imaginary_reserves),
        (d.token0_imaginary_reserves, d.token1_imaginary_reserves),
    )?;
    if amount == 0
        || mul(wide(amount), wide(ARBITRAGE_DUST_RATIO))? < wide(c.token0_imaginary_reserves)
    {
        return Ok(None);
    }

    let planned = if into_collateral {
        // Borrow token0 from the debt pool, pay it back in token1 that the
        // collateral pool releases.
        let mut token0 = amount.min(d.token0_real_reserves).min(c.token0_imaginary_reserves);
        let mut token1 = routing::amount_in(token0, d.token1_imaginary_reserves, d.token0_imaginary_reserves)?;
        let payable = c.token1_real_reserves.min(d.token1_debt);
        if token1 > payable {
            token1 = payable;
            token0 = routing::amount_out(token1, d.token1_imaginary_reserves, d.token0_imaginary_reserves)?;
        }
        Arbitrage { into_collateral, token0, token1 }
    } else {
        // Withdraw token0 from the collateral pool to pay back debt, funded
        // by borrowing token1 into the collateral pool.
        let mut token0 = amount.min(c.token0_real_reserves).min(d.token0_debt);
        let mut token1 = routing::amount_in(token0, c.token1_imaginary_reserves, c.token0_imaginary_reserves)?;
        if token1 > d.token1_real_reserves {
            token1 = d.token1_real_reserves;
            token0 = routing::amount_out(token1, c.token1_imaginary_reserves, c.token0_imaginary_reserves)?
                .min(c.token0_real_reserves)
                .min(d.token0_debt);
        }
        Arbitrage { into_collateral, token0, token1 }
    };
    if planned.token0 == 0 || planned.token1 == 0 {
        return Ok(None);
    }
    Ok(Some(planned))
}

/// Trades the pools back to one price when both are enabled and their
/// prices drifted apart. Expects `pool` reserves to be current and leaves
/// them current.
pub fn equalize(env: &Env, pool: &mut Pool) -> Result<(), DexError> {
    if !pool.config.smart_collateral_enabled || !pool.config.smart_debt_enabled {
        return Ok(());
    }
    let Some(arbitrage) = plan(&pool.collateral, &pool.debt)? else {
        return Ok(());
    };
    let amount0 = from_adjusted(arbitrage.token0, pool.constants.token0_decimals, Rounding::Down)?;
    let amount1 = from_adjusted(arbitrage.token1, pool.constants.token1_decimals, Rounding::Up)?;
    if amount0 == 0 || amount1 == 0 {
        log!(env, "arbitrage below token precision, skipped");
        return Ok(());
    }

    let constants = pool.constants.clone();
    let service = constants.liquidity.clone();
    let (amount0, amount1) = (signed(amount0)?, signed(amount1)?);
    let (delta0, delta1) = if arbitrage.into_collateral {
        (amount0, -amount1)
    } else {
        (-amount0, amount1)
    };
    liquidity::operate(env, &constants, &constants.token0, delta0, delta0, &service);
    liquidity::operate(env, &constants, &constants.token1, delta1, delta1, &service);
    pool.refresh_reserves(env)?;

    let price = reserves_price(
        pool.collateral.token0_imaginary_reserves,
        pool.collateral.token1_imaginary_reserves,
    )?;
    DexEvents::arbitrage(env, delta0, delta1, price);
    hooks::notify_arbitrage(env, &constants, &pool.config, arbitrage.into_collateral, price);
    Ok(())
}

/// Arbitrages the pools if their prices drifted apart and records the
/// resulting price with the oracle.
pub fn rebalance(env: &Env, pool: &mut Pool) -> Result<(), DexError> {
    pool.refresh_reserves(env)?;
    equalize(env, pool)?;

    if let Some(price) = current_price(pool)? {
        oracle::record_price(
            env,
            &mut pool.variables,
            &pool.config,
            price,
            pool.pricing.external_center,
            pool.now,
        )?;
    }
    Ok(())
}

/// Price of the collateral pool, or of the debt pool when it is the only
/// one with reserves.
pub fn current_price(pool: &Pool) -> Result<Option<u128>, DexError> {
    let c = &pool.collateral;
    if pool.config.smart_collateral_enabled && c.token0_imaginary_reserves > 0 {
        return Ok(Some(reserves_price(c.token0_imaginary_reserves, c.token1_imaginary_reserves)?));
    }
    let d = &pool.debt;
    if pool.config.smart_debt_enabled && d.token0_imaginary_reserves > 0 {
        return Ok(Some(reserves_price(d.token0_imaginary_reserves, d.token1_imaginary_reserves)?));
    }
    Ok(None)
}
