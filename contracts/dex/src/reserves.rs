//! Real and imaginary reserves of both pools.
//!
//! Real reserves are what the dex holds at the reserve service. Imaginary
//! reserves extend the constant-product curve so that it trades exactly
//! within `[lower, upper]`: the collateral curve runs out of token1 at the
//! upper bound, the debt curve is anchored by the current debt at the bound
//! below (or above) the geometric mean.

use ethnum::U256;
use soroban_sdk::contracttype;

use crate::{
    constants::{MINIMUM_LIQUIDITY_SWAP, PRICE_PRECISION},
    errors::DexError,
    math::{add, div, mul, mul_div, mul_div_wide, narrow, reciprocal_price, sqrt, sqrt_product, wide, Rounding},
    pricing::PoolPrices,
};

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CollateralReserves {
    pub token0_real_reserves: u128,
    pub token1_real_reserves: u128,
    pub token0_imaginary_reserves: u128,
    pub token1_imaginary_reserves: u128,
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DebtReserves {
    pub token0_debt: u128,
    pub token1_debt: u128,
    pub token0_real_reserves: u128,
    pub token1_real_reserves: u128,
    pub token0_imaginary_reserves: u128,
    pub token1_imaginary_reserves: u128,
}

/// `rx * ry * 1e27 / p1`, dividing first when the product does not fit.
fn scaled_product(rx: u128, ry: u128, p1: U256) -> Result<U256, DexError> {
    let product = mul(wide(rx), wide(ry))?;
    match product.checked_mul(wide(PRICE_PRECISION)) {
        Some(scaled) => div(scaled, p1, Rounding::Down),
        None => mul(div(product, p1, Rounding::Down)?, wide(PRICE_PRECISION)),
    }
}

/// Additional `(token_x, token_y)` amounts that put a pool with real
/// reserves `(rx, ry)` on the curve pivoting at `gp` whose token_y side is
/// exhausted at `pa`.
///
/// Solves `xa^2 - 2 p2 xa - p3 = 0` for the positive root where
/// `p1 = pa - gp`, `p2 = (gp rx + ry) / 2 p1` and `p3 = rx ry / p1`.
fn outside_range(gp: u128, pa: u128, rx: u128, ry: u128) -> Result<(u128, u128), DexError> {
    if pa <= gp {
        return Err(DexError::InvalidConfig);
    }
    let p1 = wide(pa - gp);
    let numerator = add(mul(wide(gp), wide(rx))?, mul(wide(ry), wide(PRICE_PRECISION))?)?;
    let p2 = div(numerator, mul(p1, U256::new(2))?, Rounding::Down)?;
    let p3 = scaled_product(rx, ry, p1)?;
    let xa = add(p2, sqrt(add(p3, mul(p2, p2)?)?))?;
    let yb = mul_div_wide(xa, wide(gp), wide(PRICE_PRECISION), Rounding::Down)?;
    Ok((narrow(xa)?, narrow(yb)?))
}

pub fn collateral_reserves(
    prices: &PoolPrices,
    token0_supply: u128,
    token1_supply: u128,
) -> Result<CollateralReserves, DexError> {
    if token0_supply == 0 && token1_supply == 0 {
        return Ok(CollateralReserves::default());
    }
    let gp = prices.geometric_mean;
    let (token0_extra, token1_extra) = if gp < PRICE_PRECISION {
        outside_range(gp, prices.upper, token0_supply, token1_supply)?
    } else {
        // Solve in the inverted pair for precision; the lower bound becomes
        // the upper one.
        let (token1_extra, token0_extra) = outside_range(
            reciprocal_price(gp)?,
            reciprocal_price(prices.lower)?,
            token1_supply,
            token0_supply,
        )?;
        (token0_extra, token1_extra)
    };
    Ok(CollateralReserves {
        token0_real_reserves: token0_supply,
        token1_real_reserves: token1_supply,
        token0_imaginary_reserves: token0_supply
            .checked_add(token0_extra)
            .ok_or(DexError::Overflow)?,
        token1_imaginary_reserves: token1_supply
            .checked_add(token1_extra)
            .ok_or(DexError::Overflow)?,
    })
}

/// Root `xb` of the debt curve anchored at `pb` for debts `(dx, dy)`.
fn debt_bound(gp: u128, pb: u128, dx: u128, dy: u128) -> Result<U256, DexError> {
    if gp <= pb {
        return Err(DexError::InvalidConfig);
    }
    let p1 = wide(gp - pb);
    let numerator = add(mul(wide(gp), wide(dx))?, mul(wide(dy), wide(PRICE_PRECISION))?)?;
    let p2 = div(numerator, mul(p1, U256::new(2))?, Rounding::Down)?;
    let p3 = scaled_product(dx, dy, p1)?;
    let square = mul(p2, p2)?;
    let discriminant = if square > p3 { square - p3 } else { U256::ZERO };
    add(p2, sqrt(discriminant))
}

fn checked_sub(a: u128, b: u128) -> Result<u128, DexError> {
    a.checked_sub(b).ok_or(DexError::DebtReservesTooLow)
}

pub fn debt_reserves(
    prices: &PoolPrices,
    token0_debt: u128,
    token1_debt: u128,
) -> Result<DebtReserves, DexError> {
    if token0_debt == 0 && token1_debt == 0 {
        return Ok(DebtReserves::default());
    }
    let gp = prices.geometric_mean;
    let (x, y) = if gp < PRICE_PRECISION {
        let xb = debt_bound(gp, prices.lower, token0_debt, token1_debt)?;
        let yb = mul_div_wide(xb, wide(gp), wide(PRICE_PRECISION), Rounding::Down)?;
        (
            checked_sub(narrow(xb)?, token0_debt)?,
            checked_sub(narrow(yb)?, token1_debt)?,
        )
    } else {
        let ya = debt_bound(
            reciprocal_price(gp)?,
            reciprocal_price(prices.upper)?,
            token1_debt,
            token0_debt,
        )?;
        let xa = mul_div_wide(ya, wide(PRICE_PRECISION), wide(gp), Rounding::Down)?;
        (
            checked_sub(narrow(xa)?, token0_debt)?,
            checked_sub(narrow(ya)?, token1_debt)?,
        )
    };
    if x < MINIMUM_LIQUIDITY_SWAP || y < MINIMUM_LIQUIDITY_SWAP {
        return Err(DexError::DebtReservesTooLow);
    }

    // Real reserves are what can be borrowed before the price reaches the
    // opposite bound.
    let x_at_upper = narrow(sqrt_product(
        wide(x),
        wide(mul_div(y, PRICE_PRECISION, prices.upper, Rounding::Down)?),
    ))?;
    let y_at_lower = narrow(sqrt_product(
        wide(mul_div(x, prices.lower, PRICE_PRECISION, Rounding::Down)?),
        wide(y),
    ))?;

    Ok(DebtReserves {
        token0_debt,
        token1_debt,
        token0_real_reserves: x.saturating_sub(x_at_upper),
        token1_real_reserves: y.saturating_sub(y_at_lower),
        token0_imaginary_reserves: x,
        token1_imaginary_reserves: y,
    })
}
