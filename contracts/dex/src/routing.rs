//! Split of a trade across the collateral and debt pools.
//!
//! Routing `a` through the collateral pool and `t - a` through the debt pool
//! equalizes the post-trade price of both when
//! `(x1 + a) / sqrt(k1) == (x2 + t - a) / sqrt(k2)`, which is linear in `a`
//! once both depths `sqrt(k)` are known.

use ethnum::U256;

use crate::{
    constants::{MIN_RESERVES_RATIO, PRICE_PRECISION},
    errors::DexError,
    math::{add, div, mul, mul_div, narrow, sqrt_product, wide, Rounding},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Route {
    Collateral,
    Debt,
    Split { collateral: u128, debt: u128 },
}

/// `sqrt(x * y)` of a pool.
pub fn depth(x: u128, y: u128) -> U256 {
    sqrt_product(wide(x), wide(y))
}

/// `(positive, |numerator - subtrahend| / denominator)`.
fn signed_quotient(
    numerator: U256,
    subtrahend: U256,
    denominator: U256,
) -> Result<(bool, u128), DexError> {
    if denominator == U256::ZERO {
        return Err(DexError::TokenReservesTooLow);
    }
    if numerator >= subtrahend {
        Ok((true, narrow(div(numerator - subtrahend, denominator, Rounding::Down)?)?))
    } else {
        Ok((false, narrow(div(subtrahend - numerator, denominator, Rounding::Down)?)?))
    }
}

fn classify(total: u128, positive: bool, amount: u128) -> Route {
    if !positive || amount == 0 {
        Route::Debt
    } else if amount >= total {
        Route::Collateral
    } else {
        Route::Split { collateral: amount, debt: total - amount }
    }
}

/// Route for an exact input `total`. `x` are input-token and `y`
/// output-token imaginary reserves; index 1 is collateral, 2 is debt.
pub fn route_in(total: u128, x1: u128, y1: u128, x2: u128, y2: u128) -> Result<Route, DexError> {
    let r1 = depth(x1, y1);
    let r2 = depth(x2, y2);
    let numerator = mul(r1, add(wide(x2), wide(total))?)?;
    let subtrahend = mul(r2, wide(x1))?;
    let (positive, amount) = signed_quotient(numerator, subtrahend, add(r1, r2)?)?;
    Ok(classify(total, positive, amount))
}

/// Route for an exact output `total`, same reserve layout as [`route_in`].
pub fn route_out(total: u128, x1: u128, y1: u128, x2: u128, y2: u128) -> Result<Route, DexError> {
    let r1 = depth(x1, y1);
    let r2 = depth(x2, y2);
    let numerator = add(mul(r1, wide(total))?, mul(r2, wide(y1))?)?;
    let subtrahend = mul(r1, wide(y2))?;
    let (positive, amount) = signed_quotient(numerator, subtrahend, add(r1, r2)?)?;
    Ok(classify(total, positive, amount))
}

/// Token0 amount that moves from the debt pool into the collateral pool
/// (positive) or the other way (negative) to equalize both prices. Reserves
/// are `(token0, token1)` imaginary reserves.
pub fn equalizing_amount(
    collateral: (u128, u128),
    debt: (u128, u128),
) -> Result<(bool, u128), DexError> {
    let r1 = depth(collateral.0, collateral.1);
    let r2 = depth(debt.0, debt.1);
    signed_quotient(
        mul(r1, wide(debt.0))?,
        mul(r2, wide(collateral.0))?,
        add(r1, r2)?,
    )
}

/// Constant-product output for `amount_in`, rounded down.
pub fn amount_out(amount_in: u128, reserve_in: u128, reserve_out: u128) -> Result<u128, DexError> {
    let denominator = reserve_in.checked_add(amount_in).ok_or(DexError::Overflow)?;
    mul_div(amount_in, reserve_out, denominator, Rounding::Down)
}

/// Constant-product input needed for `amount_out`, rounded up.
pub fn amount_in(amount_out: u128, reserve_in: u128, reserve_out: u128) -> Result<u128, DexError> {
    if amount_out >= reserve_out {
        return Err(DexError::InsufficientReserves);
    }
    mul_div(amount_out, reserve_in, reserve_out - amount_out, Rounding::Up)
}

/// One pool seen from the swap direction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PoolSide {
    pub in_imaginary: u128,
    pub out_imaginary: u128,
    pub in_real: u128,
    pub out_real: u128,
}

impl PoolSide {
    /// Fails unless the output fits the real reserve and the remaining
    /// output reserve stays above `1 / MIN_RESERVES_RATIO` of the input
    /// reserve valued at the post-trade price.
    pub fn check_after(&self, amount_in: u128, amount_out: u128) -> Result<(), DexError> {
        if amount_out > self.out_real {
            return Err(DexError::InsufficientReserves);
        }
        let out_real = self.out_real - amount_out;
        let in_real = self.in_real.checked_add(amount_in).ok_or(DexError::Overflow)?;
        let in_imaginary = self.in_imaginary.checked_add(amount_in).ok_or(DexError::Overflow)?;
        let out_imaginary = self.out_imaginary - amount_out.min(self.out_imaginary);
        let in_value = mul_div(in_real, out_imaginary, in_imaginary, Rounding::Down)?;
        if mul(wide(out_real), wide(MIN_RESERVES_RATIO))? < wide(in_value) {
            return Err(DexError::TokenReservesTooLow);
        }
        Ok(())
    }

    /// Post-trade price (token1 per token0, 1e27) of this pool.
    pub fn price_after(
        &self,
        swap0to1: bool,
        amount_in: u128,
        amount_out: u128,
    ) -> Result<u128, DexError> {
        let in_imaginary = self.in_imaginary.checked_add(amount_in).ok_or(DexError::Overflow)?;
        let out_imaginary = self
            .out_imaginary
            .checked_sub(amount_out)
            .ok_or(DexError::InsufficientReserves)?;
        let (token0, token1) = if swap0to1 {
            (in_imaginary, out_imaginary)
        } else {
            (out_imaginary, in_imaginary)
        };
        if token0 == 0 {
            return Err(DexError::TokenReservesTooLow);
        }
        mul_div(token1, PRICE_PRECISION, token0, Rounding::Down)
    }
}
