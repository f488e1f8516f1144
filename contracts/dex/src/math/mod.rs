//! Fixed-point arithmetic helpers for price and reserve calculations.
//! Every intermediate product is taken in 256 bits; results that must fit a
//! persisted field are narrowed back with an explicit overflow error.

pub mod compact;

use ethnum::U256;

use crate::{constants::PRICE_PRECISION, errors::DexError};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rounding {
    Down,
    Up,
}

#[inline]
pub fn wide(value: u128) -> U256 {
    U256::new(value)
}

/// Narrows a 256-bit value back to `u128`.
pub fn narrow(value: U256) -> Result<u128, DexError> {
    let (high, low) = value.into_words();
    if high != 0 {
        return Err(DexError::Overflow);
    }
    Ok(low)
}

pub fn mul(a: U256, b: U256) -> Result<U256, DexError> {
    a.checked_mul(b).ok_or(DexError::Overflow)
}

pub fn add(a: U256, b: U256) -> Result<U256, DexError> {
    a.checked_add(b).ok_or(DexError::Overflow)
}

pub fn div(a: U256, b: U256, rounding: Rounding) -> Result<U256, DexError> {
    if b == U256::ZERO {
        return Err(DexError::DivisionByZero);
    }
    let q = a / b;
    if rounding == Rounding::Up && a % b != U256::ZERO {
        return add(q, U256::ONE);
    }
    Ok(q)
}

/// `a * b / denominator` with a 256-bit intermediate.
pub fn mul_div_wide(a: U256, b: U256, denominator: U256, rounding: Rounding) -> Result<U256, DexError> {
    div(mul(a, b)?, denominator, rounding)
}

/// `a * b / denominator` for `u128` operands.
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> Result<u128, DexError> {
    narrow(mul_div_wide(wide(a), wide(b), wide(denominator), rounding)?)
}

/// Integer square root (floor) using Newton's method.
pub fn sqrt(value: U256) -> U256 {
    if value < U256::new(2) {
        return value;
    }
    let mut x = value;
    let mut y = value / U256::new(2) + value % U256::new(2);
    while y < x {
        x = y;
        y = (x + value / x) / U256::new(2);
    }
    x
}

/// `sqrt(a * b)` that stays exact when the product fits 256 bits and falls
/// back to a rescaled path for very large magnitudes.
pub fn sqrt_product(a: U256, b: U256) -> U256 {
    match a.checked_mul(b) {
        Some(product) => sqrt(product),
        None => {
            let scale = U256::new(1_000_000_000_000_000_000);
            sqrt((a / scale) * (b / scale)) * scale
        }
    }
}

/// Reciprocal of a 1e27 price, rounded down.
pub fn reciprocal_price(price: u128) -> Result<u128, DexError> {
    let precision = wide(PRICE_PRECISION);
    narrow(div(mul(precision, precision)?, wide(price), Rounding::Down)?)
}

/// Amounts normalized to `TOKENS_DECIMALS_PRECISION` decimals.
pub fn to_adjusted(amount: u128, decimals: u32, rounding: Rounding) -> Result<u128, DexError> {
    use crate::constants::TOKENS_DECIMALS_PRECISION as P;
    if decimals <= P {
        let factor = 10_u128.pow(P - decimals);
        amount.checked_mul(factor).ok_or(DexError::Overflow)
    } else {
        let factor = 10_u128.pow(decimals - P);
        narrow(div(wide(amount), wide(factor), rounding)?)
    }
}

pub fn from_adjusted(amount: u128, decimals: u32, rounding: Rounding) -> Result<u128, DexError> {
    use crate::constants::TOKENS_DECIMALS_PRECISION as P;
    if decimals <= P {
        let factor = 10_u128.pow(P - decimals);
        narrow(div(wide(amount), wide(factor), rounding)?)
    } else {
        let factor = 10_u128.pow(decimals - P);
        amount.checked_mul(factor).ok_or(DexError::Overflow)
    }
}

/// Non-negative `i128` entry-point amount as `u128`.
pub fn unsigned(amount: i128) -> Result<u128, DexError> {
    if amount < 0 {
        return Err(DexError::ZeroAmount);
    }
    Ok(amount as u128)
}

pub fn signed(amount: u128) -> Result<i128, DexError> {
    i128::try_from(amount).map_err(|_| DexError::Overflow)
}
