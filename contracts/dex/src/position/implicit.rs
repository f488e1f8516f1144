//! Closed forms for position changes that include an implicit swap.
//!
//! Each solves a quadratic in either the swapped amount `s` or the share
//! fraction `g` so that, after swapping through the pool's imaginary
//! reserves, what the user adds or removes matches the pool proportions.
//! Roots are taken in the form that avoids cancellation for either sign of
//! the linear coefficient.

use ethnum::U256;

use crate::{
    errors::DexError,
    math::{add, div, mul, narrow, sqrt, wide, Rounding},
};

/// `numerator / denominator`, always below one once validated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Fraction {
    pub numerator: U256,
    pub denominator: U256,
}

impl Fraction {
    pub fn of(&self, amount: u128, rounding: Rounding) -> Result<u128, DexError> {
        narrow(div(mul(wide(amount), self.numerator)?, self.denominator, rounding)?)
    }

    fn below_one(self) -> Result<Self, DexError> {
        if self.denominator == U256::ZERO {
            return Err(DexError::NoSolution);
        }
        if self.numerator >= self.denominator {
            return Err(DexError::InsufficientReserves);
        }
        Ok(self)
    }
}

/// Signed value kept as magnitude and sign.
#[derive(Clone, Copy)]
struct Signed {
    magnitude: U256,
    negative: bool,
}

impl Signed {
    fn from_difference(positive: U256, negative: U256) -> Self {
        if positive >= negative {
            Signed { magnitude: positive - negative, negative: false }
        } else {
            Signed { magnitude: negative - positive, negative: true }
        }
    }
}

/// `a * b / c` in 256 bits, rounded down.
fn ratio(a: U256, b: U256, c: u128) -> Result<U256, DexError> {
    div(mul(a, b)?, wide(c), Rounding::Down)
}

/// Positive root of `s^2 + b s - p = 0`.
fn monic_root(b: Signed, p: U256) -> Result<U256, DexError> {
    let root = sqrt(add(mul(b.magnitude, b.magnitude)?, mul(p, U256::new(4))?)?);
    if b.negative {
        Ok((b.magnitude + root) / U256::new(2))
    } else {
        div(mul(p, U256::new(2))?, add(b.magnitude, root)?, Rounding::Down)
    }
}

/// Positive root of `a g^2 + b g - w = 0`.
fn root_fraction(a: U256, b: Signed, w: U256) -> Result<Fraction, DexError> {
    let root = sqrt(add(mul(b.magnitude, b.magnitude)?, mul(mul(a, w)?, U256::new(4))?)?);
    if b.negative {
        Ok(Fraction { numerator: add(b.magnitude, root)?, denominator: mul(a, U256::new(2))? })
    } else {
        Ok(Fraction { numerator: mul(w, U256::new(2))?, denominator: add(b.magnitude, root)? })
    }
}

/// Part `s` of a one-token deposit `c` to swap into the other token so the
/// rest and the swap output match the collateral ratio.
///
/// `s^2 + (X - c + Y (rx + c) / ry) s - c X = 0`.
pub fn swap_and_deposit(
    c: u128,
    real_in: u128,
    real_other: u128,
    imaginary_in: u128,
    imaginary_other: u128,
) -> Result<u128, DexError> {
    if real_other == 0 {
        return Err(DexError::InsufficientReserves);
    }
    let scaled_other = ratio(wide(imaginary_other), add(wide(real_in), wide(c))?, real_other)?;
    let b = Signed::from_difference(add(wide(imaginary_in), scaled_other)?, wide(c));
    narrow(monic_root(b, mul(wide(c), wide(imaginary_in))?)?)
}

/// Share fraction `g` to burn so that `g rx` plus the swap of `g ry` yields
/// `w` of the wanted token. The pool is scaled by `1 - g` before the swap.
///
/// `A g^2 - B g + w = 0` with `A = rx + ry (X - rx) / Y` and
/// `B = rx + w + ry (X - w) / Y`; the smaller root applies.
pub fn withdraw_and_swap(
    w: u128,
    real_out: u128,
    real_other: u128,
    imaginary_out: u128,
    imaginary_other: u128,
) -> Result<Fraction, DexError> {
    if imaginary_other == 0 {
        return Err(DexError::InsufficientReserves);
    }
    let a = add(
        wide(real_out),
        ratio(wide(real_other), wide(imaginary_out.saturating_sub(real_out)), imaginary_other)?,
    )?;
    let base = add(wide(real_out), wide(w))?;
    let b = if imaginary_out >= w {
        add(base, ratio(wide(real_other), wide(imaginary_out - w), imaginary_other)?)?
    } else {
        let correction = ratio(wide(real_other), wide(w - imaginary_out), imaginary_other)?;
        if correction >= base {
            return Err(DexError::NoSolution);
        }
        base - correction
    };
    let square = mul(b, b)?;
    let product = mul(mul(a, wide(w))?, U256::new(4))?;
    if product > square {
        return Err(DexError::NoSolution);
    }
    Fraction {
        numerator: mul(wide(w), U256::new(2))?,
        denominator: add(b, sqrt(square - product))?,
    }
    .below_one()
}

/// Share fraction `g` of new debt so that `g dx` plus the swap of `g dy`
/// yields `w` of the wanted token. The pool is scaled by `1 + g`.
///
/// `A g^2 + B g - w = 0` with `A = dx + dy (dx + X) / Y` and
/// `B = dx + dy X / Y - w - w dy / Y`.
pub fn borrow_and_swap(
    w: u128,
    debt_out: u128,
    debt_other: u128,
    imaginary_out: u128,
    imaginary_other: u128,
) -> Result<Fraction, DexError> {
    if imaginary_other == 0 {
        return Err(DexError::InsufficientReserves);
    }
    let a = add(
        wide(debt_out),
        ratio(wide(debt_other), add(wide(debt_out), wide(imaginary_out))?, imaginary_other)?,
    )?;
    let positive = add(
        wide(debt_out),
        ratio(wide(debt_other), wide(imaginary_out), imaginary_other)?,
    )?;
    let negative = add(wide(w), ratio(wide(w), wide(debt_other), imaginary_other)?)?;
    let b = Signed::from_difference(positive, negative);
    root_fraction(a, b, wide(w))?.below_one()
}

/// Part `s` of a one-token payback `c` to swap into the other debt token so
/// the rest and the swap output match the debt ratio.
///
/// `s^2 + (X - c + Y (dx - c) / dy) s - c X = 0`.
pub fn swap_and_payback(
    c: u128,
    debt_in: u128,
    debt_other: u128,
    imaginary_in: u128,
    imaginary_other: u128,
) -> Result<u128, DexError> {
    if debt_other == 0 {
        return Err(DexError::InsufficientReserves);
    }
    let (positive, negative) = if debt_in >= c {
        (
            add(
                wide(imaginary_in),
                ratio(wide(imaginary_other), wide(debt_in - c), debt_other)?,
            )?,
            wide(c),
        )
    } else {
        (
            wide(imaginary_in),
            add(wide(c), ratio(wide(imaginary_other), wide(c - debt_in), debt_other)?)?,
        )
    };
    let b = Signed::from_difference(positive, negative);
    narrow(monic_root(b, mul(wide(c), wide(imaginary_in))?)?)
}
