//! Coefficient + exponent encoding for persisted prices.
//!
//! A value is stored as `coefficient << exponent` where the coefficient keeps
//! at most `COEFFICIENT_BITS` significant bits. Encoding drops the low bits
//! and rounds the coefficient down or up; decoding is exact. The packed form
//! is `coefficient << EXPONENT_BITS | exponent`.

use crate::{errors::DexError, math::Rounding};

pub const COEFFICIENT_BITS: u32 = 56;
pub const EXPONENT_BITS: u32 = 8;
const EXPONENT_MASK: u64 = (1 << EXPONENT_BITS) - 1;
const COEFFICIENT_MAX: u128 = (1 << COEFFICIENT_BITS) - 1;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CompactFloat {
    coefficient: u64,
    exponent: u8,
}

impl CompactFloat {
    pub const ZERO: CompactFloat = CompactFloat { coefficient: 0, exponent: 0 };

    pub fn encode(value: u128, rounding: Rounding) -> Self {
        let bits = 128 - value.leading_zeros();
        if bits <= COEFFICIENT_BITS {
            return CompactFloat { coefficient: value as u64, exponent: 0 };
        }
        let mut exponent = bits - COEFFICIENT_BITS;
        let mut coefficient = value >> exponent;
        let dropped = value & ((1_u128 << exponent) - 1);
        if rounding == Rounding::Up && dropped != 0 {
            coefficient += 1;
            if coefficient > COEFFICIENT_MAX {
                // carried into a new bit: renormalize, the dropped bit is zero
                coefficient >>= 1;
                exponent += 1;
            }
        }
        CompactFloat { coefficient: coefficient as u64, exponent: exponent as u8 }
    }

    pub fn decode(self) -> Result<u128, DexError> {
        let coefficient = self.coefficient as u128;
        if coefficient == 0 {
            return Ok(0);
        }
        let exponent = self.exponent as u32;
        if exponent + (128 - coefficient.leading_zeros()) > 128 {
            return Err(DexError::Overflow);
        }
        Ok(coefficient << exponent)
    }

    pub fn pack(self) -> u64 {
        (self.coefficient << EXPONENT_BITS) | self.exponent as u64
    }

    pub fn unpack(packed: u64) -> Self {
        CompactFloat {
            coefficient: packed >> EXPONENT_BITS,
            exponent: (packed & EXPONENT_MASK) as u8,
        }
    }

    pub fn coefficient(self) -> u64 {
        self.coefficient
    }

    pub fn exponent(self) -> u8 {
        self.exponent
    }
}

/// Packs a price rounded down, the form every persisted price uses.
pub fn pack_price(price: u128) -> u64 {
    CompactFloat::encode(price, Rounding::Down).pack()
}

pub fn unpack_price(packed: u64) -> Result<u128, DexError> {
    CompactFloat::unpack(packed).decode()
}
