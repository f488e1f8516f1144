use ethnum::U256;
use soroban_sdk::{contracttype, Env, Vec};

use crate::{
    constants::ORACLE_CHANGE_PRECISION,
    errors::DexError,
    math::{add, compact::unpack_price, div, mul, mul_div, narrow, reciprocal_price, wide, Rounding},
    oracle::entries_newest_first,
    storage::DexVariables,
};

/// Time-weighted prices over one window, 1e27 precision.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OraclePrice {
    pub twap_1by0: u128,
    pub lowest_price_1by0: u128,
    pub highest_price_1by0: u128,
    pub twap_0by1: u128,
    pub lowest_price_0by1: u128,
    pub highest_price_0by1: u128,
}

struct Accumulator {
    weighted: U256,
    reciprocal_weighted: U256,
    lowest: u128,
    highest: u128,
}

impl Accumulator {
    fn new() -> Self {
        Accumulator {
            weighted: U256::ZERO,
            reciprocal_weighted: U256::ZERO,
            lowest: u128::MAX,
            highest: 0,
        }
    }

    fn add(&mut self, price: u128, reciprocal: u128, duration: u64) -> Result<(), DexError> {
        self.weighted = add(self.weighted, mul(wide(price), wide(duration as u128))?)?;
        self.reciprocal_weighted =
            add(self.reciprocal_weighted, mul(wide(reciprocal), wide(duration as u128))?)?;
        self.lowest = self.lowest.min(price);
        self.highest = self.highest.max(price);
        Ok(())
    }

    fn finish(&self, length: u64) -> Result<OraclePrice, DexError> {
        let length = wide(length as u128);
        Ok(OraclePrice {
            twap_1by0: narrow(div(self.weighted, length, Rounding::Down)?)?,
            lowest_price_1by0: self.lowest,
            highest_price_1by0: self.highest,
            twap_0by1: narrow(div(self.reciprocal_weighted, length, Rounding::Down)?)?,
            lowest_price_0by1: reciprocal_price(self.highest)?,
            highest_price_0by1: reciprocal_price(self.lowest)?,
        })
    }
}

fn validate(lookbacks: &Vec<u64>) -> Result<(), DexError> {
    if lookbacks.is_empty() {
        return Err(DexError::InvalidLookbacks);
    }
    let mut previous = 0_u64;
    for lookback in lookbacks.iter() {
        if lookback <= previous {
            return Err(DexError::InvalidLookbacks);
        }
        previous = lookback;
    }
    Ok(())
}

/// Price held before the one described by `change`.
fn previous_price(price: u128, change: i64) -> Result<u128, DexError> {
    let denominator = ORACLE_CHANGE_PRECISION + change as i128;
    if denominator <= 0 {
        return Err(DexError::DivisionByZero);
    }
    mul_div(price, ORACLE_CHANGE_PRECISION as u128, denominator as u128, Rounding::Down)
}

/// TWAP, lowest and highest price per window plus the current price.
///
/// Window `i` spans `[now - lookbacks[i], now - lookbacks[i - 1]]`, so
/// ascending lookbacks partition the elapsed time. Fails with
/// `InsufficientOracleData` when the log does not reach back far enough.
pub fn oracle_prices(
    env: &Env,
    variables: &DexVariables,
    lookbacks: &Vec<u64>,
    now: u64,
) -> Result<(Vec<OraclePrice>, u128), DexError> {
    validate(lookbacks)?;
    let current = unpack_price(variables.last_price)?;
    let entries = entries_newest_first(env, variables);

    let mut results = Vec::new(env);
    let mut accumulator = Accumulator::new();
    let mut window = 0_u32;
    let mut window_start = 0_u64;
    let mut covered = 0_u64;

    // Segment 0 is the current price; segment k is the price retired by
    // entry k - 1.
    let mut price = current;
    let mut duration = now.saturating_sub(variables.last_swap_timestamp);
    let mut next_entry = 0_u32;

    loop {
        if duration > 0 {
            let reciprocal = reciprocal_price(price)?;
            let mut remaining = duration;
            while remaining > 0 && window < lookbacks.len() {
                let boundary = lookbacks.get(window).ok_or(DexError::InvalidLookbacks)?;
                let take = remaining.min(boundary - covered);
                accumulator.add(price, reciprocal, take)?;
                covered += take;
                remaining -= take;
                if covered == boundary {
                    results.push_back(accumulator.finish(boundary - window_start)?);
                    accumulator = Accumulator::new();
                    window_start = boundary;
                    window += 1;
                }
            }
        }
        if window >= lookbacks.len() {
            break;
        }

        let Some(entry) = entries.get(next_entry) else {
            return Err(DexError::InsufficientOracleData);
        };
        if next_entry == 0 {
            price = unpack_price(variables.last_to_last_price)?;
        } else {
            let Some(newer) = entries.get(next_entry - 1) else {
                return Err(DexError::InsufficientOracleData);
            };
            price = previous_price(price, newer.change)?;
        }
        duration = entry.time_diff as u64;
        next_entry += 1;
    }

    Ok((results, current))
}
