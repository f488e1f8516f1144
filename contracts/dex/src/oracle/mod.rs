//! Price log for TWAP queries.
//!
//! The primary record keeps the last price, the price before it and when the
//! last one was set. Each time the price moves into a new second, one entry
//! is appended describing the price being retired: how long it was held and
//! its change relative to the price before it. Entries live in a ring of
//! `ORACLE_PAGES` pages of `ORACLE_PAGE_SLOTS` slots; the oldest page is
//! overwritten once the ring is full.

pub mod twap;

use soroban_sdk::{Env, Vec};

use crate::{
    constants::{
        ORACLE_CHANGE_PRECISION, ORACLE_MAX_TIME_DIFF, ORACLE_PAGES, ORACLE_PAGE_SLOTS,
        SIX_DECIMALS,
    },
    errors::DexError,
    events::DexEvents,
    math::{
        compact::{pack_price, unpack_price},
        mul, mul_div, wide, Rounding,
    },
    storage::{get_oracle_page, set_oracle_page, DexConfig, DexVariables, OracleEntry},
};

/// `|price - reference| / reference <= max_percent` (1e6 = 100%).
fn within(price: u128, reference: u128, max_percent: u32) -> Result<bool, DexError> {
    let diff = price.abs_diff(reference);
    Ok(mul(wide(diff), wide(SIX_DECIMALS))? <= mul(wide(reference), wide(max_percent as u128))?)
}

/// Fails unless `price` may be recorded at `now`.
///
/// Within a new second the move is bounded against the last price. Further
/// swaps in the same second are bounded against the price before it, and
/// against a live center price if one is configured.
pub fn check_price(
    variables: &DexVariables,
    config: &DexConfig,
    price: u128,
    external_center: Option<u128>,
    now: u64,
) -> Result<(), DexError> {
    let limit = config.max_price_change_percent;
    if now > variables.last_swap_timestamp {
        if !within(price, unpack_price(variables.last_price)?, limit)? {
            return Err(DexError::PriceChangeTooLarge);
        }
        return Ok(());
    }
    if !within(price, unpack_price(variables.last_to_last_price)?, limit)? {
        return Err(DexError::PriceChangeTooLarge);
    }
    if let Some(center) = external_center {
        if !within(price, center, limit)? {
            return Err(DexError::CenterPriceDeviation);
        }
    }
    Ok(())
}

/// Signed change `(last - previous) / previous`, scaled by 1e12.
pub fn price_change(last: u128, previous: u128) -> Result<i64, DexError> {
    if previous == 0 {
        return Err(DexError::DivisionByZero);
    }
    let diff = last.abs_diff(previous);
    let magnitude = mul_div(diff, ORACLE_CHANGE_PRECISION as u128, previous, Rounding::Down)?;
    let magnitude = i64::try_from(magnitude).map_err(|_| DexError::Overflow)?;
    Ok(if last >= previous { magnitude } else { -magnitude })
}

fn append(env: &Env, variables: &mut DexVariables, entry: OracleEntry) {
    let page_index = variables.oracle_page;
    let slot = variables.oracle_slot;
    let mut page = get_oracle_page(env, page_index).unwrap_or_else(|| Vec::new(env));
    if slot < page.len() {
        page.set(slot, entry);
    } else {
        page.push_back(entry);
    }
    set_oracle_page(env, page_index, &page);

    if slot + 1 >= ORACLE_PAGE_SLOTS {
        variables.oracle_page = (page_index + 1) % ORACLE_PAGES;
        variables.oracle_slot = 0;
    } else {
        variables.oracle_slot = slot + 1;
    }
}

/// Checks and records `price` as the latest swap price.
pub fn record_price(
    env: &Env,
    variables: &mut DexVariables,
    config: &DexConfig,
    price: u128,
    external_center: Option<u128>,
    now: u64,
) -> Result<(), DexError> {
    check_price(variables, config, price, external_center, now)?;

    if now > variables.last_swap_timestamp {
        let last = unpack_price(variables.last_price)?;
        let previous = unpack_price(variables.last_to_last_price)?;
        let held = (now - variables.last_swap_timestamp).min(ORACLE_MAX_TIME_DIFF);
        let entry = OracleEntry {
            time_diff: held as u32,
            change: price_change(last, previous)?,
        };
        append(env, variables, entry);
        DexEvents::oracle_entry(env, entry.time_diff, entry.change, price);

        variables.last_to_last_price = variables.last_price;
        variables.last_interaction_duration = held;
        variables.last_swap_timestamp = now;
    }
    variables.last_price = pack_price(price);
    Ok(())
}

/// Entries from newest to oldest, at most one full ring.
pub fn entries_newest_first(env: &Env, variables: &DexVariables) -> Vec<OracleEntry> {
    let mut out = Vec::new(env);
    let mut page_index = variables.oracle_page;
    let mut slot = variables.oracle_slot;
    let mut page = get_oracle_page(env, page_index);

    for _ in 0..ORACLE_PAGES * ORACLE_PAGE_SLOTS {
        if slot == 0 {
            page_index = (page_index + ORACLE_PAGES - 1) % ORACLE_PAGES;
            slot = ORACLE_PAGE_SLOTS;
            page = get_oracle_page(env, page_index);
        }
        slot -= 1;
        let Some(entry) = page.as_ref().and_then(|entries| entries.get(slot)) else {
            break;
        };
        out.push_back(entry);
    }
    out
}
