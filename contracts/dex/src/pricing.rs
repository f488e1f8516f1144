//! Center price, active range and geometric mean.
//!
//! Every shift (range, threshold, center price) is a linear interpolation
//! from the value in force when it started toward the configured target.
//! Computing prices never writes: finished shifts and a moved center price
//! are returned as [`PendingUpdates`] that mutating entry points commit.

use soroban_sdk::{contracttype, log, Env};
use twinpool_liquidity_interface::CenterPriceClient;

use crate::{
    constants::{PRICE_PRECISION, SIX_DECIMALS},
    errors::DexError,
    math::{
        compact::{pack_price, unpack_price},
        mul_div, narrow, sqrt_product, wide, Rounding,
    },
    storage::{
        get_center_price_shift, get_range_shift, get_threshold_shift, remove_center_price_shift,
        remove_range_shift, remove_threshold_shift, set_config, DexConfig, DexVariables,
    },
};

/// Prices are token1 per token0, 1e27 precision.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolPrices {
    pub center: u128,
    pub upper: u128,
    pub lower: u128,
    pub geometric_mean: u128,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PendingUpdates {
    pub clear_range_shift: bool,
    pub clear_threshold_shift: bool,
    pub clear_center_price_shift: bool,
    /// New stored center price after threshold rebalancing or clamping.
    pub center_price: Option<u128>,
}

impl PendingUpdates {
    /// Writes finished shifts and the moved center price.
    pub fn commit(&self, env: &Env, config: &mut DexConfig, variables: &mut DexVariables) {
        let mut config_changed = false;
        if self.clear_range_shift {
            remove_range_shift(env);
            config.range_shift_active = false;
            config_changed = true;
            log!(env, "range shift finished");
        }
        if self.clear_threshold_shift {
            remove_threshold_shift(env);
            config.threshold_shift_active = false;
            config_changed = true;
            log!(env, "threshold shift finished");
        }
        if self.clear_center_price_shift {
            remove_center_price_shift(env);
            config.center_price_shift_active = false;
            config_changed = true;
            log!(env, "center price shift finished");
        }
        if config_changed {
            set_config(env, config);
        }
        if let Some(center) = self.center_price {
            variables.center_price = pack_price(center);
        }
    }
}

pub struct Pricing {
    pub prices: PoolPrices,
    pub pending: PendingUpdates,
    /// Center price read from the configured external source, if any.
    pub external_center: Option<u128>,
}

/// `old + (new - old) * elapsed / duration`, never past `new`.
pub fn interpolate(old: u128, new: u128, elapsed: u64, duration: u64) -> Result<u128, DexError> {
    if duration == 0 || elapsed >= duration {
        return Ok(new);
    }
    let (elapsed, duration) = (elapsed as u128, duration as u128);
    if new >= old {
        Ok(old + mul_div(new - old, elapsed, duration, Rounding::Down)?)
    } else {
        Ok(old - mul_div(old - new, elapsed, duration, Rounding::Down)?)
    }
}

fn interpolate_percent(old: u32, new: u32, elapsed: u64, duration: u64) -> Result<u32, DexError> {
    let value = interpolate(old as u128, new as u128, elapsed, duration)?;
    u32::try_from(value).map_err(|_| DexError::Overflow)
}

/// Live `(upper, lower)` range percents and whether the range shift is done.
pub fn range_percents(
    env: &Env,
    config: &DexConfig,
    now: u64,
) -> Result<(u32, u32, bool), DexError> {
    let target = (config.upper_range_percent, config.lower_range_percent);
    if !config.range_shift_active {
        return Ok((target.0, target.1, false));
    }
    let Some(shift) = get_range_shift(env) else {
        return Ok((target.0, target.1, true));
    };
    let elapsed = now.saturating_sub(shift.start_timestamp);
    if elapsed >= shift.duration {
        return Ok((target.0, target.1, true));
    }
    Ok((
        interpolate_percent(shift.old_upper_percent, target.0, elapsed, shift.duration)?,
        interpolate_percent(shift.old_lower_percent, target.1, elapsed, shift.duration)?,
        false,
    ))
}

/// Live `(upper, lower, threshold_time)` and whether the threshold shift is
/// done.
pub fn threshold_values(
    env: &Env,
    config: &DexConfig,
    now: u64,
) -> Result<(u32, u32, u32, bool), DexError> {
    let target = (
        config.upper_threshold_percent,
        config.lower_threshold_percent,
        config.threshold_shift_time,
    );
    if !config.threshold_shift_active {
        return Ok((target.0, target.1, target.2, false));
    }
    let Some(shift) = get_threshold_shift(env) else {
        return Ok((target.0, target.1, target.2, true));
    };
    let elapsed = now.saturating_sub(shift.start_timestamp);
    if elapsed >= shift.duration {
        return Ok((target.0, target.1, target.2, true));
    }
    Ok((
        interpolate_percent(shift.old_upper_percent, target.0, elapsed, shift.duration)?,
        interpolate_percent(shift.old_lower_percent, target.1, elapsed, shift.duration)?,
        interpolate_percent(shift.old_threshold_time, target.2, elapsed, shift.duration)?,
        false,
    ))
}

/// `(upper, lower)` bounds around `center`.
pub fn range_bounds(
    center: u128,
    upper_percent: u32,
    lower_percent: u32,
) -> Result<(u128, u128), DexError> {
    let upper_denominator = SIX_DECIMALS - upper_percent as u128;
    let lower_denominator = SIX_DECIMALS + lower_percent as u128;
    let upper = mul_div(center, SIX_DECIMALS, upper_denominator, Rounding::Down)?;
    let lower = mul_div(center, SIX_DECIMALS, lower_denominator, Rounding::Down)?;
    if upper <= center || lower >= center {
        return Err(DexError::InvalidConfig);
    }
    Ok((upper, lower))
}

pub fn geometric_mean(upper: u128, lower: u128) -> Result<u128, DexError> {
    narrow(sqrt_product(wide(upper), wide(lower)))
}

/// Full price set for the given center and percents.
pub fn pool_prices(
    center: u128,
    upper_percent: u32,
    lower_percent: u32,
) -> Result<PoolPrices, DexError> {
    let (upper, lower) = range_bounds(center, upper_percent, lower_percent)?;
    Ok(PoolPrices {
        center,
        upper,
        lower,
        geometric_mean: geometric_mean(upper, lower)?,
    })
}

/// Pulls `center` toward the breached range bound once the last swap price
/// left the threshold band. The pull completes over `threshold_time`.
pub fn rebalance_center(
    center: u128,
    prices: (u128, u128),
    thresholds: (u32, u32),
    threshold_time: u32,
    last_price: u128,
    elapsed: u64,
) -> Result<u128, DexError> {
    let (upper, lower) = prices;
    let (upper_threshold, lower_threshold) = thresholds;
    let time = threshold_time as u64;

    if upper_threshold > 0 {
        let band = mul_div(
            upper - center,
            SIX_DECIMALS - upper_threshold as u128,
            SIX_DECIMALS,
            Rounding::Down,
        )?;
        if last_price > center + band {
            return interpolate(center, upper, elapsed, time);
        }
    }
    if lower_threshold > 0 {
        let band = mul_div(
            center - lower,
            SIX_DECIMALS - lower_threshold as u128,
            SIX_DECIMALS,
            Rounding::Down,
        )?;
        if last_price < center - band {
            return interpolate(center, lower, elapsed, time);
        }
    }
    Ok(center)
}

pub fn fetch_external_center(env: &Env, config: &DexConfig) -> Option<u128> {
    config
        .center_price_source
        .as_ref()
        .map(|source| CenterPriceClient::new(env, source).center_price())
}

pub fn compute(
    env: &Env,
    config: &DexConfig,
    variables: &DexVariables,
    now: u64,
) -> Result<Pricing, DexError> {
    let mut pending = PendingUpdates::default();
    let external_center = fetch_external_center(env, config);
    let stored = unpack_price(variables.center_price)?;

    let mut stored_mode = false;
    let mut center = if config.center_price_shift_active {
        let target = external_center.ok_or(DexError::CenterPriceSourceMissing)?;
        match get_center_price_shift(env) {
            Some(shift) => {
                let elapsed = now.saturating_sub(shift.start_timestamp);
                let value = interpolate(shift.old_price, target, elapsed, shift.duration)?;
                pending.clear_center_price_shift = value == target;
                value
            }
            None => {
                pending.clear_center_price_shift = true;
                target
            }
        }
    } else if let Some(price) = external_center {
        price
    } else {
        stored_mode = true;
        stored
    };

    let (upper_percent, lower_percent, range_done) = range_percents(env, config, now)?;
    pending.clear_range_shift = range_done;
    let (upper_threshold, lower_threshold, threshold_time, threshold_done) =
        threshold_values(env, config, now)?;
    pending.clear_threshold_shift = threshold_done;

    if stored_mode && (upper_threshold > 0 || lower_threshold > 0) {
        let (upper, lower) = range_bounds(center, upper_percent, lower_percent)?;
        center = rebalance_center(
            center,
            (upper, lower),
            (upper_threshold, lower_threshold),
            threshold_time,
            unpack_price(variables.last_price)?,
            now.saturating_sub(variables.last_swap_timestamp),
        )?;
    }

    center = center.clamp(config.min_center_price, config.max_center_price);
    if stored_mode && pack_price(center) != variables.center_price {
        pending.center_price = Some(center);
    }

    Ok(Pricing {
        prices: pool_prices(center, upper_percent, lower_percent)?,
        pending,
        external_center,
    })
}

/// Price implied by imaginary reserves, token1 per token0.
pub fn reserves_price(token0_imaginary: u128, token1_imaginary: u128) -> Result<u128, DexError> {
    if token0_imaginary == 0 {
        return Err(DexError::TokenReservesTooLow);
    }
    mul_div(token1_imaginary, PRICE_PRECISION, token0_imaginary, Rounding::Down)
}
