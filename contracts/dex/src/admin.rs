//! Administrative interface: initialization, configuration updates, user
//! enabling and revenue collection. Every call is authorized by the stored
//! admin address.

use soroban_sdk::{contracttype, token::TokenClient, Address, Env};

use crate::{
    constants::{
        MAX_FEE, MAX_PRICE, MAX_PRICE_CHANGE_PERCENT, MAX_RANGE_PERCENT, MIN_PRICE,
        PRICE_PRECISION, SIX_DECIMALS,
    },
    arbitrage,
    errors::DexError,
    events::DexEvents,
    liquidity,
    math::{compact::pack_price, from_adjusted, mul_div, signed, to_adjusted, unsigned, Rounding},
    pool::Pool,
    pricing,
    storage::{
        get_config, get_constants, get_total_shares, get_user_collateral, get_user_debt,
        get_variables, has_constants, get_revenue, remove_center_price_shift, remove_range_shift,
        remove_threshold_shift, set_center_price_shift, set_config, set_constants,
        set_range_shift, set_revenue, set_threshold_shift, set_total_shares, set_user_borrow_config,
        set_user_collateral, set_user_debt, set_user_supply_config, set_variables,
        extend_instance_ttl, CenterPriceShift, DexConfig, DexConstants, DexVariables, RangeShift,
        ThresholdShift, TotalShares, UserBorrowConfig, UserShares, UserSupplyConfig,
    },
};

/// Parameters of a new pool. Seed amounts are token0 amounts in token
/// units; token1 follows from the center price.
#[contracttype]
#[derive(Clone, Debug)]
pub struct InitParams {
    pub smart_collateral_enabled: bool,
    pub smart_debt_enabled: bool,
    pub token0_collateral_amount: i128,
    pub token0_debt_amount: i128,
    pub fee: u32,
    pub revenue_cut: u32,
    pub upper_range_percent: u32,
    pub lower_range_percent: u32,
    pub upper_threshold_percent: u32,
    pub lower_threshold_percent: u32,
    pub threshold_shift_time: u32,
    pub center_price: u128,
    pub center_price_source: Option<Address>,
    pub hook: Option<Address>,
    pub min_center_price: u128,
    pub max_center_price: u128,
    pub max_price_change_percent: u32,
    pub token0_utilization_cap: u32,
    pub token1_utilization_cap: u32,
    pub max_supply_shares: u128,
    pub max_borrow_shares: u128,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PositionSide {
    Collateral,
    Debt,
}

fn validate(config: &DexConfig) -> Result<(), DexError> {
    let percent = SIX_DECIMALS as u32;
    let range_ok = |p: u32| p > 0 && p <= MAX_RANGE_PERCENT;
    let valid = config.fee <= MAX_FEE
        && config.revenue_cut <= percent
        && range_ok(config.upper_range_percent)
        && range_ok(config.lower_range_percent)
        && config.upper_threshold_percent < percent
        && config.lower_threshold_percent < percent
        && (config.threshold_shift_time > 0
            || (config.upper_threshold_percent == 0 && config.lower_threshold_percent == 0))
        && MIN_PRICE <= config.min_center_price
        && config.min_center_price <= config.max_center_price
        && config.max_center_price <= MAX_PRICE
        && config.max_price_change_percent > 0
        && config.max_price_change_percent <= MAX_PRICE_CHANGE_PERCENT
        && config.token0_utilization_cap <= percent
        && config.token1_utilization_cap <= percent;
    if !valid {
        return Err(DexError::InvalidConfig);
    }
    Ok(())
}

/// Loads the config after checking the caller is the admin.
fn authorized(env: &Env) -> Result<(DexConstants, DexConfig), DexError> {
    let constants = get_constants(env)?;
    constants.admin.require_auth();
    Ok((constants, get_config(env)?))
}

fn store(env: &Env, config: &DexConfig, name: &str) -> Result<(), DexError> {
    validate(config)?;
    set_config(env, config);
    extend_instance_ttl(env);
    DexEvents::config_updated(env, name);
    Ok(())
}

/// Center price in force right now, before any pending update is stored.
fn live_center(env: &Env, config: &DexConfig) -> Result<u128, DexError> {
    let variables = get_variables(env)?;
    let pricing = pricing::compute(env, config, &variables, env.ledger().timestamp())?;
    Ok(pricing.prices.center)
}

/// Seeds the collateral pool: the admin supplies `token0_amount` and the
/// matching token1 at `center`. Returns the shares minted.
fn seed_collateral(
    env: &Env,
    constants: &DexConstants,
    token0_amount: u128,
    center: u128,
) -> Result<u128, DexError> {
    let token0_adjusted = to_adjusted(token0_amount, constants.token0_decimals, Rounding::Down)?;
    let token1_adjusted = mul_div(token0_adjusted, center, PRICE_PRECISION, Rounding::Up)?;
    let token1_amount = from_adjusted(token1_adjusted, constants.token1_decimals, Rounding::Up)?;
    let dex = env.current_contract_address();

    liquidity::transfer_in(env, constants, &constants.token0, &constants.admin, token0_amount)?;
    liquidity::transfer_in(env, constants, &constants.token1, &constants.admin, token1_amount)?;
    liquidity::operate(env, constants, &constants.token0, signed(token0_amount)?, 0, &dex);
    liquidity::operate(env, constants, &constants.token1, signed(token1_amount)?, 0, &dex);

    let shares = token0_adjusted * 2;
    DexEvents::deposit(env, &constants.admin, shares, signed(token0_amount)?, signed(token1_amount)?);
    Ok(shares)
}

/// Seeds the debt pool: the admin borrows `token0_amount` and the matching
/// token1 at `center`. Returns the shares minted.
fn seed_debt(
    env: &Env,
    constants: &DexConstants,
    token0_amount: u128,
    center: u128,
) -> Result<u128, DexError> {
    let token0_adjusted = to_adjusted(token0_amount, constants.token0_decimals, Rounding::Up)?;
    let token1_adjusted = mul_div(token0_adjusted, center, PRICE_PRECISION, Rounding::Down)?;
    let token1_amount = from_adjusted(token1_adjusted, constants.token1_decimals, Rounding::Down)?;

    liquidity::operate(env, constants, &constants.token0, 0, signed(token0_amount)?, &constants.admin);
    liquidity::operate(env, constants, &constants.token1, 0, signed(token1_amount)?, &constants.admin);

    let shares = token0_adjusted * 2;
    DexEvents::borrow(
        env,
        &constants.admin,
        shares,
        signed(token0_amount)?,
        signed(token1_amount)?,
        &constants.admin,
    );
    Ok(shares)
}

fn unrestricted(shares: u128, now: u64) -> UserShares {
    UserShares { shares, limit: 0, last_update: now, enabled: true }
}

pub fn initialize(
    env: &Env,
    admin: &Address,
    liquidity: &Address,
    token0: &Address,
    token1: &Address,
    params: &InitParams,
) -> Result<(), DexError> {
    if has_constants(env) {
        return Err(DexError::AlreadyInitialized);
    }
    admin.require_auth();
    if token0 >= token1 {
        return Err(DexError::InvalidTokenOrder);
    }
    if !params.smart_collateral_enabled && !params.smart_debt_enabled {
        return Err(DexError::InvalidConfig);
    }

    let config = DexConfig {
        smart_collateral_enabled: params.smart_collateral_enabled,
        smart_debt_enabled: params.smart_debt_enabled,
        fee: params.fee,
        revenue_cut: params.revenue_cut,
        upper_range_percent: params.upper_range_percent,
        lower_range_percent: params.lower_range_percent,
        range_shift_active: false,
        upper_threshold_percent: params.upper_threshold_percent,
        lower_threshold_percent: params.lower_threshold_percent,
        threshold_shift_time: params.threshold_shift_time,
        threshold_shift_active: false,
        center_price_shift_active: false,
        center_price_source: params.center_price_source.clone(),
        hook: params.hook.clone(),
        min_center_price: params.min_center_price,
        max_center_price: params.max_center_price,
        max_price_change_percent: params.max_price_change_percent,
        token0_utilization_cap: params.token0_utilization_cap,
        token1_utilization_cap: params.token1_utilization_cap,
        max_supply_shares: params.max_supply_shares,
        max_borrow_shares: params.max_borrow_shares,
        paused: false,
    };
    validate(&config)?;

    let center = pricing::fetch_external_center(env, &config).unwrap_or(params.center_price);
    if center < config.min_center_price || center > config.max_center_price {
        return Err(DexError::InvalidConfig);
    }
    // Fails early when the range collapses at this center.
    pricing::pool_prices(center, config.upper_range_percent, config.lower_range_percent)?;

    let constants = DexConstants {
        admin: admin.clone(),
        liquidity: liquidity.clone(),
        token0: token0.clone(),
        token1: token1.clone(),
        token0_decimals: TokenClient::new(env, token0).decimals(),
        token1_decimals: TokenClient::new(env, token1).decimals(),
    };
    let now = env.ledger().timestamp();
    let packed = pack_price(center);
    set_constants(env, &constants);
    set_config(env, &config);
    set_variables(
        env,
        &DexVariables {
            locked: false,
            last_price: packed,
            last_to_last_price: packed,
            center_price: packed,
            last_swap_timestamp: now,
            last_interaction_duration: 0,
            oracle_page: 0,
            oracle_slot: 0,
        },
    );

    let mut totals = TotalShares::default();
    if config.smart_collateral_enabled {
        let amount = unsigned(params.token0_collateral_amount)?;
        if amount == 0 {
            return Err(DexError::ZeroAmount);
        }
        totals.collateral = seed_collateral(env, &constants, amount, center)?;
        if totals.collateral > config.max_supply_shares {
            return Err(DexError::SupplySharesCapReached);
        }
        set_user_collateral(env, admin, &unrestricted(totals.collateral, now));
        set_user_supply_config(
            env,
            admin,
            &UserSupplyConfig {
                expand_percent: SIX_DECIMALS as u32,
                expand_duration: 0,
                base_withdrawal_limit: u128::MAX,
            },
        );
    }
    if config.smart_debt_enabled {
        let amount = unsigned(params.token0_debt_amount)?;
        if amount == 0 {
            return Err(DexError::ZeroAmount);
        }
        totals.debt = seed_debt(env, &constants, amount, center)?;
        if totals.debt > config.max_borrow_shares {
            return Err(DexError::BorrowSharesCapReached);
        }
        set_user_debt(env, admin, &unrestricted(totals.debt, now));
        set_user_borrow_config(
            env,
            admin,
            &UserBorrowConfig {
                expand_percent: 0,
                expand_duration: 0,
                base_debt_ceiling: u128::MAX,
                max_debt_ceiling: u128::MAX,
            },
        );
    }
    set_total_shares(env, &totals);
    extend_instance_ttl(env);

    // Both curves price the seed differently; start them at one price.
    let mut pool = Pool::load(env)?;
    arbitrage::equalize(env, &mut pool)?;

    DexEvents::initialized(env, admin, token0, token1);
    Ok(())
}

pub fn update_range_percents(
    env: &Env,
    upper_percent: u32,
    lower_percent: u32,
    shift_time: u64,
) -> Result<(), DexError> {
    let (_, mut config) = authorized(env)?;
    let now = env.ledger().timestamp();
    if shift_time > 0 {
        let (old_upper, old_lower, _) = pricing::range_percents(env, &config, now)?;
        set_range_shift(
            env,
            &RangeShift {
                old_upper_percent: old_upper,
                old_lower_percent: old_lower,
                start_timestamp: now,
                duration: shift_time,
            },
        );
        config.range_shift_active = true;
    } else {
        remove_range_shift(env);
        config.range_shift_active = false;
    }
    config.upper_range_percent = upper_percent;
    config.lower_range_percent = lower_percent;
    store(env, &config, "range")
}

pub fn update_threshold_percents(
    env: &Env,
    upper_percent: u32,
    lower_percent: u32,
    threshold_time: u32,
    shift_time: u64,
) -> Result<(), DexError> {
    let (_, mut config) = authorized(env)?;
    let now = env.ledger().timestamp();
    if shift_time > 0 {
        let (old_upper, old_lower, old_time, _) = pricing::threshold_values(env, &config, now)?;
        set_threshold_shift(
            env,
            &ThresholdShift {
                old_upper_percent: old_upper,
                old_lower_percent: old_lower,
                old_threshold_time: old_time,
                start_timestamp: now,
                duration: shift_time,
            },
        );
        config.threshold_shift_active = true;
    } else {
        remove_threshold_shift(env);
        config.threshold_shift_active = false;
    }
    config.upper_threshold_percent = upper_percent;
    config.lower_threshold_percent = lower_percent;
    config.threshold_shift_time = threshold_time;
    store(env, &config, "threshold")
}

/// Switches between a live center price source and the stored center price.
/// Moving to a source with `shift_time > 0` glides from the current center.
/// Dropping the source keeps the current center as the stored one.
pub fn update_center_price_source(
    env: &Env,
    source: Option<Address>,
    shift_time: u64,
) -> Result<(), DexError> {
    let (_, mut config) = authorized(env)?;
    let current = live_center(env, &config)?;
    match source {
        Some(source) => {
            if shift_time > 0 {
                set_center_price_shift(
                    env,
                    &CenterPriceShift {
                        old_price: current,
                        start_timestamp: env.ledger().timestamp(),
                        duration: shift_time,
                    },
                );
                config.center_price_shift_active = true;
            } else {
                remove_center_price_shift(env);
                config.center_price_shift_active = false;
            }
            config.center_price_source = Some(source);
        }
        None => {
            remove_center_price_shift(env);
            config.center_price_shift_active = false;
            config.center_price_source = None;
            let mut variables = get_variables(env)?;
            variables.center_price = pack_price(current);
            set_variables(env, &variables);
        }
    }
    store(env, &config, "center_src")
}

pub fn update_center_price_limits(env: &Env, min_price: u128, max_price: u128) -> Result<(), DexError> {
    let (_, mut config) = authorized(env)?;
    config.min_center_price = min_price;
    config.max_center_price = max_price;
    store(env, &config, "center_lim")
}

pub fn update_fee_and_revenue_cut(env: &Env, fee: u32, revenue_cut: u32) -> Result<(), DexError> {
    let (_, mut config) = authorized(env)?;
    config.fee = fee;
    config.revenue_cut = revenue_cut;
    store(env, &config, "fee")
}

pub fn update_hook(env: &Env, hook: Option<Address>) -> Result<(), DexError> {
    let (_, mut config) = authorized(env)?;
    config.hook = hook;
    store(env, &config, "hook")
}

pub fn update_utilization_caps(env: &Env, token0_cap: u32, token1_cap: u32) -> Result<(), DexError> {
    let (_, mut config) = authorized(env)?;
    config.token0_utilization_cap = token0_cap;
    config.token1_utilization_cap = token1_cap;
    store(env, &config, "util_cap")
}

pub fn update_max_price_change(env: &Env, percent: u32) -> Result<(), DexError> {
    let (_, mut config) = authorized(env)?;
    config.max_price_change_percent = percent;
    store(env, &config, "max_change")
}

pub fn update_share_caps(env: &Env, max_supply_shares: u128, max_borrow_shares: u128) -> Result<(), DexError> {
    let (_, mut config) = authorized(env)?;
    config.max_supply_shares = max_supply_shares;
    config.max_borrow_shares = max_borrow_shares;
    store(env, &config, "share_cap")
}

/// Enables or disables either pool. A pool can only be enabled once it holds
/// shares.
pub fn toggle_pools(env: &Env, collateral_enabled: bool, debt_enabled: bool) -> Result<(), DexError> {
    let (_, mut config) = authorized(env)?;
    let totals = get_total_shares(env);
    if (collateral_enabled && totals.collateral == 0) || (debt_enabled && totals.debt == 0) {
        return Err(DexError::InvalidConfig);
    }
    config.smart_collateral_enabled = collateral_enabled;
    config.smart_debt_enabled = debt_enabled;
    store(env, &config, "pools")?;

    let mut pool = Pool::load(env)?;
    arbitrage::equalize(env, &mut pool)
}

pub fn update_user_supply_config(
    env: &Env,
    user: &Address,
    user_config: &UserSupplyConfig,
) -> Result<(), DexError> {
    authorized(env)?;
    if user_config.expand_percent as u128 > SIX_DECIMALS {
        return Err(DexError::InvalidConfig);
    }
    set_user_supply_config(env, user, user_config);
    let mut record = get_user_collateral(env, user);
    record.enabled = true;
    set_user_collateral(env, user, &record);
    DexEvents::config_updated(env, "user_supply");
    Ok(())
}

pub fn update_user_borrow_config(
    env: &Env,
    user: &Address,
    user_config: &UserBorrowConfig,
) -> Result<(), DexError> {
    authorized(env)?;
    if user_config.expand_percent as u128 > SIX_DECIMALS
        || user_config.base_debt_ceiling > user_config.max_debt_ceiling
    {
        return Err(DexError::InvalidConfig);
    }
    set_user_borrow_config(env, user, user_config);
    let mut record = get_user_debt(env, user);
    record.enabled = true;
    set_user_debt(env, user, &record);
    DexEvents::config_updated(env, "user_borrow");
    Ok(())
}

pub fn set_user_enabled(env: &Env, user: &Address, side: PositionSide, enabled: bool) -> Result<(), DexError> {
    authorized(env)?;
    match side {
        PositionSide::Collateral => {
            let mut record = get_user_collateral(env, user);
            record.enabled = enabled;
            set_user_collateral(env, user, &record);
        }
        PositionSide::Debt => {
            let mut record = get_user_debt(env, user);
            record.enabled = enabled;
            set_user_debt(env, user, &record);
        }
    }
    DexEvents::config_updated(env, "user_enable");
    Ok(())
}

pub fn set_paused(env: &Env, paused: bool) -> Result<(), DexError> {
    let (_, mut config) = authorized(env)?;
    config.paused = paused;
    store(env, &config, if paused { "pause" } else { "unpause" })
}

/// Sends the accumulated revenue of `token` to `to`.
pub fn collect_revenue(env: &Env, token: &Address, to: &Address) -> Result<i128, DexError> {
    authorized(env)?;
    let amount = get_revenue(env, token);
    if amount <= 0 {
        return Err(DexError::ZeroAmount);
    }
    set_revenue(env, token, 0);
    TokenClient::new(env, token).transfer(&env.current_contract_address(), to, &amount);
    DexEvents::revenue_collected(env, token, to, amount);
    Ok(amount)
}
