use soroban_sdk::{contracttype, Address, Env, Vec};

use crate::{
    constants::{
        INSTANCE_BUMP_AMOUNT, INSTANCE_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT,
        PERSISTENT_LIFETIME_THRESHOLD,
    },
    errors::DexError,
};

/// Immutable pool identity, written once by `initialize`.
#[contracttype]
#[derive(Clone, Debug)]
pub struct DexConstants {
    pub admin: Address,
    pub liquidity: Address,
    pub token0: Address,
    pub token1: Address,
    pub token0_decimals: u32,
    pub token1_decimals: u32,
}

/// Primary record: lock, price history and oracle cursor. Prices are packed
/// compact floats (see `math::compact`).
#[contracttype]
#[derive(Clone, Debug)]
pub struct DexVariables {
    pub locked: bool,
    pub last_price: u64,
    pub last_to_last_price: u64,
    pub center_price: u64,
    pub last_swap_timestamp: u64,
    pub last_interaction_duration: u64,
    pub oracle_page: u32,
    pub oracle_slot: u32,
}

/// Secondary record: everything the administrative interface configures.
/// Percentages use 1e6 = 100%, prices 1e27.
#[contracttype]
#[derive(Clone, Debug)]
pub struct DexConfig {
    pub smart_collateral_enabled: bool,
    pub smart_debt_enabled: bool,
    pub fee: u32,
    pub revenue_cut: u32,
    pub upper_range_percent: u32,
    pub lower_range_percent: u32,
    pub range_shift_active: bool,
    pub upper_threshold_percent: u32,
    pub lower_threshold_percent: u32,
    pub threshold_shift_time: u32,
    pub threshold_shift_active: bool,
    pub center_price_shift_active: bool,
    pub center_price_source: Option<Address>,
    pub hook: Option<Address>,
    pub min_center_price: u128,
    pub max_center_price: u128,
    pub max_price_change_percent: u32,
    pub token0_utilization_cap: u32,
    pub token1_utilization_cap: u32,
    pub max_supply_shares: u128,
    pub max_borrow_shares: u128,
    pub paused: bool,
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TotalShares {
    pub collateral: u128,
    pub debt: u128,
}

/// Range percentages in force when the shift started.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RangeShift {
    pub old_upper_percent: u32,
    pub old_lower_percent: u32,
    pub start_timestamp: u64,
    pub duration: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ThresholdShift {
    pub old_upper_percent: u32,
    pub old_lower_percent: u32,
    pub old_threshold_time: u32,
    pub start_timestamp: u64,
    pub duration: u64,
}

/// Center price when the shift started; the target is fetched live.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CenterPriceShift {
    pub old_price: u128,
    pub start_timestamp: u64,
    pub duration: u64,
}

/// One oracle log entry: how long a price was held and its signed change
/// from the price held before it (fraction scaled by 1e12).
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OracleEntry {
    pub time_diff: u32,
    pub change: i64,
}

/// Per-user share record for one pool side. `limit` is the withdrawal
/// (collateral) or borrow (debt) limit snapshot taken at `last_update`.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UserShares {
    pub shares: u128,
    pub limit: u128,
    pub last_update: u64,
    pub enabled: bool,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserSupplyConfig {
    pub expand_percent: u32,
    pub expand_duration: u64,
    pub base_withdrawal_limit: u128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserBorrowConfig {
    pub expand_percent: u32,
    pub expand_duration: u64,
    pub base_debt_ceiling: u128,
    pub max_debt_ceiling: u128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub enum DataKey {
    Constants,
    Variables,
    Config,
    TotalShares,
    RangeShift,
    ThresholdShift,
    CenterPriceShift,
    OraclePage(u32),
    UserCollateral(Address),
    UserDebt(Address),
    UserSupplyConfig(Address),
    UserBorrowConfig(Address),
    Revenue(Address),
}

/// Extend instance storage TTL to keep the pool alive.
pub fn extend_instance_ttl(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

fn extend_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
}

pub fn has_constants(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Constants)
}

pub fn get_constants(env: &Env) -> Result<DexConstants, DexError> {
    env.storage()
        .instance()
        .get(&DataKey::Constants)
        .ok_or(DexError::NotInitialized)
}

pub fn set_constants(env: &Env, constants: &DexConstants) {
    env.storage().instance().set(&DataKey::Constants, constants);
}

pub fn get_variables(env: &Env) -> Result<DexVariables, DexError> {
    env.storage()
        .instance()
        .get(&DataKey::Variables)
        .ok_or(DexError::NotInitialized)
}

pub fn set_variables(env: &Env, variables: &DexVariables) {
    env.storage().instance().set(&DataKey::Variables, variables);
}

pub fn get_config(env: &Env) -> Result<DexConfig, DexError> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(DexError::NotInitialized)
}

pub fn set_config(env: &Env, config: &DexConfig) {
    env.storage().instance().set(&DataKey::Config, config);
}

pub fn get_total_shares(env: &Env) -> TotalShares {
    env.storage()
        .instance()
        .get(&DataKey::TotalShares)
        .unwrap_or_default()
}

pub fn set_total_shares(env: &Env, totals: &TotalShares) {
    env.storage().instance().set(&DataKey::TotalShares, totals);
}

pub fn get_range_shift(env: &Env) -> Option<RangeShift> {
    env.storage().instance().get(&DataKey::RangeShift)
}

pub fn set_range_shift(env: &Env, shift: &RangeShift) {
    env.storage().instance().set(&DataKey::RangeShift, shift);
}

pub fn remove_range_shift(env: &Env) {
    env.storage().instance().remove(&DataKey::RangeShift);
}

pub fn get_threshold_shift(env: &Env) -> Option<ThresholdShift> {
    env.storage().instance().get(&DataKey::ThresholdShift)
}

pub fn set_threshold_shift(env: &Env, shift: &ThresholdShift) {
    env.storage().instance().set(&DataKey::ThresholdShift, shift);
}

pub fn remove_threshold_shift(env: &Env) {
    env.storage().instance().remove(&DataKey::ThresholdShift);
}

pub fn get_center_price_shift(env: &Env) -> Option<CenterPriceShift> {
    env.storage().instance().get(&DataKey::CenterPriceShift)
}

pub fn set_center_price_shift(env: &Env, shift: &CenterPriceShift) {
    env.storage().instance().set(&DataKey::CenterPriceShift, shift);
}

pub fn remove_center_price_shift(env: &Env) {
    env.storage().instance().remove(&DataKey::CenterPriceShift);
}

pub fn get_oracle_page(env: &Env, page: u32) -> Option<Vec<OracleEntry>> {
    env.storage().persistent().get(&DataKey::OraclePage(page))
}

pub fn set_oracle_page(env: &Env, page: u32, entries: &Vec<OracleEntry>) {
    let key = DataKey::OraclePage(page);
    env.storage().persistent().set(&key, entries);
    extend_persistent(env, &key);
}

pub fn get_user_collateral(env: &Env, user: &Address) -> UserShares {
    env.storage()
        .persistent()
        .get(&DataKey::UserCollateral(user.clone()))
        .unwrap_or_default()
}

pub fn set_user_collateral(env: &Env, user: &Address, record: &UserShares) {
    let key = DataKey::UserCollateral(user.clone());
    env.storage().persistent().set(&key, record);
    extend_persistent(env, &key);
}

pub fn get_user_debt(env: &Env, user: &Address) -> UserShares {
    env.storage()
        .persistent()
        .get(&DataKey::UserDebt(user.clone()))
        .unwrap_or_default()
}

pub fn set_user_debt(env: &Env, user: &Address, record: &UserShares) {
    let key = DataKey::UserDebt(user.clone());
    env.storage().persistent().set(&key, record);
    extend_persistent(env, &key);
}

pub fn get_user_supply_config(env: &Env, user: &Address) -> Option<UserSupplyConfig> {
    env.storage()
        .persistent()
        .get(&DataKey::UserSupplyConfig(user.clone()))
}

pub fn set_user_supply_config(env: &Env, user: &Address, config: &UserSupplyConfig) {
    let key = DataKey::UserSupplyConfig(user.clone());
    env.storage().persistent().set(&key, config);
    extend_persistent(env, &key);
}

pub fn get_user_borrow_config(env: &Env, user: &Address) -> Option<UserBorrowConfig> {
    env.storage()
        .persistent()
        .get(&DataKey::UserBorrowConfig(user.clone()))
}

pub fn set_user_borrow_config(env: &Env, user: &Address, config: &UserBorrowConfig) {
    let key = DataKey::UserBorrowConfig(user.clone());
    env.storage().persistent().set(&key, config);
    extend_persistent(env, &key);
}

pub fn get_revenue(env: &Env, token: &Address) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::Revenue(token.clone()))
        .unwrap_or(0)
}

pub fn set_revenue(env: &Env, token: &Address, amount: i128) {
    let key = DataKey::Revenue(token.clone());
    env.storage().persistent().set(&key, &amount);
    extend_persistent(env, &key);
}
