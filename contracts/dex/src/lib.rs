#![no_std]

mod admin;
mod arbitrage;
mod constants;
mod errors;
mod events;
mod hooks;
mod liquidity;
mod math;
mod oracle;
mod pool;
mod position;
mod pricing;
mod reentrancy;
mod reserves;
mod routing;
mod storage;
mod swap;

#[cfg(test)]
extern crate std; // soroban-sdk testutils require std; the dex is no_std so we must opt-in explicitly.

#[cfg(test)]
mod test;

use soroban_sdk::{contract, contractimpl, Address, Env, Vec};

pub use admin::{InitParams, PositionSide};
pub use errors::DexError;
pub use oracle::twap::OraclePrice;
pub use pool::PricesAndReserves;
pub use reserves::{CollateralReserves, DebtReserves};
pub use storage::{
    DexConfig, DexVariables, TotalShares, UserBorrowConfig, UserShares, UserSupplyConfig,
};

use pool::Pool;
use position::{collateral, debt};

/// Takes the lock for a state-changing call; an estimate only requires that
/// no operation is in flight and writes nothing.
fn guarded<T>(
    env: &Env,
    user: &Address,
    estimate: bool,
    f: impl FnOnce() -> Result<T, DexError>,
) -> Result<T, DexError> {
    if estimate {
        reentrancy::ensure_unlocked(env)?;
        return f();
    }
    user.require_auth();
    reentrancy::with_lock(env, f)
}

#[contract]
pub struct DexPool;

#[contractimpl]
impl DexPool {
    // -- administration -----------------------------------------------------

    pub fn initialize(
        env: Env,
        admin: Address,
        liquidity: Address,
        token0: Address,
        token1: Address,
        params: InitParams,
    ) -> Result<(), DexError> {
        admin::initialize(&env, &admin, &liquidity, &token0, &token1, &params)
    }

    pub fn update_range_percents(
        env: Env,
        upper_percent: u32,
        lower_percent: u32,
        shift_time: u64,
    ) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || {
            admin::update_range_percents(&env, upper_percent, lower_percent, shift_time)
        })
    }

    pub fn update_threshold_percents(
        env: Env,
        upper_percent: u32,
        lower_percent: u32,
        threshold_time: u32,
        shift_time: u64,
    ) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || {
            admin::update_threshold_percents(&env, upper_percent, lower_percent, threshold_time, shift_time)
        })
    }

    pub fn update_center_price_source(
        env: Env,
        source: Option<Address>,
        shift_time: u64,
    ) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || admin::update_center_price_source(&env, source, shift_time))
    }

    pub fn update_center_price_limits(env: Env, min_price: u128, max_price: u128) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || admin::update_center_price_limits(&env, min_price, max_price))
    }

    pub fn update_fee_and_revenue_cut(env: Env, fee: u32, revenue_cut: u32) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || admin::update_fee_and_revenue_cut(&env, fee, revenue_cut))
    }

    pub fn update_hook(env: Env, hook: Option<Address>) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || admin::update_hook(&env, hook))
    }

    pub fn update_utilization_caps(env: Env, token0_cap: u32, token1_cap: u32) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || admin::update_utilization_caps(&env, token0_cap, token1_cap))
    }

    pub fn update_max_price_change(env: Env, percent: u32) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || admin::update_max_price_change(&env, percent))
    }

    pub fn update_share_caps(env: Env, max_supply_shares: u128, max_borrow_shares: u128) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || {
            admin::update_share_caps(&env, max_supply_shares, max_borrow_shares)
        })
    }

    pub fn toggle_pools(env: Env, collateral_enabled: bool, debt_enabled: bool) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || admin::toggle_pools(&env, collateral_enabled, debt_enabled))
    }

    pub fn update_user_supply_config(
        env: Env,
        user: Address,
        config: UserSupplyConfig,
    ) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || admin::update_user_supply_config(&env, &user, &config))
    }

    pub fn update_user_borrow_config(
        env: Env,
        user: Address,
        config: UserBorrowConfig,
    ) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || admin::update_user_borrow_config(&env, &user, &config))
    }

    pub fn set_user_enabled(
        env: Env,
        user: Address,
        side: PositionSide,
        enabled: bool,
    ) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || admin::set_user_enabled(&env, &user, side, enabled))
    }

    pub fn pause(env: Env) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || admin::set_paused(&env, true))
    }

    pub fn unpause(env: Env) -> Result<(), DexError> {
        reentrancy::with_lock(&env, || admin::set_paused(&env, false))
    }

    pub fn collect_revenue(env: Env, token: Address, to: Address) -> Result<i128, DexError> {
        reentrancy::with_lock(&env, || admin::collect_revenue(&env, &token, &to))
    }

    // -- swaps --------------------------------------------------------------

    /// Swaps exactly `amount_in` of the input token; returns the output sent
    /// to `to`.
    pub fn swap_in(
        env: Env,
        user: Address,
        swap0to1: bool,
        amount_in: i128,
        amount_out_min: i128,
        to: Address,
    ) -> Result<i128, DexError> {
        guarded(&env, &user, false, || {
            swap::swap_in(&env, &user, swap0to1, amount_in, amount_out_min, &to)
        })
    }

    /// Swaps for exactly `amount_out` of the output token; returns the input
    /// charged.
    pub fn swap_out(
        env: Env,
        user: Address,
        swap0to1: bool,
        amount_out: i128,
        amount_in_max: i128,
        to: Address,
    ) -> Result<i128, DexError> {
        guarded(&env, &user, false, || {
            swap::swap_out(&env, &user, swap0to1, amount_out, amount_in_max, &to)
        })
    }

    pub fn estimate_swap_in(env: Env, swap0to1: bool, amount_in: i128) -> Result<i128, DexError> {
        swap::estimate_swap_in(&env, swap0to1, amount_in)
    }

    pub fn estimate_swap_out(env: Env, swap0to1: bool, amount_out: i128) -> Result<i128, DexError> {
        swap::estimate_swap_out(&env, swap0to1, amount_out)
    }

    // -- collateral positions -------------------------------------------------

    pub fn deposit_perfect(
        env: Env,
        user: Address,
        shares: u128,
        max_amount0: i128,
        max_amount1: i128,
        estimate: bool,
    ) -> Result<(i128, i128), DexError> {
        guarded(&env, &user, estimate, || {
            collateral::deposit_perfect(&env, &user, shares, max_amount0, max_amount1, estimate)
        })
    }

    pub fn withdraw_perfect(
        env: Env,
        user: Address,
        shares: u128,
        min_amount0: i128,
        min_amount1: i128,
        to: Address,
        estimate: bool,
    ) -> Result<(i128, i128), DexError> {
        guarded(&env, &user, estimate, || {
            collateral::withdraw_perfect(&env, &user, shares, min_amount0, min_amount1, &to, estimate)
        })
    }

    pub fn deposit(
        env: Env,
        user: Address,
        amount0: i128,
        amount1: i128,
        min_shares: u128,
        estimate: bool,
    ) -> Result<u128, DexError> {
        guarded(&env, &user, estimate, || {
            collateral::deposit(&env, &user, amount0, amount1, min_shares, estimate)
        })
    }

    pub fn withdraw(
        env: Env,
        user: Address,
        amount0: i128,
        amount1: i128,
        max_shares: u128,
        to: Address,
        estimate: bool,
    ) -> Result<u128, DexError> {
        guarded(&env, &user, estimate, || {
            collateral::withdraw(&env, &user, amount0, amount1, max_shares, &to, estimate)
        })
    }

    pub fn withdraw_perfect_in_one_token(
        env: Env,
        user: Address,
        shares: u128,
        min_amount0: i128,
        min_amount1: i128,
        to: Address,
        estimate: bool,
    ) -> Result<(i128, i128), DexError> {
        guarded(&env, &user, estimate, || {
            collateral::withdraw_perfect_in_one_token(
                &env,
                &user,
                shares,
                min_amount0,
                min_amount1,
                &to,
                estimate,
            )
        })
    }

    // -- debt positions -------------------------------------------------------

    pub fn borrow_perfect(
        env: Env,
        user: Address,
        shares: u128,
        min_amount0: i128,
        min_amount1: i128,
        to: Address,
        estimate: bool,
    ) -> Result<(i128, i128), DexError> {
        guarded(&env, &user, estimate, || {
            debt::borrow_perfect(&env, &user, shares, min_amount0, min_amount1, &to, estimate)
        })
    }

    pub fn payback_perfect(
        env: Env,
        user: Address,
        shares: u128,
        max_amount0: i128,
        max_amount1: i128,
        estimate: bool,
    ) -> Result<(i128, i128), DexError> {
        guarded(&env, &user, estimate, || {
            debt::payback_perfect(&env, &user, shares, max_amount0, max_amount1, estimate)
        })
    }

    pub fn borrow(
        env: Env,
        user: Address,
        amount0: i128,
        amount1: i128,
        max_shares: u128,
        to: Address,
        estimate: bool,
    ) -> Result<u128, DexError> {
        guarded(&env, &user, estimate, || {
            debt::borrow(&env, &user, amount0, amount1, max_shares, &to, estimate)
        })
    }

    pub fn payback(
        env: Env,
        user: Address,
        amount0: i128,
        amount1: i128,
        min_shares: u128,
        estimate: bool,
    ) -> Result<u128, DexError> {
        guarded(&env, &user, estimate, || {
            debt::payback(&env, &user, amount0, amount1, min_shares, estimate)
        })
    }

    pub fn payback_perfect_in_one_token(
        env: Env,
        user: Address,
        shares: u128,
        max_amount0: i128,
        max_amount1: i128,
        estimate: bool,
    ) -> Result<(i128, i128), DexError> {
        guarded(&env, &user, estimate, || {
            debt::payback_perfect_in_one_token(&env, &user, shares, max_amount0, max_amount1, estimate)
        })
    }

    // -- views ----------------------------------------------------------------

    /// TWAP plus lowest/highest price for each window ending
    /// `lookbacks[i]` seconds ago, and the last swap price.
    pub fn oracle_price(env: Env, lookbacks: Vec<u64>) -> Result<(Vec<OraclePrice>, u128), DexError> {
        let variables = storage::get_variables(&env)?;
        oracle::twap::oracle_prices(&env, &variables, &lookbacks, env.ledger().timestamp())
    }

    pub fn get_prices_and_reserves(env: Env) -> Result<PricesAndReserves, DexError> {
        Ok(Pool::load(&env)?.snapshot())
    }

    pub fn collateral_reserves(env: Env) -> Result<CollateralReserves, DexError> {
        Ok(Pool::load(&env)?.collateral)
    }

    pub fn debt_reserves(env: Env) -> Result<DebtReserves, DexError> {
        Ok(Pool::load(&env)?.debt)
    }

    pub fn user_collateral(env: Env, user: Address) -> UserShares {
        storage::get_user_collateral(&env, &user)
    }

    pub fn user_debt(env: Env, user: Address) -> UserShares {
        storage::get_user_debt(&env, &user)
    }

    pub fn total_shares(env: Env) -> TotalShares {
        storage::get_total_shares(&env)
    }

    pub fn config(env: Env) -> Result<DexConfig, DexError> {
        storage::get_config(&env)
    }

    pub fn variables(env: Env) -> Result<DexVariables, DexError> {
        storage::get_variables(&env)
    }

    pub fn revenue(env: Env, token: Address) -> i128 {
        storage::get_revenue(&env, &token)
    }
}
