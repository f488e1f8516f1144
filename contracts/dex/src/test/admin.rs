//! Initialization and administrative updates.

use soroban_sdk::{testutils::Address as _, Address, Env};

use super::{create_tokens, default_params, stored, Setup, START, TEN};
use crate::{
    constants::PRICE_PRECISION, errors::DexError, DexPool, DexPoolClient, PositionSide,
    UserSupplyConfig,
};
use twinpool_mock_liquidity::MockLiquidity;

// ---------------------------------------------------------------------------
// Center price source returning whatever price was last set.
// ---------------------------------------------------------------------------
mod center_source_mod {
    use soroban_sdk::{contract, contractimpl, symbol_short, Env};

    #[contract]
    pub struct FixedCenterPrice;

    #[contractimpl]
    impl FixedCenterPrice {
        pub fn set_price(env: Env, price: u128) {
            env.storage().instance().set(&symbol_short!("price"), &price);
        }

        pub fn center_price(env: Env) -> u128 {
            env.storage()
                .instance()
                .get(&symbol_short!("price"))
                .unwrap_or(0)
        }
    }
}
use center_source_mod::{FixedCenterPrice, FixedCenterPriceClient};

// ---------------------------------------------------------------------------
// initialize
// ---------------------------------------------------------------------------

#[test]
fn initialize_seeds_both_pools() {
    let s = Setup::new();
    let totals = s.dex.total_shares();
    // Shares start at twice the decimal-adjusted token0 seed.
    assert_eq!(totals.collateral, 2 * 1_000 * 1_000_000_000_000);
    assert_eq!(totals.debt, 2 * 500 * 1_000_000_000_000);

    let admin_collateral = s.dex.user_collateral(&s.admin);
    assert_eq!(admin_collateral.shares, totals.collateral);
    assert!(admin_collateral.enabled);
    assert_eq!(s.dex.user_debt(&s.admin).shares, totals.debt);

    let snapshot = s.dex.get_prices_and_reserves();
    assert_eq!(snapshot.prices.center, stored(PRICE_PRECISION));
    // The opening arbitrage shifts a fraction of a percent between pools.
    let seeded_collateral = 1_000 * 1_000_000_000_000u128;
    let seeded_debt = 500 * 1_000_000_000_000u128;
    assert!(snapshot.collateral.token0_real_reserves.abs_diff(seeded_collateral) * 100 < seeded_collateral);
    assert!(snapshot.debt.token0_debt.abs_diff(seeded_debt) * 100 < seeded_debt);

    let variables = s.dex.variables();
    assert!(!variables.locked);
    assert_eq!(variables.last_swap_timestamp, START);
}

#[test]
fn initialize_equalizes_pool_prices() {
    let s = Setup::new();
    let gap = s.price_gap();
    assert!(gap < 1e-5, "pools open {gap} apart");
}

#[test]
fn initialize_twice_fails() {
    let s = Setup::new();
    let result = s.dex.try_initialize(
        &s.admin,
        &s.liquidity.address,
        &s.token0.address,
        &s.token1.address,
        &default_params(),
    );
    assert_eq!(result, Err(Ok(DexError::AlreadyInitialized)));
}

#[test]
fn initialize_rejects_unordered_tokens() {
    let env = Env::default();
    env.mock_all_auths();
    let admin = Address::generate(&env);
    let (token0, token1) = create_tokens(&env, &admin);
    let liquidity = env.register_contract(None, MockLiquidity);
    let dex = DexPoolClient::new(&env, &env.register_contract(None, DexPool));

    let result = dex.try_initialize(&admin, &liquidity, &token1, &token0, &default_params());
    assert_eq!(result, Err(Ok(DexError::InvalidTokenOrder)));
}

#[test]
fn initialize_rejects_bad_config() {
    let env = Env::default();
    env.mock_all_auths();
    let admin = Address::generate(&env);
    let (token0, token1) = create_tokens(&env, &admin);
    let liquidity = env.register_contract(None, MockLiquidity);
    let dex = DexPoolClient::new(&env, &env.register_contract(None, DexPool));

    let mut params = default_params();
    params.fee = 500_000;
    let result = dex.try_initialize(&admin, &liquidity, &token0, &token1, &params);
    assert_eq!(result, Err(Ok(DexError::InvalidConfig)));

    let mut params = default_params();
    params.smart_collateral_enabled = false;
    params.smart_debt_enabled = false;
    let result = dex.try_initialize(&admin, &liquidity, &token0, &token1, &params);
    assert_eq!(result, Err(Ok(DexError::InvalidConfig)));

    let mut params = default_params();
    params.center_price = PRICE_PRECISION * 10_000;
    let result = dex.try_initialize(&admin, &liquidity, &token0, &token1, &params);
    assert_eq!(result, Err(Ok(DexError::InvalidConfig)));
}

#[test]
fn collateral_only_pool_at_2000() {
    let s = Setup::with_params(|p| {
        p.smart_debt_enabled = false;
        p.center_price = 2_000 * PRICE_PRECISION;
        p.max_center_price = 1_000_000 * PRICE_PRECISION;
        p.upper_range_percent = 20_000;
        p.lower_range_percent = 20_000;
        p.token0_collateral_amount = TEN;
    });
    let snapshot = s.dex.get_prices_and_reserves();
    assert_eq!(snapshot.prices.upper / PRICE_PRECISION, 2_040);
    assert_eq!(snapshot.prices.lower / PRICE_PRECISION, 1_960);
    assert_eq!(snapshot.prices.geometric_mean / PRICE_PRECISION, 2_000);
    // 10 token0 seeded against 20_000 token1.
    assert_eq!(snapshot.collateral.token1_real_reserves, 20_000 * 1_000_000_000_000);
    assert_eq!(snapshot.debt.token0_debt, 0);
    assert_eq!(s.dex.total_shares().debt, 0);
}

// ---------------------------------------------------------------------------
// configuration updates
// ---------------------------------------------------------------------------

#[test]
fn fee_update_is_validated() {
    let s = Setup::new();
    s.dex.update_fee_and_revenue_cut(&3_000, &100_000);
    let config = s.dex.config();
    assert_eq!(config.fee, 3_000);
    assert_eq!(config.revenue_cut, 100_000);

    let result = s.dex.try_update_fee_and_revenue_cut(&3_000, &2_000_000);
    assert_eq!(result, Err(Ok(DexError::InvalidConfig)));
    assert_eq!(s.dex.config().revenue_cut, 100_000);
}

#[test]
fn range_shift_moves_bounds_gradually() {
    let s = Setup::new();
    let before = s.dex.get_prices_and_reserves().prices;
    s.dex.update_range_percents(&200_000, &200_000, &1_000);
    assert!(s.dex.config().range_shift_active);

    s.advance(500);
    let halfway = s.dex.get_prices_and_reserves().prices;
    let (target_upper, _) =
        crate::pricing::range_bounds(stored(PRICE_PRECISION), 200_000, 200_000).unwrap();
    assert!(halfway.upper > before.upper && halfway.upper < target_upper);
    assert!(halfway.lower < before.lower);

    s.advance(600);
    let done = s.dex.get_prices_and_reserves().prices;
    assert_eq!(done.upper, target_upper);

    // The next state-changing call clears the finished shift.
    let user = s.user();
    s.dex.swap_in(&user, &true, &TEN, &0, &user);
    assert!(!s.dex.config().range_shift_active);
}

#[test]
fn immediate_range_update_has_no_shift() {
    let s = Setup::new();
    s.dex.update_range_percents(&50_000, &50_000, &0);
    let config = s.dex.config();
    assert!(!config.range_shift_active);
    assert_eq!(config.upper_range_percent, 50_000);

    let result = s.dex.try_update_range_percents(&0, &50_000, &0);
    assert_eq!(result, Err(Ok(DexError::InvalidConfig)));
}

#[test]
fn threshold_update_requires_time() {
    let s = Setup::new();
    let result = s.dex.try_update_threshold_percents(&100_000, &100_000, &0, &0);
    assert_eq!(result, Err(Ok(DexError::InvalidConfig)));

    s.dex.update_threshold_percents(&100_000, &100_000, &3_600, &0);
    let config = s.dex.config();
    assert_eq!(config.upper_threshold_percent, 100_000);
    assert_eq!(config.threshold_shift_time, 3_600);
}

#[test]
fn live_center_price_source_drives_the_range() {
    let s = Setup::new();
    let source = s.env.register_contract(None, FixedCenterPrice);
    FixedCenterPriceClient::new(&s.env, &source).set_price(&(PRICE_PRECISION * 102 / 100));

    s.dex.update_center_price_source(&Some(source.clone()), &0);
    let prices = s.dex.get_prices_and_reserves().prices;
    assert_eq!(prices.center, PRICE_PRECISION * 102 / 100);

    // Dropping the source keeps the last live center as the stored one.
    s.dex.update_center_price_source(&None, &0);
    let prices = s.dex.get_prices_and_reserves().prices;
    assert_eq!(prices.center, stored(PRICE_PRECISION * 102 / 100));
    assert!(s.dex.config().center_price_source.is_none());
}

#[test]
fn center_price_shift_glides_to_source() {
    let s = Setup::new();
    let source = s.env.register_contract(None, FixedCenterPrice);
    FixedCenterPriceClient::new(&s.env, &source).set_price(&(PRICE_PRECISION * 11 / 10));

    s.dex.update_center_price_source(&Some(source), &100);
    assert!(s.dex.config().center_price_shift_active);

    s.advance(50);
    let center = s.dex.get_prices_and_reserves().prices.center;
    assert!(center > PRICE_PRECISION && center < PRICE_PRECISION * 11 / 10);

    s.advance(50);
    assert_eq!(
        s.dex.get_prices_and_reserves().prices.center,
        PRICE_PRECISION * 11 / 10
    );
}

#[test]
fn center_price_is_clamped_to_limits() {
    let s = Setup::new();
    // The stored center sits just below 1.0 after packing.
    s.dex.update_center_price_limits(&(PRICE_PRECISION + 1), &(2 * PRICE_PRECISION));
    let center = s.dex.get_prices_and_reserves().prices.center;
    assert_eq!(center, PRICE_PRECISION + 1);

    let result = s.dex.try_update_center_price_limits(&PRICE_PRECISION, &(PRICE_PRECISION / 2));
    assert_eq!(result, Err(Ok(DexError::InvalidConfig)));
}

#[test]
fn toggling_an_unseeded_pool_fails() {
    let s = Setup::with_params(|p| p.smart_debt_enabled = false);
    let result = s.dex.try_toggle_pools(&true, &true);
    assert_eq!(result, Err(Ok(DexError::InvalidConfig)));

    let s = Setup::new();
    s.dex.toggle_pools(&true, &false);
    assert!(!s.dex.config().smart_debt_enabled);
    let user = s.user();
    let result = s.dex.try_borrow_perfect(&user, &1_000_000_000_000, &0, &0, &user, &false);
    assert_eq!(result, Err(Ok(DexError::DebtPoolDisabled)));
}

#[test]
fn re_enabling_both_pools_equalizes_them() {
    let s = Setup::new();
    s.dex.toggle_pools(&true, &false);
    let user = s.user();
    s.dex.swap_in(&user, &true, &(TEN * 5), &0, &user);
    let apart = s.price_gap();
    assert!(apart > 1e-4, "collateral-only swap left a gap of {apart}");

    s.dex.toggle_pools(&true, &true);
    let gap = s.price_gap();
    assert!(gap * 10.0 < apart, "gap {gap} after re-enabling, {apart} before");
}

#[test]
fn disabled_user_cannot_deposit() {
    let s = Setup::new();
    let user = s.user();
    s.dex.set_user_enabled(&user, &PositionSide::Collateral, &false);
    let result = s.dex.try_deposit_perfect(&user, &1_000_000_000_000, &TEN, &TEN, &false);
    assert_eq!(result, Err(Ok(DexError::UserNotEnabled)));

    let stranger = Address::generate(&s.env);
    let result = s.dex.try_deposit_perfect(&stranger, &1_000_000_000_000, &TEN, &TEN, &false);
    assert_eq!(result, Err(Ok(DexError::UserNotEnabled)));
}

#[test]
fn user_config_is_validated() {
    let s = Setup::new();
    let user = Address::generate(&s.env);
    let result = s.dex.try_update_user_supply_config(
        &user,
        &UserSupplyConfig {
            expand_percent: 2_000_000,
            expand_duration: 10,
            base_withdrawal_limit: 0,
        },
    );
    assert_eq!(result, Err(Ok(DexError::InvalidConfig)));
}

#[test]
fn pause_blocks_trading_until_unpaused() {
    let s = Setup::new();
    let user = s.user();
    s.dex.pause();
    assert!(s.dex.config().paused);
    assert_eq!(
        s.dex.try_swap_in(&user, &true, &TEN, &0, &user),
        Err(Ok(DexError::Paused))
    );
    assert_eq!(s.dex.try_estimate_swap_in(&true, &TEN), Err(Ok(DexError::Paused)));

    s.dex.unpause();
    assert!(s.dex.swap_in(&user, &true, &TEN, &0, &user) > 0);
}

#[test]
fn updates_leave_the_lock_released() {
    let s = Setup::new();
    s.dex.update_max_price_change(&100_000);
    s.dex.update_utilization_caps(&900_000, &900_000);
    s.dex.update_share_caps(&(u128::MAX / 8), &(u128::MAX / 8));
    s.dex.update_hook(&None);
    assert!(!s.dex.variables().locked);
    assert_eq!(s.dex.config().max_price_change_percent, 100_000);
}
