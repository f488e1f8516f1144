#![cfg(test)]

// ---------------------------------------------------------------------------
// Dex test suite
//
// Structure
// ─────────
// math        - pure fixed-point, codec and price-range tests (no Env)
// curves      - reserve, routing and implicit-swap math on plain numbers
// admin       - initialization and configuration updates
// swap        - swaps across both pools, hooks, revenue
// positions   - collateral and debt operations, limits, estimates
// oracle      - price log and TWAP queries
// events      - DexEvents helpers
// reentrancy  - lock helpers
//
// Integration tests share `Setup`: two Stellar asset tokens (7 decimals),
// the mock reserve service and a dex seeded at a 1:1 center price with both
// pools enabled.
// ---------------------------------------------------------------------------

mod admin;
mod curves;
mod reentrancy;
mod swap;

use soroban_sdk::{
    testutils::{Address as _, Ledger as _},
    token::{StellarAssetClient, TokenClient},
    Address, Env,
};
use twinpool_mock_liquidity::{MockLiquidity, MockLiquidityClient};

use crate::{
    constants::PRICE_PRECISION,
    math::compact::{pack_price, unpack_price},
    pricing::reserves_price,
    DexPool, DexPoolClient, InitParams, UserBorrowConfig, UserSupplyConfig,
};

pub const START: u64 = 1_700_000_000;
/// 1_000 tokens of token0 seed the collateral pool, 500 the debt pool.
pub const SEED_COLLATERAL: i128 = 10_000_000_000;
pub const SEED_DEBT: i128 = 5_000_000_000;
pub const ADMIN_FUNDS: i128 = 1_000_000_000_000;
pub const USER_FUNDS: i128 = 100_000_000_000;
/// 10 tokens.
pub const TEN: i128 = 100_000_000;

/// `price` as it reads back after being persisted.
pub fn stored(price: u128) -> u128 {
    unpack_price(pack_price(price)).unwrap()
}

pub fn default_params() -> InitParams {
    InitParams {
        smart_collateral_enabled: true,
        smart_debt_enabled: true,
        token0_collateral_amount: SEED_COLLATERAL,
        token0_debt_amount: SEED_DEBT,
        fee: 0,
        revenue_cut: 0,
        upper_range_percent: 100_000,
        lower_range_percent: 100_000,
        upper_threshold_percent: 0,
        lower_threshold_percent: 0,
        threshold_shift_time: 0,
        center_price: PRICE_PRECISION,
        center_price_source: None,
        hook: None,
        min_center_price: PRICE_PRECISION / 1_000,
        max_center_price: PRICE_PRECISION * 1_000,
        max_price_change_percent: 200_000,
        token0_utilization_cap: 1_000_000,
        token1_utilization_cap: 1_000_000,
        max_supply_shares: u128::MAX / 4,
        max_borrow_shares: u128::MAX / 4,
    }
}

pub struct Setup {
    pub env: Env,
    pub admin: Address,
    pub dex: DexPoolClient<'static>,
    pub liquidity: MockLiquidityClient<'static>,
    pub token0: TokenClient<'static>,
    pub token1: TokenClient<'static>,
}

/// Registers two tokens ordered by address, funds `admin` with both and
/// returns `(token0, token1)`.
pub fn create_tokens(env: &Env, admin: &Address) -> (Address, Address) {
    let issuer = Address::generate(env);
    let a = env.register_stellar_asset_contract_v2(issuer.clone()).address();
    let b = env.register_stellar_asset_contract_v2(issuer).address();
    let (token0, token1) = if a < b { (a, b) } else { (b, a) };
    StellarAssetClient::new(env, &token0).mint(admin, &ADMIN_FUNDS);
    StellarAssetClient::new(env, &token1).mint(admin, &ADMIN_FUNDS);
    (token0, token1)
}

impl Setup {
    pub fn new() -> Self {
        Self::with_params(|_| {})
    }

    pub fn with_params(edit: impl FnOnce(&mut InitParams)) -> Self {
        let env = Env::default();
        env.mock_all_auths();
        env.budget().reset_unlimited();
        env.ledger().set_timestamp(START);

        let admin = Address::generate(&env);
        let (token0, token1) = create_tokens(&env, &admin);
        let liquidity_id = env.register_contract(None, MockLiquidity);
        let dex_id = env.register_contract(None, DexPool);
        let dex = DexPoolClient::new(&env, &dex_id);

        let mut params = default_params();
        edit(&mut params);
        dex.initialize(&admin, &liquidity_id, &token0, &token1, &params);

        Setup {
            liquidity: MockLiquidityClient::new(&env, &liquidity_id),
            token0: TokenClient::new(&env, &token0),
            token1: TokenClient::new(&env, &token1),
            dex,
            admin,
            env,
        }
    }

    /// A funded user enabled on both sides without withdrawal or borrow
    /// restrictions.
    pub fn user(&self) -> Address {
        let user = Address::generate(&self.env);
        StellarAssetClient::new(&self.env, &self.token0.address).mint(&user, &USER_FUNDS);
        StellarAssetClient::new(&self.env, &self.token1.address).mint(&user, &USER_FUNDS);
        self.dex.update_user_supply_config(
            &user,
            &UserSupplyConfig {
                expand_percent: 1_000_000,
                expand_duration: 1,
                base_withdrawal_limit: u128::MAX,
            },
        );
        self.dex.update_user_borrow_config(
            &user,
            &UserBorrowConfig {
                expand_percent: 0,
                expand_duration: 0,
                base_debt_ceiling: u128::MAX / 4,
                max_debt_ceiling: u128::MAX / 4,
            },
        );
        user
    }

    pub fn advance(&self, seconds: u64) {
        let now = self.env.ledger().timestamp();
        self.env.ledger().set_timestamp(now + seconds);
    }

    pub fn balances(&self, who: &Address) -> (i128, i128) {
        (self.token0.balance(who), self.token1.balance(who))
    }

    /// Relative gap between the collateral and debt pool prices.
    pub fn price_gap(&self) -> f64 {
        let snapshot = self.dex.get_prices_and_reserves();
        let c = &snapshot.collateral;
        let d = &snapshot.debt;
        let collateral =
            reserves_price(c.token0_imaginary_reserves, c.token1_imaginary_reserves).unwrap() as f64;
        let debt =
            reserves_price(d.token0_imaginary_reserves, d.token1_imaginary_reserves).unwrap() as f64;
        ((collateral - debt) / debt).abs()
    }
}
