#![no_std]

//! Interfaces of the contracts a dual-pool dex talks to.
//!
//! The reserve service custodies every token the dex holds, accrues interest
//! through per-token exchange prices and keeps per-user supply/borrow
//! positions. Hooks and center-price sources are optional collaborators
//! configured per pool.

use soroban_sdk::{contractclient, contracttype, Address, Env};

/// Precision of supply/borrow exchange prices (1e12 = 1.0).
pub const EXCHANGE_PRICES_PRECISION: u128 = 1_000_000_000_000;

/// Hook mode used before a swap executes. Returning `false` vetoes the swap.
pub const HOOK_MODE_PRE_SWAP: u32 = 1;
/// Hook mode used after an arbitrage re-equalized both pools.
pub const HOOK_MODE_POST_ARBITRAGE: u32 = 2;

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExchangePrices {
    pub supply: u128,
    pub borrow: u128,
}

/// A user's position at the reserve service, in raw (exchange-price
/// denominated) units. Multiply by the matching exchange price and divide
/// by `EXCHANGE_PRICES_PRECISION` to get token amounts.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RawPosition {
    pub supply: i128,
    pub borrow: i128,
}

/// Service-wide totals for one token, in token amounts.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TotalAmounts {
    pub supply: i128,
    pub borrow: i128,
}

/// External reserve service.
///
/// `operate` is a combined deposit/withdraw/borrow/payback keyed by signed
/// deltas: `supply_amount > 0` deposits, `< 0` withdraws to `withdraw_to`;
/// `borrow_amount > 0` borrows to `borrow_to`, `< 0` pays back. Inbound
/// amounts must already have been transferred to the service when `operate`
/// is invoked. Outbound amounts directed at the service itself are netted
/// against inbound ones without moving tokens.
#[contractclient(name = "LiquidityClient")]
pub trait LiquidityInterface {
    fn operate(
        env: Env,
        user: Address,
        token: Address,
        supply_amount: i128,
        borrow_amount: i128,
        withdraw_to: Address,
        borrow_to: Address,
    ) -> ExchangePrices;

    fn exchange_prices(env: Env, token: Address) -> ExchangePrices;

    fn user_position(env: Env, user: Address, token: Address) -> RawPosition;

    fn total_amounts(env: Env, token: Address) -> TotalAmounts;
}

/// Optional per-pool hook consulted with the trade price (1e27 precision,
/// token1 per token0).
#[contractclient(name = "DexHookClient")]
pub trait DexHook {
    fn dex_price(
        env: Env,
        mode: u32,
        swap0to1: bool,
        token0: Address,
        token1: Address,
        price: u128,
    ) -> bool;
}

/// Optional live center price (1e27 precision, token1 per token0) for
/// pegged pairs.
#[contractclient(name = "CenterPriceClient")]
pub trait CenterPriceSource {
    fn center_price(env: Env) -> u128;
}
