//! Adapter over the external reserve service.

use soroban_sdk::{token::TokenClient, Address, Env};
use twinpool_liquidity_interface::{ExchangePrices, LiquidityClient, EXCHANGE_PRICES_PRECISION};

use crate::{
    constants::SIX_DECIMALS,
    errors::DexError,
    math::{mul, mul_div, signed, to_adjusted, unsigned, wide, Rounding},
    storage::DexConstants,
};

/// Amounts the dex holds at the reserve service, decimal-adjusted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolAmounts {
    pub token0_supply: u128,
    pub token1_supply: u128,
    pub token0_borrow: u128,
    pub token1_borrow: u128,
    pub token0_exchange_prices: ExchangePrices,
    pub token1_exchange_prices: ExchangePrices,
}

fn token_amounts(
    client: &LiquidityClient,
    dex: &Address,
    token: &Address,
    decimals: u32,
) -> Result<(u128, u128, ExchangePrices), DexError> {
    let prices = client.exchange_prices(token);
    let raw = client.user_position(dex, token);
    // Supply rounds down and debt rounds up: both favor the pool.
    let supply = mul_div(unsigned(raw.supply)?, prices.supply, EXCHANGE_PRICES_PRECISION, Rounding::Down)?;
    let borrow = mul_div(unsigned(raw.borrow)?, prices.borrow, EXCHANGE_PRICES_PRECISION, Rounding::Up)?;
    Ok((
        to_adjusted(supply, decimals, Rounding::Down)?,
        to_adjusted(borrow, decimals, Rounding::Up)?,
        prices,
    ))
}

pub fn load_amounts(env: &Env, constants: &DexConstants) -> Result<PoolAmounts, DexError> {
    let client = LiquidityClient::new(env, &constants.liquidity);
    let dex = env.current_contract_address();
    let (token0_supply, token0_borrow, token0_exchange_prices) =
        token_amounts(&client, &dex, &constants.token0, constants.token0_decimals)?;
    let (token1_supply, token1_borrow, token1_exchange_prices) =
        token_amounts(&client, &dex, &constants.token1, constants.token1_decimals)?;
    Ok(PoolAmounts {
        token0_supply,
        token1_supply,
        token0_borrow,
        token1_borrow,
        token0_exchange_prices,
        token1_exchange_prices,
    })
}

/// Signed deltas at the reserve service: `supply > 0` deposits, `< 0`
/// withdraws to `to`; `borrow > 0` borrows to `to`, `< 0` pays back.
/// Inbound amounts must already sit at the service.
pub fn operate(
    env: &Env,
    constants: &DexConstants,
    token: &Address,
    supply: i128,
    borrow: i128,
    to: &Address,
) {
    if supply == 0 && borrow == 0 {
        return;
    }
    LiquidityClient::new(env, &constants.liquidity).operate(
        &env.current_contract_address(),
        token,
        &supply,
        &borrow,
        to,
        to,
    );
}

/// Moves `amount` of `token` from `from` straight to the reserve service.
pub fn transfer_in(
    env: &Env,
    constants: &DexConstants,
    token: &Address,
    from: &Address,
    amount: u128,
) -> Result<(), DexError> {
    if amount == 0 {
        return Ok(());
    }
    TokenClient::new(env, token).transfer(from, &constants.liquidity, &signed(amount)?);
    Ok(())
}

/// Fails when the service-wide utilization of `token` exceeds `cap`.
pub fn check_utilization(
    env: &Env,
    constants: &DexConstants,
    token: &Address,
    cap: u32,
) -> Result<(), DexError> {
    let totals = LiquidityClient::new(env, &constants.liquidity).total_amounts(token);
    if totals.supply <= 0 || totals.borrow <= 0 {
        return Ok(());
    }
    let borrowed = mul(wide(totals.borrow as u128), wide(SIX_DECIMALS))?;
    let allowed = mul(wide(totals.supply as u128), wide(cap as u128))?;
    if borrowed > allowed {
        return Err(DexError::UtilizationCapReached);
    }
    Ok(())
}
