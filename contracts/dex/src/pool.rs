use soroban_sdk::{contracttype, Env};
use twinpool_liquidity_interface::ExchangePrices;

use crate::{
    errors::DexError,
    liquidity::{self, PoolAmounts},
    pricing::{self, PoolPrices, Pricing},
    reserves::{self, CollateralReserves, DebtReserves},
    storage::{
        extend_instance_ttl, get_config, get_constants, get_variables, set_variables, DexConfig,
        DexConstants, DexVariables,
    },
};

/// Snapshot returned by the `get_prices_and_reserves` view.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PricesAndReserves {
    pub prices: PoolPrices,
    pub token0_exchange_prices: ExchangePrices,
    pub token1_exchange_prices: ExchangePrices,
    pub collateral: CollateralReserves,
    pub debt: DebtReserves,
}

/// Everything one operation reads before deciding: both records, live
/// prices and both pools' reserves.
pub struct Pool {
    pub constants: DexConstants,
    pub config: DexConfig,
    pub variables: DexVariables,
    pub pricing: Pricing,
    pub amounts: PoolAmounts,
    pub collateral: CollateralReserves,
    pub debt: DebtReserves,
    pub now: u64,
}

impl Pool {
    pub fn load(env: &Env) -> Result<Self, DexError> {
        let constants = get_constants(env)?;
        let config = get_config(env)?;
        let variables = get_variables(env)?;
        let now = env.ledger().timestamp();
        let pricing = pricing::compute(env, &config, &variables, now)?;
        let amounts = liquidity::load_amounts(env, &constants)?;
        let collateral = reserves::collateral_reserves(
            &pricing.prices,
            amounts.token0_supply,
            amounts.token1_supply,
        )?;
        let debt =
            reserves::debt_reserves(&pricing.prices, amounts.token0_borrow, amounts.token1_borrow)?;
        Ok(Pool { constants, config, variables, pricing, amounts, collateral, debt, now })
    }

    /// Loads the pool for a trading or position operation.
    pub fn load_active(env: &Env) -> Result<Self, DexError> {
        let pool = Self::load(env)?;
        if pool.config.paused {
            return Err(DexError::Paused);
        }
        Ok(pool)
    }

    /// Re-reads reserves after funds moved at the reserve service.
    pub fn refresh_reserves(&mut self, env: &Env) -> Result<(), DexError> {
        self.amounts = liquidity::load_amounts(env, &self.constants)?;
        self.collateral = reserves::collateral_reserves(
            &self.pricing.prices,
            self.amounts.token0_supply,
            self.amounts.token1_supply,
        )?;
        self.debt = reserves::debt_reserves(
            &self.pricing.prices,
            self.amounts.token0_borrow,
            self.amounts.token1_borrow,
        )?;
        Ok(())
    }

    pub fn snapshot(&self) -> PricesAndReserves {
        PricesAndReserves {
            prices: self.pricing.prices.clone(),
            token0_exchange_prices: self.amounts.token0_exchange_prices,
            token1_exchange_prices: self.amounts.token1_exchange_prices,
            collateral: self.collateral.clone(),
            debt: self.debt.clone(),
        }
    }

    pub fn decimals(&self, token0: bool) -> u32 {
        if token0 {
            self.constants.token0_decimals
        } else {
            self.constants.token1_decimals
        }
    }

    /// Persists pending price updates and the primary record.
    pub fn commit(&mut self, env: &Env) {
        self.pricing
            .pending
            .commit(env, &mut self.config, &mut self.variables);
        set_variables(env, &self.variables);
        extend_instance_ttl(env);
    }
}
