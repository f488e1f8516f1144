#![no_std]

//! Minimal reserve service used to exercise the dex in tests.
//!
//! Positions are stored in raw units and converted with per-token exchange
//! prices (1e12 by default). Inbound tokens are verified against the tracked
//! balance of the service, the same way a flash-loan lender verifies
//! repayment.

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, panic_with_error, token::TokenClient,
    Address, Env,
};
use twinpool_liquidity_interface::{
    ExchangePrices, LiquidityInterface, RawPosition, TotalAmounts, EXCHANGE_PRICES_PRECISION,
};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum LiquidityError {
    TransferMissing = 900,
    NegativeSupply = 901,
    NegativeBorrow = 902,
    InvalidExchangePrice = 903,
}

#[contracttype]
#[derive(Clone, Debug)]
pub enum LiquidityKey {
    Position(Address, Address),
    Totals(Address),
    Prices(Address),
    Held(Address),
}

#[contract]
pub struct MockLiquidity;

fn prices(env: &Env, token: &Address) -> ExchangePrices {
    env.storage()
        .instance()
        .get(&LiquidityKey::Prices(token.clone()))
        .unwrap_or(ExchangePrices {
            supply: EXCHANGE_PRICES_PRECISION,
            borrow: EXCHANGE_PRICES_PRECISION,
        })
}

fn to_raw(amount: i128, exchange_price: u128) -> i128 {
    // Deposits/borrows round the raw amount down, withdrawals/paybacks up, so
    // the service never under-collateralizes itself.
    let precision = EXCHANGE_PRICES_PRECISION as i128;
    let price = exchange_price as i128;
    let product = amount * precision;
    if amount >= 0 {
        product / price
    } else {
        -((-product + price - 1) / price)
    }
}

fn position(env: &Env, user: &Address, token: &Address) -> RawPosition {
    env.storage()
        .instance()
        .get(&LiquidityKey::Position(user.clone(), token.clone()))
        .unwrap_or(RawPosition { supply: 0, borrow: 0 })
}

fn totals(env: &Env, token: &Address) -> TotalAmounts {
    env.storage()
        .instance()
        .get(&LiquidityKey::Totals(token.clone()))
        .unwrap_or(TotalAmounts { supply: 0, borrow: 0 })
}

fn held(env: &Env, token: &Address) -> i128 {
    env.storage()
        .instance()
        .get(&LiquidityKey::Held(token.clone()))
        .unwrap_or(0)
}

#[contractimpl]
impl MockLiquidity {
    /// Overrides the exchange prices of `token`. Raw positions keep their
    /// value in raw units, so raising a price accrues interest.
    pub fn set_exchange_prices(env: Env, token: Address, supply: u128, borrow: u128) {
        if supply == 0 || borrow == 0 {
            panic_with_error!(&env, LiquidityError::InvalidExchangePrice);
        }
        env.storage()
            .instance()
            .set(&LiquidityKey::Prices(token), &ExchangePrices { supply, borrow });
    }

    /// Adds external supply/borrow to the service-wide totals so tests can
    /// drive utilization without a second user.
    pub fn add_totals(env: Env, token: Address, supply: i128, borrow: i128) {
        let mut t = totals(&env, &token);
        t.supply += supply;
        t.borrow += borrow;
        env.storage().instance().set(&LiquidityKey::Totals(token), &t);
    }
}

#[contractimpl]
impl LiquidityInterface for MockLiquidity {
    fn operate(
        env: Env,
        user: Address,
        token: Address,
        supply_amount: i128,
        borrow_amount: i128,
        withdraw_to: Address,
        borrow_to: Address,
    ) -> ExchangePrices {
        user.require_auth();

        let me = env.current_contract_address();
        let ex = prices(&env, &token);

        let inflow = supply_amount.max(0) + (-borrow_amount).max(0);
        let withdraw = (-supply_amount).max(0);
        let borrow = borrow_amount.max(0);

        let mut internal = 0_i128;
        if withdraw_to == me {
            internal += withdraw;
        }
        if borrow_to == me {
            internal += borrow;
        }
        let required_in = (inflow - internal).max(0);

        let client = TokenClient::new(&env, &token);
        let tracked = held(&env, &token);
        if client.balance(&me) < tracked + required_in {
            panic_with_error!(&env, LiquidityError::TransferMissing);
        }

        let mut pos = position(&env, &user, &token);
        pos.supply += to_raw(supply_amount, ex.supply);
        pos.borrow += to_raw(borrow_amount, ex.borrow);
        if pos.supply < 0 {
            panic_with_error!(&env, LiquidityError::NegativeSupply);
        }
        if pos.borrow < 0 {
            panic_with_error!(&env, LiquidityError::NegativeBorrow);
        }
        env.storage()
            .instance()
            .set(&LiquidityKey::Position(user, token.clone()), &pos);

        let mut t = totals(&env, &token);
        t.supply += supply_amount;
        t.borrow += borrow_amount;
        env.storage().instance().set(&LiquidityKey::Totals(token.clone()), &t);

        let mut external_out = 0_i128;
        if withdraw > 0 && withdraw_to != me {
            client.transfer(&me, &withdraw_to, &withdraw);
            external_out += withdraw;
        }
        if borrow > 0 && borrow_to != me {
            client.transfer(&me, &borrow_to, &borrow);
            external_out += borrow;
        }
        env.storage()
            .instance()
            .set(&LiquidityKey::Held(token), &(tracked + required_in - external_out));

        ex
    }

    fn exchange_prices(env: Env, token: Address) -> ExchangePrices {
        prices(&env, &token)
    }

    fn user_position(env: Env, user: Address, token: Address) -> RawPosition {
        position(&env, &user, &token)
    }

    fn total_amounts(env: Env, token: Address) -> TotalAmounts {
        totals(&env, &token)
    }
}
