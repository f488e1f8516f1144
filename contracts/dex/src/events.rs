use soroban_sdk::{symbol_short, Address, Env, Symbol};

pub struct DexEvents;

impl DexEvents {
    /// Emits a `swap` event after a successful swap.
    ///
    /// Topics: `("swap", user)`
    /// Data:   `(swap0to1, amount_in, amount_out, to)`
    pub fn swap(
        env: &Env,
        user: &Address,
        swap0to1: bool,
        amount_in: i128,
        amount_out: i128,
        to: &Address,
    ) {
        env.events().publish(
            (symbol_short!("swap"), user),
            (swap0to1, amount_in, amount_out, to),
        );
    }

    pub fn deposit(env: &Env, user: &Address, shares: u128, amount0: i128, amount1: i128) {
        env.events()
            .publish((symbol_short!("deposit"), user), (shares, amount0, amount1));
    }

    pub fn withdraw(
        env: &Env,
        user: &Address,
        shares: u128,
        amount0: i128,
        amount1: i128,
        to: &Address,
    ) {
        env.events()
            .publish((symbol_short!("withdraw"), user), (shares, amount0, amount1, to));
    }

    pub fn borrow(
        env: &Env,
        user: &Address,
        shares: u128,
        amount0: i128,
        amount1: i128,
        to: &Address,
    ) {
        env.events()
            .publish((symbol_short!("borrow"), user), (shares, amount0, amount1, to));
    }

    pub fn payback(env: &Env, user: &Address, shares: u128, amount0: i128, amount1: i128) {
        env.events()
            .publish((symbol_short!("payback"), user), (shares, amount0, amount1));
    }

    /// Emits an `arbitrage` event after the pools were re-equalized.
    ///
    /// Topics: `("arbitrage",)`
    /// Data:   `(amount0, amount1, price)`; a positive `amount0` moved token0
    /// from the debt pool into the collateral pool.
    pub fn arbitrage(env: &Env, amount0: i128, amount1: i128, price: u128) {
        env.events()
            .publish((symbol_short!("arbitrage"),), (amount0, amount1, price));
    }

    pub fn oracle_entry(env: &Env, time_diff: u32, change: i64, price: u128) {
        env.events()
            .publish((symbol_short!("oracle"),), (time_diff, change, price));
    }

    pub fn initialized(env: &Env, admin: &Address, token0: &Address, token1: &Address) {
        env.events()
            .publish((symbol_short!("init"), admin), (token0.clone(), token1.clone()));
    }

    /// Emits a `config` event naming the administrative update applied.
    pub fn config_updated(env: &Env, name: &str) {
        env.events()
            .publish((symbol_short!("config"), Symbol::new(env, name)), ());
    }

    pub fn revenue_collected(env: &Env, token: &Address, to: &Address, amount: i128) {
        env.events()
            .publish((symbol_short!("revenue"), token), (to.clone(), amount));
    }
}
