//! Swaps across both pools, hooks and revenue.

use soroban_sdk::{testutils::Address as _, Address};

use super::{Setup, TEN};
use crate::errors::DexError;

// ---------------------------------------------------------------------------
// Hook answering with a stored verdict; a second one that always panics.
// ---------------------------------------------------------------------------
mod verdict_hook {
    use soroban_sdk::{contract, contractimpl, symbol_short, Address, Env};

    #[contract]
    pub struct VerdictHook;

    #[contractimpl]
    impl VerdictHook {
        pub fn set_verdict(env: Env, allow: bool) {
            env.storage().instance().set(&symbol_short!("allow"), &allow);
        }

        pub fn calls(env: Env) -> u32 {
            env.storage().instance().get(&symbol_short!("calls")).unwrap_or(0)
        }

        pub fn dex_price(
            env: Env,
            _mode: u32,
            _swap0to1: bool,
            _token0: Address,
            _token1: Address,
            _price: u128,
        ) -> bool {
            let calls: u32 = env.storage().instance().get(&symbol_short!("calls")).unwrap_or(0);
            env.storage().instance().set(&symbol_short!("calls"), &(calls + 1));
            env.storage()
                .instance()
                .get(&symbol_short!("allow"))
                .unwrap_or(true)
        }
    }
}
use verdict_hook::{VerdictHook, VerdictHookClient};

mod broken_hook {
    use soroban_sdk::{contract, contractimpl, Address, Env};

    #[contract]
    pub struct BrokenHook;

    #[contractimpl]
    impl BrokenHook {
        pub fn dex_price(
            _env: Env,
            _mode: u32,
            _swap0to1: bool,
            _token0: Address,
            _token1: Address,
            _price: u128,
        ) -> bool {
            panic!("hook unavailable")
        }
    }
}
use broken_hook::BrokenHook;

fn near_par(amount: i128) -> bool {
    amount > TEN * 95 / 100 && amount < TEN * 105 / 100
}

// ---------------------------------------------------------------------------
// exact input / exact output
// ---------------------------------------------------------------------------

#[test]
fn swap_in_moves_balances() {
    let s = Setup::new();
    let user = s.user();
    let (before0, before1) = s.balances(&user);

    let out = s.dex.swap_in(&user, &true, &TEN, &0, &user);
    assert!(near_par(out), "10 token0 near parity, got {out}");

    let (after0, after1) = s.balances(&user);
    assert_eq!(before0 - after0, TEN);
    assert_eq!(after1 - before1, out);
}

#[test]
fn swap_in_pays_a_separate_recipient() {
    let s = Setup::new();
    let user = s.user();
    let recipient = Address::generate(&s.env);

    let out = s.dex.swap_in(&user, &false, &TEN, &0, &recipient);
    assert_eq!(s.balances(&recipient), (out, 0));
}

#[test]
fn swap_out_delivers_exact_output() {
    let s = Setup::new();
    let user = s.user();
    let (before0, before1) = s.balances(&user);

    let charged = s.dex.swap_out(&user, &false, &TEN, &(TEN * 2), &user);
    assert!(near_par(charged), "10 token0 out near parity, charged {charged}");

    let (after0, after1) = s.balances(&user);
    assert_eq!(after0 - before0, TEN);
    assert_eq!(before1 - after1, charged);
}

#[test]
fn estimates_match_execution() {
    let s = Setup::new();
    let user = s.user();

    let quoted = s.dex.estimate_swap_in(&true, &TEN);
    assert_eq!(s.dex.swap_in(&user, &true, &TEN, &0, &user), quoted);

    let quoted = s.dex.estimate_swap_out(&true, &TEN);
    assert_eq!(s.dex.swap_out(&user, &true, &TEN, &i128::MAX, &user), quoted);
}

#[test]
fn larger_trades_get_worse_prices() {
    let s = Setup::new();
    let small = s.dex.estimate_swap_in(&true, &TEN);
    let large = s.dex.estimate_swap_in(&true, &(TEN * 10));
    assert!(large > small);
    assert!(large < small * 10);

    // Swapping back right after loses to the curve.
    let user = s.user();
    let out = s.dex.swap_in(&user, &true, &TEN, &0, &user);
    let back = s.dex.swap_in(&user, &false, &out, &0, &user);
    assert!(back < TEN);
}

#[test]
fn slippage_limits_are_enforced() {
    let s = Setup::new();
    let user = s.user();
    assert_eq!(
        s.dex.try_swap_in(&user, &true, &TEN, &(TEN * 2), &user),
        Err(Ok(DexError::InsufficientOutputAmount))
    );
    assert_eq!(
        s.dex.try_swap_out(&user, &true, &TEN, &1, &user),
        Err(Ok(DexError::ExcessiveInputAmount))
    );
    assert_eq!(
        s.dex.try_swap_in(&user, &true, &0, &0, &user),
        Err(Ok(DexError::ZeroAmount))
    );
}

// ---------------------------------------------------------------------------
// single-pool routing
// ---------------------------------------------------------------------------

#[test]
fn collateral_only_pool_swaps() {
    let s = Setup::with_params(|p| p.smart_debt_enabled = false);
    let user = s.user();
    let before = s.dex.collateral_reserves();

    let out = s.dex.swap_in(&user, &true, &TEN, &0, &user);
    assert!(near_par(out));

    let after = s.dex.collateral_reserves();
    assert!(after.token0_real_reserves > before.token0_real_reserves);
    assert!(after.token1_real_reserves < before.token1_real_reserves);
    assert_eq!(s.dex.debt_reserves().token0_debt, 0);
}

#[test]
fn debt_only_pool_swaps() {
    let s = Setup::new();
    s.dex.toggle_pools(&false, &true);
    let user = s.user();
    let collateral_before = s.dex.collateral_reserves();
    let debt_before = s.dex.debt_reserves();

    s.dex.swap_in(&user, &true, &TEN, &0, &user);

    assert_eq!(s.dex.collateral_reserves(), collateral_before);
    let debt_after = s.dex.debt_reserves();
    // token0 in pays back token0 debt, token1 out is borrowed.
    assert!(debt_after.token0_debt < debt_before.token0_debt);
    assert!(debt_after.token1_debt > debt_before.token1_debt);
}

#[test]
fn single_pool_route_is_arbitraged_back() {
    let s = Setup::new();
    // Widening the range reprices both curves differently.
    s.dex.update_range_percents(&200_000, &200_000, &0);
    let apart = s.price_gap();
    assert!(apart > 1e-4, "range change left a gap of {apart}");

    // Buying token0 from the cheaper collateral pool cannot close the gap
    // alone, so the router sends the whole trade there.
    let user = s.user();
    s.dex.swap_in(&user, &false, &TEN, &0, &user);
    let gap = s.price_gap();
    assert!(gap * 10.0 < apart, "gap {gap} after the swap, {apart} before");
}

// ---------------------------------------------------------------------------
// fees and revenue
// ---------------------------------------------------------------------------

#[test]
fn fee_lowers_output_and_revenue_is_collectable() {
    let s = Setup::new();
    let without_fee = s.dex.estimate_swap_in(&true, &TEN);
    s.dex.update_fee_and_revenue_cut(&3_000, &100_000);
    let with_fee = s.dex.estimate_swap_in(&true, &TEN);
    assert!(with_fee < without_fee);

    let user = s.user();
    s.dex.swap_in(&user, &true, &TEN, &0, &user);
    // 0.3% fee on 10 tokens, 10% of it kept as revenue.
    assert_eq!(s.dex.revenue(&s.token0.address), 30_000);
    assert_eq!(s.token0.balance(&s.dex.address), 30_000);

    let treasury = Address::generate(&s.env);
    assert_eq!(s.dex.collect_revenue(&s.token0.address, &treasury), 30_000);
    assert_eq!(s.token0.balance(&treasury), 30_000);
    assert_eq!(s.dex.revenue(&s.token0.address), 0);
    assert_eq!(
        s.dex.try_collect_revenue(&s.token0.address, &treasury),
        Err(Ok(DexError::ZeroAmount))
    );
}

// ---------------------------------------------------------------------------
// price change guard
// ---------------------------------------------------------------------------

#[test]
fn large_price_move_is_rejected() {
    let s = Setup::new();
    s.dex.update_max_price_change(&1_000);
    s.advance(10);
    let user = s.user();
    assert_eq!(
        s.dex.try_swap_in(&user, &true, &(TEN * 20), &0, &user),
        Err(Ok(DexError::PriceChangeTooLarge))
    );
    assert_eq!(
        s.dex.try_estimate_swap_in(&true, &(TEN * 20)),
        Err(Ok(DexError::PriceChangeTooLarge))
    );
}

// ---------------------------------------------------------------------------
// hooks
// ---------------------------------------------------------------------------

#[test]
fn hook_can_veto_a_swap() {
    let s = Setup::new();
    let hook = s.env.register_contract(None, VerdictHook);
    let verdict = VerdictHookClient::new(&s.env, &hook);
    s.dex.update_hook(&Some(hook.clone()));
    let user = s.user();

    assert!(s.dex.swap_in(&user, &true, &TEN, &0, &user) > 0);
    assert_eq!(verdict.calls(), 1);

    verdict.set_verdict(&false);
    assert_eq!(
        s.dex.try_swap_in(&user, &true, &TEN, &0, &user),
        Err(Ok(DexError::HookRejected))
    );
}

#[test]
fn failing_hook_does_not_block_swaps() {
    let s = Setup::new();
    let hook = s.env.register_contract(None, BrokenHook);
    s.dex.update_hook(&Some(hook));
    let user = s.user();
    assert!(s.dex.swap_in(&user, &true, &TEN, &0, &user) > 0);
    assert!(!s.dex.variables().locked);
}
