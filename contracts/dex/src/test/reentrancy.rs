//! Lock helpers over the primary record.

use soroban_sdk::{contract, contractimpl, Env};

use crate::{
    errors::DexError,
    reentrancy,
    storage::{get_variables, set_variables, DexVariables},
};

// Minimal mock contract for testing the lock
#[contract]
pub struct ReentrancyTest;

#[contractimpl]
impl ReentrancyTest {}

fn unlocked_variables() -> DexVariables {
    DexVariables {
        locked: false,
        last_price: 0,
        last_to_last_price: 0,
        center_price: 0,
        last_swap_timestamp: 0,
        last_interaction_duration: 0,
        oracle_page: 0,
        oracle_slot: 0,
    }
}

fn with_pool(test: impl FnOnce(&Env)) {
    let env = Env::default();
    let contract_id = env.register_contract(None, ReentrancyTest);
    env.as_contract(&contract_id, || {
        set_variables(&env, &unlocked_variables());
        test(&env);
    });
}

// ---------------------------------------------------------------------------
// Basic Lock/Unlock Cycle
// ---------------------------------------------------------------------------

#[test]
fn acquire_succeeds_on_first_call() {
    with_pool(|env| {
        assert!(reentrancy::acquire(env).is_ok(), "acquire should succeed on first call");
        assert!(get_variables(env).unwrap().locked);
    });
}

#[test]
fn acquire_returns_locked_if_already_held() {
    with_pool(|env| {
        reentrancy::acquire(env).unwrap();
        assert_eq!(
            reentrancy::acquire(env),
            Err(DexError::Locked),
            "second acquire should return Locked"
        );
    });
}

#[test]
fn release_clears_lock() {
    with_pool(|env| {
        reentrancy::acquire(env).unwrap();
        reentrancy::release(env).unwrap();
        assert!(reentrancy::acquire(env).is_ok(), "acquire should succeed after release");
    });
}

#[test]
fn uninitialized_pool_cannot_lock() {
    let env = Env::default();
    let contract_id = env.register_contract(None, ReentrancyTest);
    env.as_contract(&contract_id, || {
        assert_eq!(reentrancy::acquire(&env), Err(DexError::NotInitialized));
    });
}

// ---------------------------------------------------------------------------
// Read-only callers
// ---------------------------------------------------------------------------

#[test]
fn estimates_refuse_while_locked() {
    with_pool(|env| {
        assert!(reentrancy::ensure_unlocked(env).is_ok());
        reentrancy::acquire(env).unwrap();
        assert_eq!(reentrancy::ensure_unlocked(env), Err(DexError::Locked));
    });
}

// ---------------------------------------------------------------------------
// with_lock
// ---------------------------------------------------------------------------

#[test]
fn with_lock_holds_the_lock_inside() {
    with_pool(|env| {
        let inner = reentrancy::with_lock(env, || {
            assert_eq!(reentrancy::acquire(env), Err(DexError::Locked));
            Ok(7_u32)
        });
        assert_eq!(inner, Ok(7));
        assert!(!get_variables(env).unwrap().locked);
    });
}

#[test]
fn with_lock_releases_after_error() {
    with_pool(|env| {
        let result: Result<(), DexError> =
            reentrancy::with_lock(env, || Err(DexError::ZeroAmount));
        assert_eq!(result, Err(DexError::ZeroAmount));
        assert!(!get_variables(env).unwrap().locked);
    });
}

#[test]
fn nested_with_lock_is_rejected() {
    with_pool(|env| {
        let result = reentrancy::with_lock(env, || reentrancy::with_lock(env, || Ok(())));
        assert_eq!(result, Err(DexError::Locked));
    });
}
