use soroban_sdk::Env;

use crate::{
    errors::DexError,
    storage::{get_variables, set_variables},
};

/// Acquires the pool lock held in the primary record. Reverts with `Locked`
/// if another mutating operation is already in flight.
pub fn acquire(env: &Env) -> Result<(), DexError> {
    let mut variables = get_variables(env)?;
    if variables.locked {
        return Err(DexError::Locked);
    }
    variables.locked = true;
    set_variables(env, &variables);
    Ok(())
}

/// Releases the pool lock.
///
/// A failed invocation rolls back all state, so a lock left behind by an
/// error path never outlives the call.
pub fn release(env: &Env) -> Result<(), DexError> {
    let mut variables = get_variables(env)?;
    variables.locked = false;
    set_variables(env, &variables);
    Ok(())
}

/// Fails with `Locked` while a mutating operation holds the lock. Views and
/// estimates call this so they never observe half-written state.
pub fn ensure_unlocked(env: &Env) -> Result<(), DexError> {
    if get_variables(env)?.locked {
        return Err(DexError::Locked);
    }
    Ok(())
}

/// Runs `f` with the lock held and releases it on both outcomes.
pub fn with_lock<T>(
    env: &Env,
    f: impl FnOnce() -> Result<T, DexError>,
) -> Result<T, DexError> {
    acquire(env)?;
    let result = f();
    release(env)?;
    result
}
