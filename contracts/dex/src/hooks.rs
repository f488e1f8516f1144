use soroban_sdk::{log, Env};
use twinpool_liquidity_interface::{DexHookClient, HOOK_MODE_POST_ARBITRAGE, HOOK_MODE_PRE_SWAP};

use crate::{
    errors::DexError,
    storage::{DexConfig, DexConstants},
};

/// Asks the configured hook whether a swap at `price` may proceed.
///
/// Only an explicit `false` vetoes. A hook that fails is logged and treated
/// as having no opinion.
pub fn check_swap(
    env: &Env,
    constants: &DexConstants,
    config: &DexConfig,
    swap0to1: bool,
    price: u128,
) -> Result<(), DexError> {
    let Some(hook) = config.hook.as_ref() else {
        return Ok(());
    };
    let result = DexHookClient::new(env, hook).try_dex_price(
        &HOOK_MODE_PRE_SWAP,
        &swap0to1,
        &constants.token0,
        &constants.token1,
        &price,
    );
    match result {
        Ok(Ok(false)) => Err(DexError::HookRejected),
        Ok(Ok(true)) => Ok(()),
        _ => {
            log!(env, "hook call failed, swap continues", hook.clone());
            Ok(())
        }
    }
}

/// Notifies the hook of the price after an arbitrage. The answer and any
/// failure are ignored.
pub fn notify_arbitrage(
    env: &Env,
    constants: &DexConstants,
    config: &DexConfig,
    swap0to1: bool,
    price: u128,
) {
    let Some(hook) = config.hook.as_ref() else {
        return;
    };
    let result = DexHookClient::new(env, hook).try_dex_price(
        &HOOK_MODE_POST_ARBITRAGE,
        &swap0to1,
        &constants.token0,
        &constants.token1,
        &price,
    );
    if result.is_err() {
        log!(env, "hook notification failed", hook.clone());
    }
}
