//! Reserve, routing, arbitrage and implicit-swap math on plain numbers.

use crate::{
    arbitrage::{plan, Arbitrage},
    constants::PRICE_PRECISION,
    errors::DexError,
    math::narrow,
    position::implicit::{borrow_and_swap, Fraction, swap_and_deposit, swap_and_payback, withdraw_and_swap},
    pricing::{pool_prices, reserves_price, PoolPrices},
    reserves::{collateral_reserves, debt_reserves, CollateralReserves, DebtReserves},
    routing::{amount_in, amount_out, equalizing_amount, route_in, route_out, PoolSide, Route},
};

const E15: u128 = 1_000_000_000_000_000;

fn ten_percent() -> PoolPrices {
    pool_prices(PRICE_PRECISION, 100_000, 100_000).unwrap()
}

fn ratio(fraction: &Fraction) -> f64 {
    narrow(fraction.numerator).unwrap() as f64 / narrow(fraction.denominator).unwrap() as f64
}

fn relative_gap(a: f64, b: f64) -> f64 {
    ((a - b) / b).abs()
}

// ---------------------------------------------------------------------------
// collateral reserves
// ---------------------------------------------------------------------------

#[test]
fn collateral_price_sits_inside_range() {
    let prices = ten_percent();
    let reserves = collateral_reserves(&prices, E15, E15).unwrap();
    assert!(reserves.token0_imaginary_reserves > reserves.token0_real_reserves);
    assert!(reserves.token1_imaginary_reserves > reserves.token1_real_reserves);

    let price = reserves_price(reserves.token0_imaginary_reserves, reserves.token1_imaginary_reserves)
        .unwrap();
    assert!(prices.lower < price && price < prices.upper);
}

#[test]
fn draining_token1_reaches_lower_bound() {
    let prices = ten_percent();
    let reserves = collateral_reserves(&prices, E15, E15).unwrap();
    let x = reserves.token0_imaginary_reserves as f64;
    let y = reserves.token1_imaginary_reserves as f64;
    let real1 = reserves.token1_real_reserves as f64;
    // Taking every real token1 leaves (y - real1) against x * y / (y - real1).
    let price_at_exhaustion = (y - real1) * (y - real1) / (x * y);
    let lower = prices.lower as f64 / PRICE_PRECISION as f64;
    assert!(relative_gap(price_at_exhaustion, lower) < 1e-7);
}

#[test]
fn empty_collateral_pool_has_no_reserves() {
    let reserves = collateral_reserves(&ten_percent(), 0, 0).unwrap();
    assert_eq!(reserves.token0_imaginary_reserves, 0);
    assert_eq!(reserves.token1_imaginary_reserves, 0);
}

// ---------------------------------------------------------------------------
// debt reserves
// ---------------------------------------------------------------------------

#[test]
fn debt_price_sits_at_geometric_mean_for_balanced_debt() {
    let prices = ten_percent();
    let reserves = debt_reserves(&prices, E15 / 2, E15 / 2).unwrap();
    let price = reserves_price(reserves.token0_imaginary_reserves, reserves.token1_imaginary_reserves)
        .unwrap();
    let gap = relative_gap(price as f64, prices.geometric_mean as f64);
    assert!(gap < 1e-3, "debt pool price {price} too far from geometric mean");

    assert!(reserves.token0_real_reserves > 0);
    assert!(reserves.token0_real_reserves < reserves.token0_debt);
    assert!(reserves.token1_real_reserves < reserves.token1_debt);
}

#[test]
fn dust_debt_is_unusable() {
    assert_eq!(debt_reserves(&ten_percent(), 1, 1), Err(DexError::DebtReservesTooLow));
}

// ---------------------------------------------------------------------------
// routing
// ---------------------------------------------------------------------------

#[test]
fn equal_pools_split_evenly() {
    let route = route_in(1_000_000_000_000, E15, E15, E15, E15).unwrap();
    assert_eq!(
        route,
        Route::Split { collateral: 500_000_000_000, debt: 500_000_000_000 }
    );
}

#[test]
fn cheaper_pool_takes_the_whole_trade() {
    // Same depth, the debt pool already holds four times the input token.
    let (x2, y2) = (4 * E15, E15 / 4);
    assert_eq!(route_in(1_000_000_000_000, E15, E15, x2, y2), Ok(Route::Collateral));
    assert_eq!(route_in(1_000_000_000_000, x2, y2, E15, E15), Ok(Route::Debt));
}

#[test]
fn exact_output_split_equalizes_prices() {
    let total = 2_000_000_000_000;
    // Same price, the debt pool twice as deep.
    let route = route_out(total, E15, E15, 2 * E15, 2 * E15).unwrap();
    let Route::Split { collateral, debt } = route else {
        panic!("expected a split, got {route:?}");
    };
    assert_eq!(collateral + debt, total);

    let c_in = amount_in(collateral, E15, E15).unwrap();
    let d_in = amount_in(debt, 2 * E15, 2 * E15).unwrap();
    let c_price = (E15 - collateral) as f64 / (E15 + c_in) as f64;
    let d_price = (2 * E15 - debt) as f64 / (2 * E15 + d_in) as f64;
    assert!(relative_gap(c_price, d_price) < 1e-6);
}

#[test]
fn equalizing_amount_balances_depths() {
    assert_eq!(equalizing_amount((E15, E15), (E15, E15)), Ok((true, 0)));
    // Depth 1e15 on both sides: moving 1.5e15 leaves 2.5e15 token0 in each.
    assert_eq!(
        equalizing_amount((E15, E15), (4 * E15, E15 / 4)),
        Ok((true, 1_500 * 1_000_000_000_000))
    );
    assert_eq!(
        equalizing_amount((4 * E15, E15 / 4), (E15, E15)),
        Ok((false, 1_500 * 1_000_000_000_000))
    );
}

#[test]
fn constant_product_amounts_round_against_the_trader() {
    assert_eq!(amount_out(100, 1_000, 1_000), Ok(90));
    assert_eq!(amount_in(90, 1_000, 1_000), Ok(99));
    assert_eq!(amount_in(1_000, 1_000, 1_000), Err(DexError::InsufficientReserves));
}

#[test]
fn pool_side_refuses_to_drain_real_reserves() {
    let side = PoolSide {
        in_imaginary: 10 * E15,
        out_imaginary: 10 * E15,
        in_real: E15,
        out_real: E15,
    };
    assert_eq!(side.check_after(E15, E15 + 1), Err(DexError::InsufficientReserves));
    assert!(side.check_after(E15 / 10, E15 / 11).is_ok());
    // Leaving one wei of output against a full input side is too thin.
    assert_eq!(side.check_after(E15, E15 - 1), Err(DexError::TokenReservesTooLow));
}

// ---------------------------------------------------------------------------
// implicit swaps: each root satisfies its quadratic
// ---------------------------------------------------------------------------

const RX: u128 = E15;
const RY: u128 = E15;
const X: u128 = 20 * E15;
const Y: u128 = 20 * E15;

#[test]
fn swap_and_deposit_solves_its_quadratic() {
    let c = 10_000_000_000_000_u128;
    let s = swap_and_deposit(c, RX, RY, X, Y).unwrap() as f64;
    let (c, rx, ry, x, y) = (c as f64, RX as f64, RY as f64, X as f64, Y as f64);
    let residual = s * s + (x - c + y * (rx + c) / ry) * s - c * x;
    assert!(residual.abs() / (c * x) < 1e-9);
    assert!(s > 0.0 && s < c);
}

#[test]
fn swap_and_payback_solves_its_quadratic() {
    let c = 10_000_000_000_000_u128;
    let s = swap_and_payback(c, RX, RY, X, Y).unwrap() as f64;
    let (c, dx, dy, x, y) = (c as f64, RX as f64, RY as f64, X as f64, Y as f64);
    let residual = s * s + (x - c + y * (dx - c) / dy) * s - c * x;
    assert!(residual.abs() / (c * x) < 1e-9);
    assert!(s > 0.0 && s < c);
}

#[test]
fn withdraw_and_swap_solves_its_quadratic() {
    let w = 10_000_000_000_000_u128;
    let g = withdraw_and_swap(w, RX, RY, X, Y).unwrap();
    let g = ratio(&g);
    let (w, rx, ry, x, y) = (w as f64, RX as f64, RY as f64, X as f64, Y as f64);
    let a = rx + ry * (x - rx) / y;
    let b = rx + w + ry * (x - w) / y;
    let residual = a * g * g - b * g + w;
    assert!(residual.abs() / w < 1e-9);
    assert!(g > 0.0 && g < 1.0);
}

#[test]
fn borrow_and_swap_solves_its_quadratic() {
    let w = 10_000_000_000_000_u128;
    let g = borrow_and_swap(w, RX, RY, X, Y).unwrap();
    let g = ratio(&g);
    let (w, dx, dy, x, y) = (w as f64, RX as f64, RY as f64, X as f64, Y as f64);
    let a = dx + dy * (dx + x) / y;
    let b = dx + dy * x / y - w - w * dy / y;
    let residual = a * g * g + b * g - w;
    assert!(residual.abs() / w < 1e-9);
    assert!(g > 0.0 && g < 1.0);
}

#[test]
fn withdrawing_more_than_the_pool_has_no_solution() {
    let result = withdraw_and_swap(100 * E15, RX, RY, X, Y);
    assert!(matches!(
        result,
        Err(DexError::NoSolution) | Err(DexError::InsufficientReserves)
    ));
}

// ---------------------------------------------------------------------------
// arbitrage sizing
// ---------------------------------------------------------------------------

/// Collateral priced at 1.1, debt at 1.0, so token0 flows into collateral
/// and token1 is paid back to the debt pool.
fn pricier_collateral() -> CollateralReserves {
    CollateralReserves {
        token0_real_reserves: E15,
        token1_real_reserves: E15,
        token0_imaginary_reserves: 10 * E15,
        token1_imaginary_reserves: 11 * E15,
    }
}

fn debt_with_token1_debt(token1_debt: u128) -> DebtReserves {
    DebtReserves {
        token0_debt: E15,
        token1_debt,
        token0_real_reserves: E15,
        token1_real_reserves: E15,
        token0_imaginary_reserves: 10 * E15,
        token1_imaginary_reserves: 10 * E15,
    }
}

#[test]
fn arbitrage_pays_back_at_most_the_outstanding_debt() {
    let collateral = pricier_collateral();
    let unconstrained = plan(&collateral, &debt_with_token1_debt(E15)).unwrap().unwrap();
    assert!(unconstrained.into_collateral);
    assert!(unconstrained.token1 > 1_000_000);

    let capped = plan(&collateral, &debt_with_token1_debt(1_000_000)).unwrap();
    assert_eq!(
        capped,
        Some(Arbitrage { into_collateral: true, token0: 999_999, token1: 1_000_000 })
    );

    assert_eq!(plan(&collateral, &debt_with_token1_debt(0)).unwrap(), None);
}

#[test]
fn equal_prices_need_no_arbitrage() {
    let collateral = CollateralReserves {
        token1_imaginary_reserves: 10 * E15,
        ..pricier_collateral()
    };
    assert_eq!(plan(&collateral, &debt_with_token1_debt(E15)).unwrap(), None);
}
