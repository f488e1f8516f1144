//! Fixed precisions and bounds shared by every component.

/// Prices are token1 per token0 in decimal-adjusted units, scaled by 1e27.
pub const PRICE_PRECISION: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Percentages (fee, ranges, thresholds, caps, limits) use 1e6 = 100%.
pub const SIX_DECIMALS: u128 = 1_000_000;

/// Every token amount is normalized to this many decimals internally.
pub const TOKENS_DECIMALS_PRECISION: u32 = 12;

/// Lowest and highest center price accepted by configuration.
pub const MIN_PRICE: u128 = 1_000_000_000_000_000_000; // 1e-9
pub const MAX_PRICE: u128 = 1_000_000_000_000_000_000_000_000_000_000_000_000; // 1e9

/// Swap size bounds on the decimal-adjusted amount.
pub const MIN_SWAP_AMOUNT: u128 = 10_000;
pub const MAX_SWAP_AMOUNT: u128 = 1_000_000_000_000_000_000_000_000_000_000; // 1e30

/// Reserves of a pool side may not be drained below 1 / 10_000 of the other
/// side valued at the pool price.
pub const MIN_RESERVES_RATIO: u128 = 10_000;
/// Debt pools whose imaginary reserves fall below this are unusable.
pub const MINIMUM_LIQUIDITY_SWAP: u128 = 10_000;

/// Smallest share/token amount a position operation may move.
pub const MINIMUM_LIQUIDITY_USER_OPERATIONS: u128 = 1_000_000;
/// A position operation must move at least `1 / OPERATION_BOUNDS_RATIO` and at
/// most `OPERATION_BOUNDS_RATIO` times the reference total.
pub const OPERATION_BOUNDS_RATIO: u128 = 100_000_000;

/// An arbitrage smaller than `reserve / ARBITRAGE_DUST_RATIO` is skipped.
pub const ARBITRAGE_DUST_RATIO: u128 = 1_000_000_000;

/// Oracle geometry: pages of fixed slots, overwritten oldest-first.
pub const ORACLE_PAGE_SLOTS: u32 = 8;
pub const ORACLE_PAGES: u32 = 32;
/// Longest time gap one oracle entry can express; longer gaps are clamped.
pub const ORACLE_MAX_TIME_DIFF: u64 = 16_777_215;
/// Oracle price changes are fractions scaled by 1e12.
pub const ORACLE_CHANGE_PRECISION: i128 = 1_000_000_000_000;

/// Upper bound on any configured percentage for ranges, thresholds and the
/// oracle price-change limit.
pub const MAX_RANGE_PERCENT: u32 = 500_000;
pub const MAX_FEE: u32 = 100_000;
pub const MAX_PRICE_CHANGE_PERCENT: u32 = 200_000;

pub const INSTANCE_LIFETIME_THRESHOLD: u32 = 17_280; // ~1 day in 5s ledgers
pub const INSTANCE_BUMP_AMOUNT: u32 = 518_400; // ~30 days in 5s ledgers
pub const PERSISTENT_LIFETIME_THRESHOLD: u32 = 17_280;
pub const PERSISTENT_BUMP_AMOUNT: u32 = 1_036_800; // ~60 days
