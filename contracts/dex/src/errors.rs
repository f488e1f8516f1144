use soroban_sdk::contracterror;

/// Every failure aborts the whole invocation; the host rolls back all state.
///
/// Codes are grouped by class: 1xx configuration/precondition, 2xx bounds,
/// 3xx slippage and limits, 4xx oracle consistency, 5xx reentrancy and
/// authorization, 6xx arithmetic.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum DexError {
    AlreadyInitialized = 100,
    NotInitialized = 101,
    Paused = 102,
    CollateralPoolDisabled = 103,
    DebtPoolDisabled = 104,
    InvalidConfig = 105,
    InvalidTokenOrder = 106,
    UserNotEnabled = 107,
    CenterPriceSourceMissing = 108,

    SwapAmountTooSmall = 200,
    SwapAmountTooLarge = 201,
    OperationAmountOutOfBounds = 202,
    TokenReservesTooLow = 203,
    DebtReservesTooLow = 204,
    InsufficientReserves = 205,
    InvalidProportion = 206,
    ZeroAmount = 207,
    InsufficientShares = 208,
    NoSolution = 209,

    InsufficientOutputAmount = 300,
    ExcessiveInputAmount = 301,
    SharesSlippage = 302,
    SupplySharesCapReached = 303,
    BorrowSharesCapReached = 304,
    WithdrawalLimitReached = 305,
    BorrowLimitReached = 306,
    UtilizationCapReached = 307,
    HookRejected = 308,

    PriceChangeTooLarge = 400,
    InsufficientOracleData = 401,
    InvalidLookbacks = 402,
    CenterPriceDeviation = 403,

    Locked = 500,
    Unauthorized = 501,

    Overflow = 600,
    DivisionByZero = 601,
    UnreachableRoute = 602,
}
