use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

/// 金额统一保留 2 位小数
pub const MONEY_SCALE: u32 = 2;

/// Round to money scale, HALF_UP.
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Money division, rounded HALF_UP at money scale. Division by zero yields
/// zero rather than panicking; callers guard the denominator themselves.
#[inline]
pub fn div_money(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    round_money(numerator / denominator)
}

/// Convert an f64 factor (win probability, volatility) to Decimal for
/// money arithmetic.
#[inline]
pub fn factor_to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ONE)
}
