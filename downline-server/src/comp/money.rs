//! Money/PV calculation utilities using rust_decimal for precision
//!
//! All arithmetic runs on `Decimal`; values convert to `f64` only for
//! storage and serialization.

use rust_decimal::prelude::*;

use crate::error::{AppError, AppResult};

/// Rounding for monetary/PV values (2 decimal places, half-up)
pub const DECIMAL_PLACES: u32 = 2;

/// Convert an f64 storage value into a Decimal for computation.
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
}

/// Round to storage precision.
pub fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a Decimal back to the f64 storage representation.
pub fn to_f64(value: Decimal) -> f64 {
    round(value).to_f64().unwrap_or(0.0)
}

/// `base × percentage / 100`, truncated to storage precision. Payout
/// rows truncate rather than round half-up so that summing them can
/// never exceed the configured share of the base.
pub fn percent_of(base: Decimal, percentage: Decimal) -> Decimal {
    (base * percentage / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::ToZero)
}

/// Reject NaN/Infinity coming in over the boundary.
pub fn require_finite(value: f64, field_name: &str) -> AppResult<()> {
    if !value.is_finite() {
        return Err(AppError::InvalidArgument(format!(
            "{field_name} must be a finite number, got {value}"
        )));
    }
    Ok(())
}
