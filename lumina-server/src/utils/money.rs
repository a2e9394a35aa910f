//! Monetary rounding utilities using rust_decimal for precision
//!
//! Prices are `f64` in whole currency units (VND). Totals and price
//! snapshots round half-up (midpoint away from zero); the discount
//! computation itself never rounds.

use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;

use super::error::{AppError, AppResult};

/// Whole currency units
const DECIMAL_PLACES: u32 = 0;

/// Round a monetary value to a whole currency unit (half-up)
pub fn round_unit(value: f64) -> f64 {
    let decimal = Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(value = value, "Invalid monetary value, treating as 0");
        Decimal::ZERO
    });

    decimal
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// Validate that a monetary input is a finite, non-negative number
pub fn require_non_negative(value: f64, field_name: &str) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::validation(format!(
            "{} must be a non-negative number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_unit_half_up() {
        assert_eq!(round_unit(99.4), 99.0);
        assert_eq!(round_unit(99.5), 100.0);
        assert_eq!(round_unit(99_000.0), 99_000.0);
        assert_eq!(round_unit(0.0), 0.0);
    }

    #[test]
    fn test_round_unit_float_noise() {
        // 0.1 + 0.2 style representation noise must not leak into totals
        assert_eq!(round_unit(89_099.99999999999), 89_100.0);
    }

    #[test]
    fn test_round_unit_non_finite() {
        assert_eq!(round_unit(f64::NAN), 0.0);
    }

    #[test]
    fn test_require_non_negative() {
        assert!(require_non_negative(0.0, "unit_price").is_ok());
        assert!(require_non_negative(125_000.0, "unit_price").is_ok());
        assert!(require_non_negative(-1.0, "unit_price").is_err());
        assert!(require_non_negative(f64::INFINITY, "unit_price").is_err());
    }
}
