//! Discount Calculator
//!
//! Pure discount math shared by campaign pricing and voucher
//! application. Inputs and outputs are `f64`; the arithmetic runs on
//! `Decimal` so retail amounts stay exact instead of picking up float
//! representation noise. Callers round at the cart boundary via
//! `utils::money::round_unit`.

use rust_decimal::prelude::*;

use shared::models::DiscountType;

use crate::utils::money::round_unit;

/// Convert a pre-validated monetary f64 for calculation. Non-finite
/// values log and count as zero.
#[inline]
fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(value = ?value, "Non-finite value in discount calculation, defaulting to zero");
        Decimal::ZERO
    })
}

/// Discount amount for a given base price.
///
/// Percentage discounts are capped by `max_discount_value` when one is
/// set and positive. The result never exceeds the base price and never
/// goes negative; a non-positive base yields no discount.
pub fn discount_amount(
    discount_type: DiscountType,
    discount_value: f64,
    max_discount_value: Option<f64>,
    base_price: f64,
) -> f64 {
    if !base_price.is_finite() || base_price <= 0.0 {
        return 0.0;
    }
    let base = to_decimal(base_price);

    let raw = match discount_type {
        DiscountType::Percentage => {
            let percent = to_decimal(discount_value);
            let mut amount = base.saturating_mul(percent) / Decimal::ONE_HUNDRED;
            if let Some(cap) = max_discount_value
                && cap > 0.0
            {
                amount = amount.min(to_decimal(cap));
            }
            amount
        }
        DiscountType::Amount => to_decimal(discount_value),
    };

    raw.clamp(Decimal::ZERO, base).to_f64().unwrap_or(0.0)
}

/// Effective sale price of a product.
///
/// Tax is applied on the unit price before the campaign discount is
/// subtracted. Malformed inputs (negative or non-finite tax/discount)
/// count as zero. The result is floored at zero and left unrounded;
/// the cart rounds when the product is priced into a line.
pub fn final_price(unit_price: f64, tax: f64, discount: f64) -> f64 {
    let unit = to_decimal(if unit_price.is_finite() { unit_price } else { 0.0 });
    let tax = if tax.is_finite() && tax > 0.0 {
        to_decimal(tax)
    } else {
        Decimal::ZERO
    };
    let discount = if discount.is_finite() && discount > 0.0 {
        to_decimal(discount)
    } else {
        Decimal::ZERO
    };

    let taxed = unit.saturating_mul(Decimal::ONE.saturating_add(tax));
    taxed
        .saturating_sub(discount)
        .max(Decimal::ZERO)
        .to_f64()
        .unwrap_or(0.0)
}

/// Voucher discount against an eligible subtotal, rounded to whole
/// currency units.
pub fn voucher_discount(
    discount_type: DiscountType,
    discount_value: f64,
    max_discount_value: Option<f64>,
    eligible_subtotal: f64,
) -> f64 {
    round_unit(discount_amount(
        discount_type,
        discount_value,
        max_discount_value,
        eligible_subtotal,
    ))
}
