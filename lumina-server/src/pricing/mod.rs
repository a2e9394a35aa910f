//! Pricing Engine
//!
//! Discount math, campaign scope resolution and overlap detection.
//! Signatures stay f64; the arithmetic inside runs on `Decimal` so
//! retail amounts come out exact. Rounding happens only at the cart
//! boundary (see `utils::money`).

pub mod calculator;
pub mod conflict;
pub mod scope;

pub use calculator::{discount_amount, final_price, voucher_discount};
pub use conflict::dates_overlap;
