//! Cart Model
//!
//! One cart per user. Totals are derived fields, recomputed by the cart
//! service after every mutation; all monetary totals are whole currency
//! units (half-up rounding).

use serde::{Deserialize, Serialize};

/// Cart entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Cart {
    pub id: i64,
    pub user_id: i64,
    /// Rounded sum of line final prices
    pub subtotal: f64,
    pub voucher_discount: f64,
    /// `round(max(0, subtotal - voucher_discount))`
    pub total_amount: f64,
    pub applied_voucher_code: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Cart line entity
///
/// `unit_price` is a whole-unit snapshot of the product sale price taken
/// when the line was created; recalculation refreshes it from the current
/// sale price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
    /// `quantity * unit_price`
    pub final_price: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Cart with its lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartDetail {
    #[serde(flatten)]
    pub cart: Cart,
    pub items: Vec<CartItem>,
}
