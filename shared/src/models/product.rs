//! Product Model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Product approval status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ProductStatus {
    PendingApproval,
    Approved,
    Rejected,
    Disabled,
}

/// Admin review action for a product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductAction {
    Approve,
    Reject,
    Disable,
    Enable,
}

/// Product entity
///
/// `price` is the current sale price with any promotion discount baked in:
/// `max(0, unit_price * (1 + tax) - discount_value)`. `promotion_id` points
/// at the campaign whose discount is applied, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub category_id: Option<i64>,
    /// Tax rate as a fraction (0.1 = 10%)
    pub tax: f64,
    /// Base price before tax and discount
    pub unit_price: f64,
    pub purchase_price: Option<f64>,
    /// Currently applied promotion discount in currency units (0 when none)
    pub discount_value: f64,
    /// Sale price (tax included, discount applied)
    pub price: f64,
    pub status: ProductStatus,
    pub promotion_id: Option<i64>,
    /// NULL means stock is not tracked for this product
    pub stock_quantity: Option<i64>,
    pub submitted_by: Option<i64>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<i64>,
    pub rejection_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductCreate {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub category_id: Option<i64>,
    #[validate(range(min = 0.0))]
    pub tax: Option<f64>,
    pub unit_price: f64,
    pub purchase_price: Option<f64>,
    #[validate(range(min = 0.0))]
    pub discount_value: Option<f64>,
    /// Explicit sale price override; computed from unit price when absent
    pub price: Option<f64>,
    pub stock_quantity: Option<i64>,
}

/// Update product payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub category_id: Option<i64>,
    pub tax: Option<f64>,
    pub unit_price: Option<f64>,
    pub purchase_price: Option<f64>,
    pub discount_value: Option<f64>,
    /// Explicit sale price override; any unit price/tax/discount change
    /// recomputes it when absent
    pub price: Option<f64>,
    /// `Some(0)` detaches the current promotion
    pub promotion_id: Option<i64>,
    pub stock_quantity: Option<i64>,
}
