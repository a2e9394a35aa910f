//! Voucher Model
//!
//! Vouchers share the promotion lifecycle but are redeemed against carts
//! at checkout time and never touch product rows.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::promotion::{ApplyScope, ApprovalStatus, DiscountType};

/// Voucher entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Voucher {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    /// Cap for percentage discounts, in currency units
    pub max_discount_value: Option<f64>,
    pub min_order_value: Option<f64>,
    pub max_order_value: Option<f64>,
    pub apply_scope: ApplyScope,
    pub start_date: Option<i64>,
    pub expiry_date: Option<i64>,
    pub status: ApprovalStatus,
    pub is_active: bool,
    /// Total redemption cap; NULL is unlimited
    pub usage_limit: Option<i64>,
    pub usage_count: i64,
    pub submitted_by: Option<i64>,
    pub submitted_at: Option<i64>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<i64>,
    pub rejection_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Voucher with its resolved target sets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherDetail {
    #[serde(flatten)]
    pub voucher: Voucher,
    pub category_ids: Vec<i64>,
    pub product_ids: Vec<i64>,
}

/// Create voucher payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VoucherCreate {
    #[validate(length(min = 1))]
    pub code: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    #[validate(range(min = 0.0))]
    pub discount_value: f64,
    #[validate(range(min = 0.0))]
    pub max_discount_value: Option<f64>,
    #[validate(range(min = 0.0))]
    pub min_order_value: Option<f64>,
    #[validate(range(min = 0.0))]
    pub max_order_value: Option<f64>,
    pub apply_scope: ApplyScope,
    #[serde(default)]
    pub category_ids: Vec<i64>,
    #[serde(default)]
    pub product_ids: Vec<i64>,
    pub start_date: Option<i64>,
    pub expiry_date: Option<i64>,
    pub usage_limit: Option<i64>,
}

/// Update voucher payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VoucherUpdate {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<f64>,
    pub max_discount_value: Option<f64>,
    pub min_order_value: Option<f64>,
    pub max_order_value: Option<f64>,
    pub apply_scope: Option<ApplyScope>,
    pub category_ids: Option<Vec<i64>>,
    pub product_ids: Option<Vec<i64>>,
    pub start_date: Option<i64>,
    pub expiry_date: Option<i64>,
    pub usage_limit: Option<i64>,
}

impl VoucherUpdate {
    /// Whether this update touches scope or target selection
    pub fn touches_scope(&self) -> bool {
        self.apply_scope.is_some() || self.category_ids.is_some() || self.product_ids.is_some()
    }
}
