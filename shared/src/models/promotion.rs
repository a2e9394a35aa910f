//! Promotion Model
//!
//! Promotions bake their discount into product sale prices once approved
//! and active. The enums here are shared with vouchers, which follow the
//! same approval lifecycle.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Discount value interpretation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DiscountType {
    /// `discount_value` is a percentage of the base price
    Percentage,
    /// `discount_value` is a flat currency amount
    Amount,
}

/// Campaign targeting scope
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ApplyScope {
    /// Applies to the whole order (never touches product rows)
    Order,
    /// Applies to all products in the listed categories
    Category,
    /// Applies to the listed products
    Product,
}

/// Campaign approval lifecycle status
///
/// Distinct from `is_active`: an APPROVED campaign with a future start
/// date stays inactive until the sweep activates it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ApprovalStatus {
    PendingApproval,
    Approved,
    Rejected,
    Expired,
    Disabled,
}

/// Admin review action for a campaign
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

/// Admin review payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub action: ApprovalAction,
    /// Required business-wise for REJECT; stored as the rejection reason
    pub reason: Option<String>,
}

/// Promotion entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Promotion {
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
    /// Start instant (Unix millis); NULL starts immediately
    pub start_date: Option<i64>,
    /// Expiry instant (Unix millis); NULL never expires
    pub expiry_date: Option<i64>,
    pub status: ApprovalStatus,
    pub is_active: bool,
    pub usage_count: i64,
    pub submitted_by: Option<i64>,
    pub submitted_at: Option<i64>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<i64>,
    pub rejection_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Promotion with its resolved target sets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionDetail {
    #[serde(flatten)]
    pub promotion: Promotion,
    pub category_ids: Vec<i64>,
    pub product_ids: Vec<i64>,
}

/// Create promotion payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PromotionCreate {
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
}

/// Update promotion payload
///
/// `None` leaves a field unchanged. Touching any of `apply_scope`,
/// `category_ids` or `product_ids` re-validates and replaces the targets.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromotionUpdate {
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
}

impl PromotionUpdate {
    /// Whether this update touches scope or target selection
    pub fn touches_scope(&self) -> bool {
        self.apply_scope.is_some() || self.category_ids.is_some() || self.product_ids.is_some()
    }
}
