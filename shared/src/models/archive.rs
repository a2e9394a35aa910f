//! Archive Models
//!
//! Write-once snapshots taken by the expiration sweep before a campaign is
//! flipped to EXPIRED. Keyed by the original campaign id; target sets are
//! embedded as JSON arrays so an archived row reads without joins.

use serde::{Deserialize, Serialize};

use super::promotion::{ApplyScope, ApprovalStatus, DiscountType, Promotion};
use super::voucher::Voucher;

/// Archived promotion snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ExpiredPromotion {
    /// Original promotion id
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub max_discount_value: Option<f64>,
    pub min_order_value: Option<f64>,
    pub max_order_value: Option<f64>,
    pub apply_scope: ApplyScope,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub category_ids: Vec<i64>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub product_ids: Vec<i64>,
    pub start_date: Option<i64>,
    pub expiry_date: Option<i64>,
    pub usage_count: i64,
    /// Activity flag at the moment of archiving
    pub is_active: bool,
    /// Status at the moment of archiving
    pub status: ApprovalStatus,
    pub submitted_by: Option<i64>,
    pub submitted_at: Option<i64>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<i64>,
    pub rejection_reason: Option<String>,
    pub expired_at: i64,
}

impl ExpiredPromotion {
    /// Build a snapshot from a live promotion and its target sets
    pub fn snapshot(
        promotion: &Promotion,
        category_ids: Vec<i64>,
        product_ids: Vec<i64>,
        expired_at: i64,
    ) -> Self {
        Self {
            id: promotion.id,
            code: promotion.code.clone(),
            name: promotion.name.clone(),
            description: promotion.description.clone(),
            discount_type: promotion.discount_type,
            discount_value: promotion.discount_value,
            max_discount_value: promotion.max_discount_value,
            min_order_value: promotion.min_order_value,
            max_order_value: promotion.max_order_value,
            apply_scope: promotion.apply_scope,
            category_ids,
            product_ids,
            start_date: promotion.start_date,
            expiry_date: promotion.expiry_date,
            usage_count: promotion.usage_count,
            is_active: promotion.is_active,
            status: promotion.status,
            submitted_by: promotion.submitted_by,
            submitted_at: promotion.submitted_at,
            approved_by: promotion.approved_by,
            approved_at: promotion.approved_at,
            rejection_reason: promotion.rejection_reason.clone(),
            expired_at,
        }
    }
}

/// Archived voucher snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ExpiredVoucher {
    /// Original voucher id
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub max_discount_value: Option<f64>,
    pub min_order_value: Option<f64>,
    pub max_order_value: Option<f64>,
    pub apply_scope: ApplyScope,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub category_ids: Vec<i64>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub product_ids: Vec<i64>,
    pub start_date: Option<i64>,
    pub expiry_date: Option<i64>,
    pub usage_limit: Option<i64>,
    pub usage_count: i64,
    pub is_active: bool,
    pub status: ApprovalStatus,
    pub submitted_by: Option<i64>,
    pub submitted_at: Option<i64>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<i64>,
    pub rejection_reason: Option<String>,
    pub expired_at: i64,
}

impl ExpiredVoucher {
    /// Build a snapshot from a live voucher and its target sets
    pub fn snapshot(
        voucher: &Voucher,
        category_ids: Vec<i64>,
        product_ids: Vec<i64>,
        expired_at: i64,
    ) -> Self {
        Self {
            id: voucher.id,
            code: voucher.code.clone(),
            name: voucher.name.clone(),
            description: voucher.description.clone(),
            discount_type: voucher.discount_type,
            discount_value: voucher.discount_value,
            max_discount_value: voucher.max_discount_value,
            min_order_value: voucher.min_order_value,
            max_order_value: voucher.max_order_value,
            apply_scope: voucher.apply_scope,
            category_ids,
            product_ids,
            start_date: voucher.start_date,
            expiry_date: voucher.expiry_date,
            usage_limit: voucher.usage_limit,
            usage_count: voucher.usage_count,
            is_active: voucher.is_active,
            status: voucher.status,
            submitted_by: voucher.submitted_by,
            submitted_at: voucher.submitted_at,
            approved_by: voucher.approved_by,
            approved_at: voucher.approved_at,
            rejection_reason: voucher.rejection_reason.clone(),
            expired_at,
        }
    }
}
