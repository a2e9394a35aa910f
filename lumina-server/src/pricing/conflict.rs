//! Campaign Conflict Detection
//!
//! Date-overlap math, the product-level check run when a promotion is
//! applied to its targets, and the creation-time overlap check that
//! keeps dated campaigns from colliding.

use std::collections::{HashMap, HashSet};

use serde_json::json;
use shared::models::{ApplyScope, ApprovalStatus, Product, Promotion, PromotionCreate};
use sqlx::SqlitePool;

use crate::db::repository::{category, product, promotion};
use crate::utils::time::millis_to_date;
use crate::utils::{AppError, AppResult, ErrorCode};

/// How many names a rejection message spells out before truncating
const NAME_LIMIT: usize = 3;

/// Whether two date windows overlap, compared at date granularity.
///
/// A missing bound on either side counts as no overlap.
pub fn dates_overlap(
    start_a: Option<i64>,
    end_a: Option<i64>,
    start_b: Option<i64>,
    end_b: Option<i64>,
) -> bool {
    let (Some(start_a), Some(end_a), Some(start_b), Some(end_b)) =
        (start_a, end_a, start_b, end_b)
    else {
        return false;
    };
    millis_to_date(start_a) <= millis_to_date(end_b)
        && millis_to_date(start_b) <= millis_to_date(end_a)
}

/// Whether a promotion prices products during the given day window.
pub(crate) fn is_active_in_window(
    promotion: &Promotion,
    today_start: i64,
    next_day_start: i64,
) -> bool {
    promotion.status == ApprovalStatus::Approved
        && promotion.is_active
        && promotion
            .start_date
            .is_none_or(|start| start < next_day_start)
        && promotion.expiry_date.is_none_or(|expiry| expiry >= today_start)
}

/// Target products already priced by another active campaign whose
/// window date-overlaps `candidate`.
///
/// Per product this gathers the baked-in campaign when still active
/// plus every active campaign targeting it directly or through its
/// category. The caller treats a non-empty result as all-or-nothing.
pub async fn find_conflicting_products(
    pool: &SqlitePool,
    candidate: &Promotion,
    targets: &[Product],
    today_start: i64,
    next_day_start: i64,
) -> AppResult<Vec<Product>> {
    let mut conflicted = Vec::new();

    for target in targets {
        let mut holders: HashMap<i64, Promotion> = HashMap::new();

        if let Some(current_id) = target.promotion_id
            && let Some(current) = promotion::get(pool, current_id).await?
            && is_active_in_window(&current, today_start, next_day_start)
        {
            holders.insert(current.id, current);
        }
        for promo in
            promotion::find_active_by_product_id(pool, target.id, today_start, next_day_start)
                .await?
        {
            holders.entry(promo.id).or_insert(promo);
        }
        if let Some(category_id) = target.category_id {
            for promo in promotion::find_active_by_category_id(
                pool,
                category_id,
                today_start,
                next_day_start,
            )
            .await?
            {
                holders.entry(promo.id).or_insert(promo);
            }
        }

        let overlaps = holders.values().any(|holder| {
            holder.id != candidate.id
                && dates_overlap(
                    candidate.start_date,
                    candidate.expiry_date,
                    holder.start_date,
                    holder.expiry_date,
                )
        });
        if overlaps {
            conflicted.push(target.clone());
        }
    }

    Ok(conflicted)
}

/// Creation-time overlap check for dated campaigns.
///
/// Skipped entirely when the new campaign has an open date bound.
/// Collisions follow the scope matrix: an existing ORDER campaign
/// blocks every overlapping creation, category sets collide on
/// intersection, and new PRODUCT targets collide with existing product
/// or category targets. A new CATEGORY campaign does not collide with
/// an existing PRODUCT campaign.
pub async fn check_creation_overlap(pool: &SqlitePool, data: &PromotionCreate) -> AppResult<()> {
    let (Some(new_start), Some(new_expiry)) = (data.start_date, data.expiry_date) else {
        return Ok(());
    };

    // Category memberships of the new product targets, for the
    // product-versus-category comparison below
    let new_products = if data.apply_scope == ApplyScope::Product {
        product::find_by_ids(pool, &data.product_ids).await?
    } else {
        Vec::new()
    };

    for existing in promotion::find_overlap_candidates(pool).await? {
        let (Some(existing_start), Some(existing_expiry)) =
            (existing.start_date, existing.expiry_date)
        else {
            continue;
        };
        if !dates_overlap(
            Some(new_start),
            Some(new_expiry),
            Some(existing_start),
            Some(existing_expiry),
        ) {
            continue;
        }

        let from = format_date(existing_start);
        let to = format_date(existing_expiry);

        match existing.apply_scope {
            ApplyScope::Order => {
                return Err(overlap_error(
                    &existing,
                    format!(
                        "Đã có khuyến mãi \"{}\" (mã: {}) áp dụng cho toàn bộ đơn hàng trong khoảng thời gian từ {} đến {}",
                        existing.name, existing.code, from, to
                    ),
                ));
            }
            ApplyScope::Category => {
                let existing_categories: HashSet<i64> = promotion::category_ids(pool, existing.id)
                    .await?
                    .into_iter()
                    .collect();
                match data.apply_scope {
                    ApplyScope::Category => {
                        let shared_ids: Vec<i64> = data
                            .category_ids
                            .iter()
                            .copied()
                            .filter(|id| existing_categories.contains(id))
                            .collect();
                        if !shared_ids.is_empty() {
                            let names: Vec<String> = category::find_by_ids(pool, &shared_ids)
                                .await?
                                .into_iter()
                                .map(|c| c.name)
                                .collect();
                            return Err(overlap_error(
                                &existing,
                                format!(
                                    "Đã có khuyến mãi \"{}\" (mã: {}) áp dụng cho danh mục {} trong khoảng thời gian từ {} đến {}",
                                    existing.name,
                                    existing.code,
                                    names.join(", "),
                                    from,
                                    to
                                ),
                            ));
                        }
                    }
                    ApplyScope::Product => {
                        let caught: Vec<String> = new_products
                            .iter()
                            .filter(|p| {
                                p.category_id
                                    .is_some_and(|id| existing_categories.contains(&id))
                            })
                            .map(|p| p.name.clone())
                            .collect();
                        if !caught.is_empty() {
                            return Err(overlap_error(
                                &existing,
                                format!(
                                    "Đã có khuyến mãi \"{}\" (mã: {}) áp dụng cho danh mục chứa các sản phẩm {} trong khoảng thời gian từ {} đến {}",
                                    existing.name,
                                    existing.code,
                                    list_names(&caught),
                                    from,
                                    to
                                ),
                            ));
                        }
                    }
                    ApplyScope::Order => {}
                }
            }
            ApplyScope::Product => {
                if data.apply_scope == ApplyScope::Product {
                    let existing_products: HashSet<i64> =
                        promotion::product_ids(pool, existing.id)
                            .await?
                            .into_iter()
                            .collect();
                    let caught: Vec<String> = new_products
                        .iter()
                        .filter(|p| existing_products.contains(&p.id))
                        .map(|p| p.name.clone())
                        .collect();
                    if !caught.is_empty() {
                        return Err(overlap_error(
                            &existing,
                            format!(
                                "Đã có khuyến mãi \"{}\" (mã: {}) áp dụng cho các sản phẩm {} trong khoảng thời gian từ {} đến {}",
                                existing.name,
                                existing.code,
                                list_names(&caught),
                                from,
                                to
                            ),
                        ));
                    }
                }
            }
        }
    }

    Ok(())
}

fn overlap_error(existing: &Promotion, message: String) -> AppError {
    AppError::with_message(ErrorCode::PromotionOverlap, message)
        .with_detail("existingPromotionId", json!(existing.id))
        .with_detail("existingPromotionCode", json!(existing.code))
}

fn format_date(millis: i64) -> String {
    millis_to_date(millis).format("%Y-%m-%d").to_string()
}

fn list_names(names: &[String]) -> String {
    let mut shown = names
        .iter()
        .take(NAME_LIMIT)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if names.len() > NAME_LIMIT {
        shown.push_str("...");
    }
    shown
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::DiscountType;
    use sqlx::sqlite::SqlitePoolOptions;

    const DAY: i64 = 86_400_000;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn make_create(code: &str, scope: ApplyScope) -> PromotionCreate {
        PromotionCreate {
            code: code.to_string(),
            name: format!("Chiến dịch {code}"),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            max_discount_value: None,
            min_order_value: None,
            max_order_value: None,
            apply_scope: scope,
            category_ids: Vec::new(),
            product_ids: Vec::new(),
            start_date: Some(0),
            expiry_date: Some(10 * DAY),
        }
    }

    async fn seed_campaign(
        pool: &SqlitePool,
        code: &str,
        scope: &str,
        status: &str,
        start: i64,
        expiry: i64,
    ) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO promotion (code, name, discount_type, discount_value, apply_scope, status, is_active, start_date, expiry_date, created_at, updated_at) VALUES (?1, ?2, 'PERCENTAGE', 10.0, ?3, ?4, 1, ?5, ?6, 0, 0) RETURNING id",
        )
        .bind(code)
        .bind(format!("Khuyến mãi {code}"))
        .bind(scope)
        .bind(status)
        .bind(start)
        .bind(expiry)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[test]
    fn test_dates_overlap_requires_all_bounds() {
        assert!(!dates_overlap(None, Some(DAY), Some(0), Some(DAY)));
        assert!(!dates_overlap(Some(0), Some(DAY), Some(0), None));
        assert!(dates_overlap(Some(0), Some(DAY), Some(DAY), Some(2 * DAY)));
        assert!(!dates_overlap(Some(0), Some(DAY), Some(2 * DAY), Some(3 * DAY)));
    }

    #[test]
    fn test_dates_overlap_compares_at_date_granularity() {
        // Same calendar day even though the instants differ
        assert!(dates_overlap(
            Some(0),
            Some(1_000),
            Some(80_000_000),
            Some(2 * DAY)
        ));
    }

    #[tokio::test]
    async fn test_order_campaign_blocks_every_overlapping_creation() {
        let pool = test_pool().await;
        seed_campaign(&pool, "ORDER10", "ORDER", "APPROVED", 0, 5 * DAY).await;

        let err = check_creation_overlap(&pool, &make_create("NEW", ApplyScope::Order))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PromotionOverlap);
        let details = err.details.unwrap();
        assert_eq!(details["existingPromotionCode"], json!("ORDER10"));
    }

    #[tokio::test]
    async fn test_disjoint_dates_do_not_collide() {
        let pool = test_pool().await;
        seed_campaign(&pool, "ORDER10", "ORDER", "APPROVED", 20 * DAY, 30 * DAY).await;

        check_creation_overlap(&pool, &make_create("NEW", ApplyScope::Order))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_category_sets_collide_on_intersection() {
        let pool = test_pool().await;
        let cat = sqlx::query_scalar::<_, i64>(
            "INSERT INTO category (name, created_at, updated_at) VALUES ('Đồ uống', 0, 0) RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let existing = seed_campaign(&pool, "CAT10", "CATEGORY", "PENDING_APPROVAL", 0, 5 * DAY).await;
        sqlx::query("INSERT INTO promotion_category (promotion_id, category_id) VALUES (?, ?)")
            .bind(existing)
            .bind(cat)
            .execute(&pool)
            .await
            .unwrap();

        let mut data = make_create("NEW", ApplyScope::Category);
        data.category_ids = vec![cat];
        let err = check_creation_overlap(&pool, &data).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PromotionOverlap);
        assert!(err.message.contains("Đồ uống"));

        // Disjoint category sets pass
        let other = sqlx::query_scalar::<_, i64>(
            "INSERT INTO category (name, created_at, updated_at) VALUES ('Sách', 0, 0) RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        data.category_ids = vec![other];
        check_creation_overlap(&pool, &data).await.unwrap();
    }

    #[tokio::test]
    async fn test_new_category_ignores_existing_product_campaign() {
        let pool = test_pool().await;
        let existing = seed_campaign(&pool, "PROD10", "PRODUCT", "APPROVED", 0, 5 * DAY).await;
        sqlx::query("INSERT INTO promotion_product (promotion_id, product_id) VALUES (?, 42)")
            .bind(existing)
            .execute(&pool)
            .await
            .unwrap();

        let mut data = make_create("NEW", ApplyScope::Category);
        data.category_ids = vec![7];
        check_creation_overlap(&pool, &data).await.unwrap();
    }

    #[test]
    fn test_list_names_truncates_after_three() {
        let names: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        assert_eq!(list_names(&names), "A, B, C...");
        assert_eq!(list_names(&names[..2]), "A, B");
    }
}
