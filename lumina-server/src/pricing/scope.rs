//! Campaign Scope Resolution
//!
//! Shape validation for ORDER/CATEGORY/PRODUCT targeting and
//! resolution of a campaign's target set into concrete products.

use shared::models::{ApplyScope, Product};
use sqlx::SqlitePool;
use std::collections::HashSet;

use crate::db::repository::{category, product};
use crate::utils::{AppError, AppResult, ErrorCode};

/// Validate target id lists against a scope.
///
/// `invalid_scope` selects the error band of the caller
/// (`InvalidPromotionScope` for campaigns, `InvalidVoucherScope` for
/// vouchers). Existence failures always map to `CategoryNotFound` /
/// `ProductNotFound`.
pub async fn validate_scope_targets(
    pool: &SqlitePool,
    scope: ApplyScope,
    category_ids: &[i64],
    product_ids: &[i64],
    invalid_scope: ErrorCode,
) -> AppResult<()> {
    match scope {
        ApplyScope::Order => {
            if !category_ids.is_empty() || !product_ids.is_empty() {
                return Err(AppError::with_message(
                    invalid_scope,
                    "Phạm vi ORDER không được kèm danh mục hoặc sản phẩm".to_string(),
                ));
            }
        }
        ApplyScope::Category => {
            if category_ids.is_empty() || !product_ids.is_empty() {
                return Err(AppError::with_message(
                    invalid_scope,
                    "Phạm vi CATEGORY yêu cầu danh sách danh mục và không kèm sản phẩm"
                        .to_string(),
                ));
            }
            ensure_categories_exist(pool, category_ids).await?;
        }
        ApplyScope::Product => {
            if product_ids.is_empty() || !category_ids.is_empty() {
                return Err(AppError::with_message(
                    invalid_scope,
                    "Phạm vi PRODUCT yêu cầu danh sách sản phẩm và không kèm danh mục"
                        .to_string(),
                ));
            }
            ensure_products_exist(pool, product_ids).await?;
        }
    }
    Ok(())
}

/// The concrete products a campaign prices.
///
/// ORDER campaigns never touch product rows and resolve to none. Only
/// APPROVED products are returned; resolving to an empty set is not an
/// error.
pub async fn resolve_target_products(
    pool: &SqlitePool,
    scope: ApplyScope,
    category_ids: &[i64],
    product_ids: &[i64],
) -> AppResult<Vec<Product>> {
    let products = match scope {
        ApplyScope::Order => Vec::new(),
        ApplyScope::Category => product::find_approved_by_category_ids(pool, category_ids).await?,
        ApplyScope::Product => product::find_approved_by_ids(pool, product_ids).await?,
    };
    Ok(products)
}

async fn ensure_categories_exist(pool: &SqlitePool, ids: &[i64]) -> AppResult<()> {
    let distinct: HashSet<i64> = ids.iter().copied().collect();
    let found = category::count_existing(pool, ids).await?;
    if found as usize != distinct.len() {
        return Err(AppError::with_message(
            ErrorCode::CategoryNotFound,
            "Một hoặc nhiều danh mục không tồn tại".to_string(),
        ));
    }
    Ok(())
}

async fn ensure_products_exist(pool: &SqlitePool, ids: &[i64]) -> AppResult<()> {
    let distinct: HashSet<i64> = ids.iter().copied().collect();
    let found = product::count_existing(pool, ids).await?;
    if found as usize != distinct.len() {
        return Err(AppError::with_message(
            ErrorCode::ProductNotFound,
            "Một hoặc nhiều sản phẩm không tồn tại".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{CategoryCreate, ProductCreate};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    async fn seed_category(pool: &SqlitePool, name: &str) -> i64 {
        let created = category::create(
            pool,
            CategoryCreate {
                name: name.to_string(),
                description: None,
            },
        )
        .await
        .unwrap();
        created.id
    }

    fn make_product(name: &str, category_id: Option<i64>) -> ProductCreate {
        ProductCreate {
            name: name.to_string(),
            description: None,
            author: None,
            publisher: None,
            category_id,
            tax: Some(0.1),
            unit_price: 100_000.0,
            purchase_price: None,
            discount_value: None,
            price: None,
            stock_quantity: Some(10),
        }
    }

    async fn seed_product(pool: &SqlitePool, name: &str, category_id: Option<i64>) -> i64 {
        let created = product::create(pool, &make_product(name, category_id), 110_000.0, None)
            .await
            .unwrap();
        sqlx::query("UPDATE product SET status = 'APPROVED' WHERE id = ?")
            .bind(created.id)
            .execute(pool)
            .await
            .unwrap();
        created.id
    }

    #[tokio::test]
    async fn test_order_scope_rejects_targets() {
        let pool = test_pool().await;
        let err = validate_scope_targets(
            &pool,
            ApplyScope::Order,
            &[1],
            &[],
            ErrorCode::InvalidPromotionScope,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPromotionScope);
    }

    #[tokio::test]
    async fn test_category_scope_requires_existing_categories() {
        let pool = test_pool().await;
        let cat = seed_category(&pool, "Đồ uống").await;

        validate_scope_targets(
            &pool,
            ApplyScope::Category,
            &[cat],
            &[],
            ErrorCode::InvalidPromotionScope,
        )
        .await
        .unwrap();

        let err = validate_scope_targets(
            &pool,
            ApplyScope::Category,
            &[cat, 9999],
            &[],
            ErrorCode::InvalidPromotionScope,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::CategoryNotFound);
    }

    #[tokio::test]
    async fn test_product_scope_rejects_mixed_targets() {
        let pool = test_pool().await;
        let err = validate_scope_targets(
            &pool,
            ApplyScope::Product,
            &[1],
            &[2],
            ErrorCode::InvalidVoucherScope,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidVoucherScope);
    }

    #[tokio::test]
    async fn test_resolve_category_scope_unions_products() {
        let pool = test_pool().await;
        let drinks = seed_category(&pool, "Đồ uống").await;
        let snacks = seed_category(&pool, "Đồ ăn vặt").await;
        seed_product(&pool, "Trà sữa", Some(drinks)).await;
        seed_product(&pool, "Cà phê", Some(drinks)).await;
        seed_product(&pool, "Khoai tây chiên", Some(snacks)).await;
        seed_product(&pool, "Không danh mục", None).await;

        let resolved =
            resolve_target_products(&pool, ApplyScope::Category, &[drinks, snacks], &[])
                .await
                .unwrap();
        assert_eq!(resolved.len(), 3);

        let none = resolve_target_products(&pool, ApplyScope::Order, &[], &[])
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_product_scope_skips_unapproved() {
        let pool = test_pool().await;
        let approved = seed_product(&pool, "Trà sữa", None).await;
        let pending = product::create(&pool, &make_product("Chưa duyệt", None), 110_000.0, None)
            .await
            .unwrap();

        let resolved =
            resolve_target_products(&pool, ApplyScope::Product, &[], &[approved, pending.id])
                .await
                .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, approved);
    }
}
