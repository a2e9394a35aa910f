//! Archive Repository
//!
//! Write-once snapshot tables filled by the expiration sweep. Target sets
//! are stored as JSON arrays so archived rows read without joins.

use super::RepoResult;
use shared::models::{ExpiredPromotion, ExpiredVoucher};
use sqlx::SqlitePool;

const PROMOTION_COLUMNS: &str = "id, code, name, description, discount_type, discount_value, max_discount_value, min_order_value, max_order_value, apply_scope, category_ids, product_ids, start_date, expiry_date, usage_count, is_active, status, submitted_by, submitted_at, approved_by, approved_at, rejection_reason, expired_at";

const VOUCHER_COLUMNS: &str = "id, code, name, description, discount_type, discount_value, max_discount_value, min_order_value, max_order_value, apply_scope, category_ids, product_ids, start_date, expiry_date, usage_limit, usage_count, is_active, status, submitted_by, submitted_at, approved_by, approved_at, rejection_reason, expired_at";

pub async fn promotion_exists(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM expired_promotion WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

pub async fn insert_promotion(pool: &SqlitePool, snapshot: &ExpiredPromotion) -> RepoResult<()> {
    let category_ids =
        serde_json::to_string(&snapshot.category_ids).unwrap_or_else(|_| "[]".to_string());
    let product_ids =
        serde_json::to_string(&snapshot.product_ids).unwrap_or_else(|_| "[]".to_string());

    sqlx::query(
        "INSERT INTO expired_promotion (id, code, name, description, discount_type, discount_value, max_discount_value, min_order_value, max_order_value, apply_scope, category_ids, product_ids, start_date, expiry_date, usage_count, is_active, status, submitted_by, submitted_at, approved_by, approved_at, rejection_reason, expired_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
    )
    .bind(snapshot.id)
    .bind(&snapshot.code)
    .bind(&snapshot.name)
    .bind(&snapshot.description)
    .bind(snapshot.discount_type)
    .bind(snapshot.discount_value)
    .bind(snapshot.max_discount_value)
    .bind(snapshot.min_order_value)
    .bind(snapshot.max_order_value)
    .bind(snapshot.apply_scope)
    .bind(category_ids)
    .bind(product_ids)
    .bind(snapshot.start_date)
    .bind(snapshot.expiry_date)
    .bind(snapshot.usage_count)
    .bind(snapshot.is_active)
    .bind(snapshot.status)
    .bind(snapshot.submitted_by)
    .bind(snapshot.submitted_at)
    .bind(snapshot.approved_by)
    .bind(snapshot.approved_at)
    .bind(&snapshot.rejection_reason)
    .bind(snapshot.expired_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_promotion(pool: &SqlitePool, id: i64) -> RepoResult<Option<ExpiredPromotion>> {
    let sql = format!("SELECT {PROMOTION_COLUMNS} FROM expired_promotion WHERE id = ?");
    let row = sqlx::query_as::<_, ExpiredPromotion>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn voucher_exists(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM expired_voucher WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn insert_voucher(pool: &SqlitePool, snapshot: &ExpiredVoucher) -> RepoResult<()> {
    let category_ids =
        serde_json::to_string(&snapshot.category_ids).unwrap_or_else(|_| "[]".to_string());
    let product_ids =
        serde_json::to_string(&snapshot.product_ids).unwrap_or_else(|_| "[]".to_string());

    sqlx::query(
        "INSERT INTO expired_voucher (id, code, name, description, discount_type, discount_value, max_discount_value, min_order_value, max_order_value, apply_scope, category_ids, product_ids, start_date, expiry_date, usage_limit, usage_count, is_active, status, submitted_by, submitted_at, approved_by, approved_at, rejection_reason, expired_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
    )
    .bind(snapshot.id)
    .bind(&snapshot.code)
    .bind(&snapshot.name)
    .bind(&snapshot.description)
    .bind(snapshot.discount_type)
    .bind(snapshot.discount_value)
    .bind(snapshot.max_discount_value)
    .bind(snapshot.min_order_value)
    .bind(snapshot.max_order_value)
    .bind(snapshot.apply_scope)
    .bind(category_ids)
    .bind(product_ids)
    .bind(snapshot.start_date)
    .bind(snapshot.expiry_date)
    .bind(snapshot.usage_limit)
    .bind(snapshot.usage_count)
    .bind(snapshot.is_active)
    .bind(snapshot.status)
    .bind(snapshot.submitted_by)
    .bind(snapshot.submitted_at)
    .bind(snapshot.approved_by)
    .bind(snapshot.approved_at)
    .bind(&snapshot.rejection_reason)
    .bind(snapshot.expired_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_voucher(pool: &SqlitePool, id: i64) -> RepoResult<Option<ExpiredVoucher>> {
    let sql = format!("SELECT {VOUCHER_COLUMNS} FROM expired_voucher WHERE id = ?");
    let row = sqlx::query_as::<_, ExpiredVoucher>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::RepoError;
    use shared::models::{ApplyScope, ApprovalStatus, DiscountType};
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

    fn make_snapshot(id: i64) -> ExpiredPromotion {
        ExpiredPromotion {
            id,
            code: "SALE1".to_string(),
            name: "Sale".to_string(),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            max_discount_value: None,
            min_order_value: None,
            max_order_value: None,
            apply_scope: ApplyScope::Category,
            category_ids: vec![3, 4],
            product_ids: vec![],
            start_date: Some(1000),
            expiry_date: Some(2000),
            usage_count: 5,
            is_active: true,
            status: ApprovalStatus::Approved,
            submitted_by: Some(1),
            submitted_at: Some(500),
            approved_by: Some(9),
            approved_at: Some(600),
            rejection_reason: None,
            expired_at: 3000,
        }
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_with_target_sets() {
        let pool = test_pool().await;
        insert_promotion(&pool, &make_snapshot(42)).await.unwrap();

        assert!(promotion_exists(&pool, 42).await.unwrap());
        let stored = find_promotion(&pool, 42).await.unwrap().unwrap();
        assert_eq!(stored.category_ids, vec![3, 4]);
        assert_eq!(stored.status, ApprovalStatus::Approved);
        assert_eq!(stored.expired_at, 3000);
    }

    #[tokio::test]
    async fn test_double_insert_is_duplicate() {
        let pool = test_pool().await;
        insert_promotion(&pool, &make_snapshot(42)).await.unwrap();
        let err = insert_promotion(&pool, &make_snapshot(42)).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_voucher_snapshot() {
        let pool = test_pool().await;
        let snapshot = ExpiredVoucher {
            id: 7,
            code: "SAVE10".to_string(),
            name: "Save".to_string(),
            description: None,
            discount_type: DiscountType::Amount,
            discount_value: 5000.0,
            max_discount_value: None,
            min_order_value: Some(20_000.0),
            max_order_value: None,
            apply_scope: ApplyScope::Order,
            category_ids: vec![],
            product_ids: vec![],
            start_date: None,
            expiry_date: Some(2000),
            usage_limit: Some(100),
            usage_count: 10,
            is_active: true,
            status: ApprovalStatus::Approved,
            submitted_by: None,
            submitted_at: None,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            expired_at: 3000,
        };
        insert_voucher(&pool, &snapshot).await.unwrap();

        assert!(voucher_exists(&pool, 7).await.unwrap());
        let stored = find_voucher(&pool, 7).await.unwrap().unwrap();
        assert_eq!(stored.usage_limit, Some(100));
        assert_eq!(stored.min_order_value, Some(20_000.0));
    }
}
