//! Product Repository
//!
//! Lookups feeding scope resolution and pricing, plus the batch pricing
//! writes the campaign services run inside their own transactions.

use super::{RepoError, RepoResult};
use shared::models::{Product, ProductCreate, ProductStatus};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, name, description, author, publisher, category_id, tax, unit_price, purchase_price, discount_value, price, status, promotion_id, stock_quantity, submitted_by, approved_by, approved_at, rejection_reason, created_at, updated_at";

pub async fn get(pool: &SqlitePool, id: i64) -> RepoResult<Option<Product>> {
    let sql = format!("SELECT {COLUMNS} FROM product WHERE id = ?");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_ids(pool: &SqlitePool, ids: &[i64]) -> RepoResult<Vec<Product>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!("SELECT {COLUMNS} FROM product WHERE id IN ({placeholders})");
    let mut query = sqlx::query_as::<_, Product>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows)
}

pub async fn find_approved_by_ids(pool: &SqlitePool, ids: &[i64]) -> RepoResult<Vec<Product>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT {COLUMNS} FROM product WHERE status = 'APPROVED' AND id IN ({placeholders})"
    );
    let mut query = sqlx::query_as::<_, Product>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows)
}

pub async fn find_approved_by_category_ids(
    pool: &SqlitePool,
    category_ids: &[i64],
) -> RepoResult<Vec<Product>> {
    if category_ids.is_empty() {
        return Ok(vec![]);
    }
    let placeholders = category_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT {COLUMNS} FROM product WHERE status = 'APPROVED' AND category_id IN ({placeholders})"
    );
    let mut query = sqlx::query_as::<_, Product>(&sql);
    for id in category_ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows)
}

/// Products whose baked-in pricing points at the given promotion
pub async fn find_by_promotion(pool: &SqlitePool, promotion_id: i64) -> RepoResult<Vec<Product>> {
    let sql = format!("SELECT {COLUMNS} FROM product WHERE promotion_id = ?");
    let rows = sqlx::query_as::<_, Product>(&sql)
        .bind(promotion_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Count how many of the given ids exist. Used for target validation.
pub async fn count_existing(pool: &SqlitePool, ids: &[i64]) -> RepoResult<i64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!("SELECT COUNT(DISTINCT id) FROM product WHERE id IN ({placeholders})");
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let count = query.fetch_one(pool).await?;
    Ok(count)
}

/// Insert a product. `price` arrives precomputed by the caller.
pub async fn create(
    pool: &SqlitePool,
    data: &ProductCreate,
    price: f64,
    submitted_by: Option<i64>,
) -> RepoResult<Product> {
    let now = shared::util::now_millis();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO product (name, description, author, publisher, category_id, tax, unit_price, purchase_price, discount_value, price, status, stock_quantity, submitted_by, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'PENDING_APPROVAL', ?11, ?12, ?13, ?13) RETURNING id",
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(&data.author)
    .bind(&data.publisher)
    .bind(data.category_id)
    .bind(data.tax.unwrap_or(0.0))
    .bind(data.unit_price)
    .bind(data.purchase_price)
    .bind(data.discount_value.unwrap_or(0.0))
    .bind(price)
    .bind(data.stock_quantity)
    .bind(submitted_by)
    .bind(now)
    .fetch_one(pool)
    .await?;

    get(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create product".into()))
}

/// Write back every mutable column of an in-memory merged product
pub async fn save(pool: &SqlitePool, product: &Product) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE product SET name = ?1, description = ?2, author = ?3, publisher = ?4, category_id = ?5, tax = ?6, unit_price = ?7, purchase_price = ?8, discount_value = ?9, price = ?10, status = ?11, promotion_id = ?12, stock_quantity = ?13, approved_by = ?14, approved_at = ?15, rejection_reason = ?16, updated_at = ?17 WHERE id = ?18",
    )
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.author)
    .bind(&product.publisher)
    .bind(product.category_id)
    .bind(product.tax)
    .bind(product.unit_price)
    .bind(product.purchase_price)
    .bind(product.discount_value)
    .bind(product.price)
    .bind(product.status)
    .bind(product.promotion_id)
    .bind(product.stock_quantity)
    .bind(product.approved_by)
    .bind(product.approved_at)
    .bind(&product.rejection_reason)
    .bind(now)
    .bind(product.id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "Product {} not found",
            product.id
        )));
    }
    Ok(())
}

// ── Pricing writes ───────────────────────────────────────────

/// One product's pending pricing state for a batch write
#[derive(Debug, Clone)]
pub struct PricingWrite {
    pub product_id: i64,
    pub discount_value: f64,
    pub price: f64,
    pub promotion_id: Option<i64>,
}

/// Bake a batch of pricing states in one transaction
pub async fn set_pricing_batch(pool: &SqlitePool, writes: &[PricingWrite]) -> RepoResult<()> {
    let mut tx = pool.begin().await?;
    for write in writes {
        set_pricing(
            &mut tx,
            write.product_id,
            write.discount_value,
            write.price,
            write.promotion_id,
        )
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Bake campaign pricing into one product row inside an open transaction
pub async fn set_pricing(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    product_id: i64,
    discount_value: f64,
    price: f64,
    promotion_id: Option<i64>,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE product SET discount_value = ?1, price = ?2, promotion_id = ?3, updated_at = ?4 WHERE id = ?5",
    )
    .bind(discount_value)
    .bind(price)
    .bind(promotion_id)
    .bind(now)
    .bind(product_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ── Status & stock ───────────────────────────────────────────

pub async fn set_status(
    pool: &SqlitePool,
    id: i64,
    status: ProductStatus,
    approved_by: Option<i64>,
    approved_at: Option<i64>,
    rejection_reason: Option<&str>,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE product SET status = ?1, approved_by = ?2, approved_at = ?3, rejection_reason = ?4, updated_at = ?5 WHERE id = ?6",
    )
    .bind(status)
    .bind(approved_by)
    .bind(approved_at)
    .bind(rejection_reason)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {id} not found")));
    }
    Ok(())
}

/// Add stock; starts tracking when the product was untracked
pub async fn add_stock(pool: &SqlitePool, id: i64, quantity: i64) -> RepoResult<Product> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE product SET stock_quantity = COALESCE(stock_quantity, 0) + ?1, updated_at = ?2 WHERE id = ?3",
    )
    .bind(quantity)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {id} not found")));
    }

    get(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))
}

/// Delete a product and scrub it from campaign target sets. Cart lines go
/// with it through the FK cascade.
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM promotion_product WHERE product_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM voucher_product WHERE product_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let rows = sqlx::query("DELETE FROM product WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(rows.rows_affected() > 0)
}
