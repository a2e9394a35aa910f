//! Cart Repository
//!
//! One cart row per user, lines keyed unique per product. The recalculated
//! state (line snapshots plus cart totals) lands in a single transaction
//! through [`write_back`].

use super::{RepoError, RepoResult};
use shared::models::{Cart, CartItem};
use sqlx::SqlitePool;

const CART_COLUMNS: &str = "id, user_id, subtotal, voucher_discount, total_amount, applied_voucher_code, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, cart_id, product_id, quantity, unit_price, final_price, created_at, updated_at";

pub async fn get(pool: &SqlitePool, id: i64) -> RepoResult<Option<Cart>> {
    let sql = format!("SELECT {CART_COLUMNS} FROM cart WHERE id = ?");
    let row = sqlx::query_as::<_, Cart>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Option<Cart>> {
    let sql = format!("SELECT {CART_COLUMNS} FROM cart WHERE user_id = ?");
    let row = sqlx::query_as::<_, Cart>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create_for_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Cart> {
    let now = shared::util::now_millis();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO cart (user_id, subtotal, voucher_discount, total_amount, created_at, updated_at) VALUES (?1, 0, 0, 0, ?2, ?2) RETURNING id",
    )
    .bind(user_id)
    .bind(now)
    .fetch_one(pool)
    .await?;

    let sql = format!("SELECT {CART_COLUMNS} FROM cart WHERE id = ?");
    sqlx::query_as::<_, Cart>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create cart".into()))
}

// ── Lines ────────────────────────────────────────────────────

pub async fn items(pool: &SqlitePool, cart_id: i64) -> RepoResult<Vec<CartItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM cart_item WHERE cart_id = ? ORDER BY id");
    let rows = sqlx::query_as::<_, CartItem>(&sql)
        .bind(cart_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_item(pool: &SqlitePool, item_id: i64) -> RepoResult<Option<CartItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM cart_item WHERE id = ?");
    let row = sqlx::query_as::<_, CartItem>(&sql)
        .bind(item_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_item_by_product(
    pool: &SqlitePool,
    cart_id: i64,
    product_id: i64,
) -> RepoResult<Option<CartItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM cart_item WHERE cart_id = ? AND product_id = ?");
    let row = sqlx::query_as::<_, CartItem>(&sql)
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn insert_item(
    pool: &SqlitePool,
    cart_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price: f64,
    final_price: f64,
) -> RepoResult<CartItem> {
    let now = shared::util::now_millis();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO cart_item (cart_id, product_id, quantity, unit_price, final_price, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) RETURNING id",
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity)
    .bind(unit_price)
    .bind(final_price)
    .bind(now)
    .fetch_one(pool)
    .await?;

    find_item(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create cart item".into()))
}

pub async fn set_item_quantity(
    pool: &SqlitePool,
    item_id: i64,
    quantity: i64,
    final_price: f64,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE cart_item SET quantity = ?1, final_price = ?2, updated_at = ?3 WHERE id = ?4",
    )
    .bind(quantity)
    .bind(final_price)
    .bind(now)
    .bind(item_id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Cart item {item_id} not found")));
    }
    Ok(())
}

pub async fn delete_item(pool: &SqlitePool, item_id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM cart_item WHERE id = ?")
        .bind(item_id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn delete_items(pool: &SqlitePool, item_ids: &[i64]) -> RepoResult<u64> {
    if item_ids.is_empty() {
        return Ok(0);
    }
    let placeholders = item_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!("DELETE FROM cart_item WHERE id IN ({placeholders})");
    let mut query = sqlx::query(&sql);
    for id in item_ids {
        query = query.bind(id);
    }
    let rows = query.execute(pool).await?;
    Ok(rows.rows_affected())
}

// ── Recalculated state ───────────────────────────────────────

/// Persist a recalculation result atomically: refreshed line snapshots,
/// dropped lines, and the cart's totals and voucher fields.
pub async fn write_back(
    pool: &SqlitePool,
    cart: &Cart,
    lines: &[CartItem],
    removed_item_ids: &[i64],
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    for item_id in removed_item_ids {
        sqlx::query("DELETE FROM cart_item WHERE id = ?")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
    }

    for line in lines {
        sqlx::query(
            "UPDATE cart_item SET quantity = ?1, unit_price = ?2, final_price = ?3, updated_at = ?4 WHERE id = ?5",
        )
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.final_price)
        .bind(now)
        .bind(line.id)
        .execute(&mut *tx)
        .await?;
    }

    let rows = sqlx::query(
        "UPDATE cart SET subtotal = ?1, voucher_discount = ?2, total_amount = ?3, applied_voucher_code = ?4, updated_at = ?5 WHERE id = ?6",
    )
    .bind(cart.subtotal)
    .bind(cart.voucher_discount)
    .bind(cart.total_amount)
    .bind(&cart.applied_voucher_code)
    .bind(now)
    .bind(cart.id)
    .execute(&mut *tx)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Cart {} not found", cart.id)));
    }

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        sqlx::query(
            "INSERT INTO app_user (id, email, name, role, created_at, updated_at) VALUES (1, 'a@x.com', 'A', 'CUSTOMER', 0, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO product (id, name, tax, unit_price, discount_value, price, status, created_at, updated_at) VALUES (10, 'Book', 0.1, 100, 0, 110, 'APPROVED', 0, 0), (11, 'Pen', 0, 50, 0, 50, 'APPROVED', 0, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        pool
    }

    #[tokio::test]
    async fn test_one_cart_per_user() {
        let pool = test_pool().await;
        create_for_user(&pool, 1).await.unwrap();
        let err = create_for_user(&pool, 1).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_item_unique_per_product() {
        let pool = test_pool().await;
        let cart = create_for_user(&pool, 1).await.unwrap();
        insert_item(&pool, cart.id, 10, 1, 110.0, 110.0).await.unwrap();
        let err = insert_item(&pool, cart.id, 10, 2, 110.0, 220.0)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_write_back_is_atomic_view() {
        let pool = test_pool().await;
        let mut cart = create_for_user(&pool, 1).await.unwrap();
        let kept = insert_item(&pool, cart.id, 10, 2, 110.0, 220.0).await.unwrap();
        let dropped = insert_item(&pool, cart.id, 11, 1, 50.0, 50.0).await.unwrap();

        let mut line = kept.clone();
        line.unit_price = 99.0;
        line.final_price = 198.0;
        cart.subtotal = 198.0;
        cart.voucher_discount = 20.0;
        cart.total_amount = 178.0;
        cart.applied_voucher_code = Some("SAVE10".to_string());

        write_back(&pool, &cart, &[line], &[dropped.id]).await.unwrap();

        let stored = find_by_user(&pool, 1).await.unwrap().unwrap();
        assert_eq!(stored.subtotal, 198.0);
        assert_eq!(stored.total_amount, 178.0);
        assert_eq!(stored.applied_voucher_code.as_deref(), Some("SAVE10"));

        let lines = items(&pool, cart.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unit_price, 99.0);
    }

    #[tokio::test]
    async fn test_delete_items_batch() {
        let pool = test_pool().await;
        let cart = create_for_user(&pool, 1).await.unwrap();
        let a = insert_item(&pool, cart.id, 10, 1, 110.0, 110.0).await.unwrap();
        let b = insert_item(&pool, cart.id, 11, 1, 50.0, 50.0).await.unwrap();

        assert_eq!(delete_items(&pool, &[a.id, b.id, 999]).await.unwrap(), 2);
        assert!(items(&pool, cart.id).await.unwrap().is_empty());
    }
}
