//! Voucher Repository
//!
//! Same row shape as promotions plus `usage_limit`/`usage_count`
//! redemption bookkeeping. Date filters follow the promotion repository's
//! day-boundary convention.

use super::{RepoError, RepoResult};
use shared::models::{ApprovalStatus, Voucher, VoucherCreate, VoucherDetail, VoucherUpdate};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, code, name, description, discount_type, discount_value, max_discount_value, min_order_value, max_order_value, apply_scope, start_date, expiry_date, status, is_active, usage_limit, usage_count, submitted_by, submitted_at, approved_by, approved_at, rejection_reason, created_at, updated_at";

pub async fn get(pool: &SqlitePool, id: i64) -> RepoResult<Option<Voucher>> {
    let sql = format!("SELECT {COLUMNS} FROM voucher WHERE id = ?");
    let row = sqlx::query_as::<_, Voucher>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_code(pool: &SqlitePool, code: &str) -> RepoResult<Option<Voucher>> {
    let sql = format!("SELECT {COLUMNS} FROM voucher WHERE code = ?");
    let row = sqlx::query_as::<_, Voucher>(&sql)
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_status(pool: &SqlitePool, status: ApprovalStatus) -> RepoResult<Vec<Voucher>> {
    let sql = format!("SELECT {COLUMNS} FROM voucher WHERE status = ? ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, Voucher>(&sql)
        .bind(status)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Vouchers redeemable as of the given day
pub async fn find_active_as_of(
    pool: &SqlitePool,
    today_start: i64,
    next_day_start: i64,
) -> RepoResult<Vec<Voucher>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM voucher WHERE status = 'APPROVED' AND is_active = 1 AND (start_date IS NULL OR start_date < ?1) AND (expiry_date IS NULL OR expiry_date >= ?2) ORDER BY id"
    );
    let rows = sqlx::query_as::<_, Voucher>(&sql)
        .bind(next_day_start)
        .bind(today_start)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Vouchers whose expiry day has passed and that are not yet archived
pub async fn find_expired_as_of(pool: &SqlitePool, today_start: i64) -> RepoResult<Vec<Voucher>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM voucher WHERE expiry_date IS NOT NULL AND expiry_date < ? AND status != 'EXPIRED' ORDER BY id"
    );
    let rows = sqlx::query_as::<_, Voucher>(&sql)
        .bind(today_start)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

// ── Target sets ──────────────────────────────────────────────

pub async fn category_ids(pool: &SqlitePool, voucher_id: i64) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT category_id FROM voucher_category WHERE voucher_id = ? ORDER BY category_id",
    )
    .bind(voucher_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn product_ids(pool: &SqlitePool, voucher_id: i64) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT product_id FROM voucher_product WHERE voucher_id = ? ORDER BY product_id",
    )
    .bind(voucher_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn load_detail(pool: &SqlitePool, id: i64) -> RepoResult<VoucherDetail> {
    let voucher = get(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Voucher {id} not found")))?;
    let category_ids = category_ids(pool, id).await?;
    let product_ids = product_ids(pool, id).await?;
    Ok(VoucherDetail {
        voucher,
        category_ids,
        product_ids,
    })
}

async fn replace_targets(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    voucher_id: i64,
    category_ids: &[i64],
    product_ids: &[i64],
) -> RepoResult<()> {
    sqlx::query("DELETE FROM voucher_category WHERE voucher_id = ?")
        .bind(voucher_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM voucher_product WHERE voucher_id = ?")
        .bind(voucher_id)
        .execute(&mut **tx)
        .await?;
    for id in category_ids {
        sqlx::query("INSERT INTO voucher_category (voucher_id, category_id) VALUES (?1, ?2)")
            .bind(voucher_id)
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }
    for id in product_ids {
        sqlx::query("INSERT INTO voucher_product (voucher_id, product_id) VALUES (?1, ?2)")
            .bind(voucher_id)
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

// ── Writes ───────────────────────────────────────────────────

pub async fn create(
    pool: &SqlitePool,
    data: &VoucherCreate,
    submitted_by: Option<i64>,
) -> RepoResult<VoucherDetail> {
    if find_by_code(pool, &data.code).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Voucher code '{}' already exists",
            data.code
        )));
    }

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO voucher (code, name, description, discount_type, discount_value, max_discount_value, min_order_value, max_order_value, apply_scope, start_date, expiry_date, status, is_active, usage_limit, usage_count, submitted_by, submitted_at, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'PENDING_APPROVAL', 0, ?12, 0, ?13, ?14, ?14, ?14) RETURNING id",
    )
    .bind(&data.code)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.discount_type)
    .bind(data.discount_value)
    .bind(data.max_discount_value)
    .bind(data.min_order_value)
    .bind(data.max_order_value)
    .bind(data.apply_scope)
    .bind(data.start_date)
    .bind(data.expiry_date)
    .bind(data.usage_limit)
    .bind(submitted_by)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    replace_targets(&mut tx, id, &data.category_ids, &data.product_ids).await?;

    tx.commit().await?;

    load_detail(pool, id).await
}

/// Partial field update; target sets are replaced when the payload touches
/// scope (absent id lists then mean empty sets)
pub async fn update(pool: &SqlitePool, id: i64, data: &VoucherUpdate) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "UPDATE voucher SET code = COALESCE(?1, code), name = COALESCE(?2, name), description = COALESCE(?3, description), discount_type = COALESCE(?4, discount_type), discount_value = COALESCE(?5, discount_value), max_discount_value = COALESCE(?6, max_discount_value), min_order_value = COALESCE(?7, min_order_value), max_order_value = COALESCE(?8, max_order_value), apply_scope = COALESCE(?9, apply_scope), start_date = COALESCE(?10, start_date), expiry_date = COALESCE(?11, expiry_date), usage_limit = COALESCE(?12, usage_limit), updated_at = ?13 WHERE id = ?14",
    )
    .bind(&data.code)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.discount_type)
    .bind(data.discount_value)
    .bind(data.max_discount_value)
    .bind(data.min_order_value)
    .bind(data.max_order_value)
    .bind(data.apply_scope)
    .bind(data.start_date)
    .bind(data.expiry_date)
    .bind(data.usage_limit)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Voucher {id} not found")));
    }

    if data.touches_scope() {
        let cats = data.category_ids.clone().unwrap_or_default();
        let prods = data.product_ids.clone().unwrap_or_default();
        replace_targets(&mut tx, id, &cats, &prods).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Approve/reject outcome fields in one write
pub async fn set_approval(
    pool: &SqlitePool,
    id: i64,
    status: ApprovalStatus,
    is_active: bool,
    approved_by: i64,
    approved_at: i64,
    rejection_reason: Option<&str>,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE voucher SET status = ?1, is_active = ?2, approved_by = ?3, approved_at = ?4, rejection_reason = ?5, updated_at = ?6 WHERE id = ?7",
    )
    .bind(status)
    .bind(is_active)
    .bind(approved_by)
    .bind(approved_at)
    .bind(rejection_reason)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Voucher {id} not found")));
    }
    Ok(())
}

pub async fn set_status(
    pool: &SqlitePool,
    id: i64,
    status: ApprovalStatus,
    is_active: bool,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows =
        sqlx::query("UPDATE voucher SET status = ?1, is_active = ?2, updated_at = ?3 WHERE id = ?4")
            .bind(status)
            .bind(is_active)
            .bind(now)
            .bind(id)
            .execute(pool)
            .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Voucher {id} not found")));
    }
    Ok(())
}

/// Send a rejected voucher back to review after an edit
pub async fn resubmit(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE voucher SET status = 'PENDING_APPROVAL', is_active = 0, rejection_reason = NULL, approved_by = NULL, approved_at = NULL, updated_at = ?1 WHERE id = ?2",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Voucher {id} not found")));
    }
    Ok(())
}

pub async fn increment_usage(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE voucher SET usage_count = usage_count + 1, updated_at = ?1 WHERE id = ?2",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Voucher {id} not found")));
    }
    Ok(())
}

/// Delete the row; join tables and usage rows cascade
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM voucher WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}
