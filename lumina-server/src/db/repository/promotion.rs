//! Promotion Repository
//!
//! Row CRUD plus the date-window queries the pricing layer and the
//! expiration sweep run. Date filters compare stored instants against day
//! boundaries supplied by the caller: started means
//! `start_date < next_day_start`, not expired means
//! `expiry_date >= today_start`, with NULL bounds passing both.

use super::{RepoError, RepoResult};
use shared::models::{
    ApprovalStatus, Promotion, PromotionCreate, PromotionDetail, PromotionUpdate,
};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, code, name, description, discount_type, discount_value, max_discount_value, min_order_value, max_order_value, apply_scope, start_date, expiry_date, status, is_active, usage_count, submitted_by, submitted_at, approved_by, approved_at, rejection_reason, created_at, updated_at";

const P_COLUMNS: &str = "p.id, p.code, p.name, p.description, p.discount_type, p.discount_value, p.max_discount_value, p.min_order_value, p.max_order_value, p.apply_scope, p.start_date, p.expiry_date, p.status, p.is_active, p.usage_count, p.submitted_by, p.submitted_at, p.approved_by, p.approved_at, p.rejection_reason, p.created_at, p.updated_at";

const ACTIVE_WINDOW: &str = "status = 'APPROVED' AND is_active = 1 AND (start_date IS NULL OR start_date < ?1) AND (expiry_date IS NULL OR expiry_date >= ?2)";

pub async fn get(pool: &SqlitePool, id: i64) -> RepoResult<Option<Promotion>> {
    let sql = format!("SELECT {COLUMNS} FROM promotion WHERE id = ?");
    let row = sqlx::query_as::<_, Promotion>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_code(pool: &SqlitePool, code: &str) -> RepoResult<Option<Promotion>> {
    let sql = format!("SELECT {COLUMNS} FROM promotion WHERE code = ?");
    let row = sqlx::query_as::<_, Promotion>(&sql)
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_status(
    pool: &SqlitePool,
    status: ApprovalStatus,
) -> RepoResult<Vec<Promotion>> {
    let sql = format!("SELECT {COLUMNS} FROM promotion WHERE status = ? ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, Promotion>(&sql)
        .bind(status)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

// ── Date-window queries ──────────────────────────────────────

/// Promotions active as of the given day
pub async fn find_active_as_of(
    pool: &SqlitePool,
    today_start: i64,
    next_day_start: i64,
) -> RepoResult<Vec<Promotion>> {
    let sql = format!("SELECT {COLUMNS} FROM promotion WHERE {ACTIVE_WINDOW} ORDER BY id");
    let rows = sqlx::query_as::<_, Promotion>(&sql)
        .bind(next_day_start)
        .bind(today_start)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Active promotions targeting the product directly
pub async fn find_active_by_product_id(
    pool: &SqlitePool,
    product_id: i64,
    today_start: i64,
    next_day_start: i64,
) -> RepoResult<Vec<Promotion>> {
    let sql = format!(
        "SELECT {P_COLUMNS} FROM promotion p JOIN promotion_product pp ON pp.promotion_id = p.id WHERE pp.product_id = ?3 AND p.status = 'APPROVED' AND p.is_active = 1 AND (p.start_date IS NULL OR p.start_date < ?1) AND (p.expiry_date IS NULL OR p.expiry_date >= ?2)"
    );
    let rows = sqlx::query_as::<_, Promotion>(&sql)
        .bind(next_day_start)
        .bind(today_start)
        .bind(product_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Active promotions targeting the category
pub async fn find_active_by_category_id(
    pool: &SqlitePool,
    category_id: i64,
    today_start: i64,
    next_day_start: i64,
) -> RepoResult<Vec<Promotion>> {
    let sql = format!(
        "SELECT {P_COLUMNS} FROM promotion p JOIN promotion_category pc ON pc.promotion_id = p.id WHERE pc.category_id = ?3 AND p.status = 'APPROVED' AND p.is_active = 1 AND (p.start_date IS NULL OR p.start_date < ?1) AND (p.expiry_date IS NULL OR p.expiry_date >= ?2)"
    );
    let rows = sqlx::query_as::<_, Promotion>(&sql)
        .bind(next_day_start)
        .bind(today_start)
        .bind(category_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Approved, still-inactive promotions whose start date has arrived
pub async fn find_to_activate_as_of(
    pool: &SqlitePool,
    today_start: i64,
    next_day_start: i64,
) -> RepoResult<Vec<Promotion>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM promotion WHERE status = 'APPROVED' AND is_active = 0 AND start_date IS NOT NULL AND start_date < ?1 AND (expiry_date IS NULL OR expiry_date >= ?2) ORDER BY id"
    );
    let rows = sqlx::query_as::<_, Promotion>(&sql)
        .bind(next_day_start)
        .bind(today_start)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Promotions whose expiry day has passed and that are not yet archived
pub async fn find_expired_as_of(pool: &SqlitePool, today_start: i64) -> RepoResult<Vec<Promotion>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM promotion WHERE expiry_date IS NOT NULL AND expiry_date < ? AND status != 'EXPIRED' ORDER BY id"
    );
    let rows = sqlx::query_as::<_, Promotion>(&sql)
        .bind(today_start)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Candidates for the creation-time overlap check: pending or approved
/// campaigns with both date bounds set
pub async fn find_overlap_candidates(pool: &SqlitePool) -> RepoResult<Vec<Promotion>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM promotion WHERE status IN ('APPROVED', 'PENDING_APPROVAL') AND start_date IS NOT NULL AND expiry_date IS NOT NULL ORDER BY id"
    );
    let rows = sqlx::query_as::<_, Promotion>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

// ── Target sets ──────────────────────────────────────────────

pub async fn category_ids(pool: &SqlitePool, promotion_id: i64) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT category_id FROM promotion_category WHERE promotion_id = ? ORDER BY category_id",
    )
    .bind(promotion_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn product_ids(pool: &SqlitePool, promotion_id: i64) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT product_id FROM promotion_product WHERE promotion_id = ? ORDER BY product_id",
    )
    .bind(promotion_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn load_detail(pool: &SqlitePool, id: i64) -> RepoResult<PromotionDetail> {
    let promotion = get(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Promotion {id} not found")))?;
    let category_ids = category_ids(pool, id).await?;
    let product_ids = product_ids(pool, id).await?;
    Ok(PromotionDetail {
        promotion,
        category_ids,
        product_ids,
    })
}

async fn replace_targets(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    promotion_id: i64,
    category_ids: &[i64],
    product_ids: &[i64],
) -> RepoResult<()> {
    sqlx::query("DELETE FROM promotion_category WHERE promotion_id = ?")
        .bind(promotion_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM promotion_product WHERE promotion_id = ?")
        .bind(promotion_id)
        .execute(&mut **tx)
        .await?;
    for id in category_ids {
        sqlx::query("INSERT INTO promotion_category (promotion_id, category_id) VALUES (?1, ?2)")
            .bind(promotion_id)
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }
    for id in product_ids {
        sqlx::query("INSERT INTO promotion_product (promotion_id, product_id) VALUES (?1, ?2)")
            .bind(promotion_id)
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

// ── Writes ───────────────────────────────────────────────────

pub async fn create(
    pool: &SqlitePool,
    data: &PromotionCreate,
    submitted_by: Option<i64>,
) -> RepoResult<PromotionDetail> {
    if find_by_code(pool, &data.code).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Promotion code '{}' already exists",
            data.code
        )));
    }

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO promotion (code, name, description, discount_type, discount_value, max_discount_value, min_order_value, max_order_value, apply_scope, start_date, expiry_date, status, is_active, usage_count, submitted_by, submitted_at, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'PENDING_APPROVAL', 0, 0, ?12, ?13, ?13, ?13) RETURNING id",
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
pub async fn update(pool: &SqlitePool, id: i64, data: &PromotionUpdate) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "UPDATE promotion SET code = COALESCE(?1, code), name = COALESCE(?2, name), description = COALESCE(?3, description), discount_type = COALESCE(?4, discount_type), discount_value = COALESCE(?5, discount_value), max_discount_value = COALESCE(?6, max_discount_value), min_order_value = COALESCE(?7, min_order_value), max_order_value = COALESCE(?8, max_order_value), apply_scope = COALESCE(?9, apply_scope), start_date = COALESCE(?10, start_date), expiry_date = COALESCE(?11, expiry_date), updated_at = ?12 WHERE id = ?13",
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
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Promotion {id} not found")));
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
        "UPDATE promotion SET status = ?1, is_active = ?2, approved_by = ?3, approved_at = ?4, rejection_reason = ?5, updated_at = ?6 WHERE id = ?7",
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
        return Err(RepoError::NotFound(format!("Promotion {id} not found")));
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
    let rows = sqlx::query("UPDATE promotion SET status = ?1, is_active = ?2, updated_at = ?3 WHERE id = ?4")
        .bind(status)
        .bind(is_active)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Promotion {id} not found")));
    }
    Ok(())
}

pub async fn set_active(pool: &SqlitePool, id: i64, is_active: bool) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE promotion SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(is_active)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Promotion {id} not found")));
    }
    Ok(())
}

/// Send a rejected campaign back to review after an edit
pub async fn resubmit(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE promotion SET status = 'PENDING_APPROVAL', is_active = 0, rejection_reason = NULL, approved_by = NULL, approved_at = NULL, updated_at = ?1 WHERE id = ?2",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Promotion {id} not found")));
    }
    Ok(())
}

/// Delete the row; product pointers are nulled in the same transaction and
/// join tables cascade
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE product SET promotion_id = NULL WHERE promotion_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let rows = sqlx::query("DELETE FROM promotion WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(rows.rows_affected() > 0)
}
