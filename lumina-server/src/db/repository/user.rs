//! User Repository
//!
//! Accounts plus the per-user voucher redemption set.

use super::{RepoError, RepoResult};
use shared::models::{User, UserCreate};
use sqlx::SqlitePool;

pub async fn get(pool: &SqlitePool, id: i64) -> RepoResult<Option<User>> {
    let row = sqlx::query_as::<_, User>(
        "SELECT id, email, name, role, created_at, updated_at FROM app_user WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<User>> {
    let row = sqlx::query_as::<_, User>(
        "SELECT id, email, name, role, created_at, updated_at FROM app_user WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: UserCreate) -> RepoResult<User> {
    let now = shared::util::now_millis();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO app_user (email, name, role, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4) RETURNING id",
    )
    .bind(&data.email)
    .bind(&data.name)
    .bind(data.role)
    .bind(now)
    .fetch_one(pool)
    .await?;

    get(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))
}

// ── Voucher redemption set ───────────────────────────────────

pub async fn has_used_voucher(pool: &SqlitePool, user_id: i64, voucher_id: i64) -> RepoResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM user_voucher_usage WHERE user_id = ? AND voucher_id = ?",
    )
    .bind(user_id)
    .bind(voucher_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Record a redemption. Idempotent per (user, voucher); returns whether a
/// new row was written.
pub async fn mark_voucher_used(
    pool: &SqlitePool,
    user_id: i64,
    voucher_id: i64,
    used_at: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "INSERT OR IGNORE INTO user_voucher_usage (user_id, voucher_id, used_at) VALUES (?1, ?2, ?3)",
    )
    .bind(user_id)
    .bind(voucher_id)
    .bind(used_at)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn used_voucher_ids(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT voucher_id FROM user_voucher_usage WHERE user_id = ? ORDER BY voucher_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Remove a voucher from every user's used set (voucher deletion hook)
pub async fn unmark_voucher_for_all(pool: &SqlitePool, voucher_id: i64) -> RepoResult<u64> {
    let rows = sqlx::query("DELETE FROM user_voucher_usage WHERE voucher_id = ?")
        .bind(voucher_id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected())
}
