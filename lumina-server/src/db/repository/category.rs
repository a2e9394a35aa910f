//! Category Repository

use super::{RepoError, RepoResult};
use shared::models::{Category, CategoryCreate, CategoryUpdate};
use sqlx::SqlitePool;

pub async fn get(pool: &SqlitePool, id: i64) -> RepoResult<Option<Category>> {
    let row = sqlx::query_as::<_, Category>(
        "SELECT id, name, description, created_at, updated_at FROM category WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> RepoResult<Option<Category>> {
    let row = sqlx::query_as::<_, Category>(
        "SELECT id, name, description, created_at, updated_at FROM category WHERE name = ? LIMIT 1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_by_ids(pool: &SqlitePool, ids: &[i64]) -> RepoResult<Vec<Category>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT id, name, description, created_at, updated_at FROM category WHERE id IN ({placeholders})"
    );
    let mut query = sqlx::query_as::<_, Category>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows)
}

/// Count how many of the given ids exist. Used for target validation.
pub async fn count_existing(pool: &SqlitePool, ids: &[i64]) -> RepoResult<i64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!("SELECT COUNT(DISTINCT id) FROM category WHERE id IN ({placeholders})");
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let count = query.fetch_one(pool).await?;
    Ok(count)
}

pub async fn create(pool: &SqlitePool, data: CategoryCreate) -> RepoResult<Category> {
    if find_by_name(pool, &data.name).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Category '{}' already exists",
            data.name
        )));
    }

    let now = shared::util::now_millis();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO category (name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3) RETURNING id",
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(now)
    .fetch_one(pool)
    .await?;

    get(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create category".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: CategoryUpdate) -> RepoResult<Category> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE category SET name = COALESCE(?1, name), description = COALESCE(?2, description), updated_at = ?3 WHERE id = ?4",
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Category {id} not found")));
    }

    get(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Category {id} not found")))
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
        pool
    }

    fn make_category(name: &str) -> CategoryCreate {
        CategoryCreate {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let pool = test_pool().await;
        let cat = create(&pool, make_category("Books")).await.unwrap();
        assert_eq!(cat.name, "Books");

        let found = get(&pool, cat.id).await.unwrap().unwrap();
        assert_eq!(found.id, cat.id);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let pool = test_pool().await;
        create(&pool, make_category("Books")).await.unwrap();
        let err = create(&pool, make_category("Books")).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_count_existing() {
        let pool = test_pool().await;
        let a = create(&pool, make_category("Books")).await.unwrap();
        let b = create(&pool, make_category("Music")).await.unwrap();

        assert_eq!(count_existing(&pool, &[a.id, b.id]).await.unwrap(), 2);
        assert_eq!(count_existing(&pool, &[a.id, 9999]).await.unwrap(), 1);
        assert_eq!(count_existing(&pool, &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_partial() {
        let pool = test_pool().await;
        let cat = create(&pool, make_category("Books")).await.unwrap();

        let updated = update(
            &pool,
            cat.id,
            CategoryUpdate {
                name: None,
                description: Some("Printed things".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Books");
        assert_eq!(updated.description.as_deref(), Some("Printed things"));
    }
}
