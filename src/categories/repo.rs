use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    dto::{CategoryChanges, NewCategory},
    repo_types::Category,
};
use crate::pagination::PageRequest;
use crate::error::db_error;

/// Category persistence. Every read skips soft-deleted rows.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &NewCategory, actor: Uuid) -> anyhow::Result<Category>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Category>>;

    /// Newest first, optionally filtered by a case-insensitive name substring.
    async fn find_many(
        &self,
        name_filter: Option<&str>,
        page: PageRequest,
    ) -> anyhow::Result<Vec<Category>>;

    async fn count(&self, name_filter: Option<&str>) -> anyhow::Result<i64>;

    /// Live categories named exactly `name`, except `exclude`.
    async fn count_by_name(&self, name: &str, exclude: Option<Uuid>) -> anyhow::Result<i64>;

    /// Returns the number of rows touched.
    async fn update(&self, id: Uuid, changes: &CategoryChanges, actor: Uuid)
        -> anyhow::Result<u64>;

    async fn stamp_deleted_by(&self, id: Uuid, actor: Uuid) -> anyhow::Result<u64>;

    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<u64>;
}

/// `ILIKE` pattern matching `needle` anywhere, with wildcards in `needle` escaped.
pub fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[derive(Clone)]
pub struct PgCategoryRepository {
    db: PgPool,
}

impl PgCategoryRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn create(&self, category: &NewCategory, actor: Uuid) -> anyhow::Result<Category> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, created_by)
            VALUES ($1, $2)
            RETURNING id, name, created_at, created_by, modified_at, modified_by,
                      deleted_at, deleted_by
            "#,
        )
        .bind(&category.name)
        .bind(actor)
        .fetch_one(&self.db)
        .await
        .map_err(db_error)?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, created_at, created_by, modified_at, modified_by,
                   deleted_at, deleted_by
            FROM categories
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_many(
        &self,
        name_filter: Option<&str>,
        page: PageRequest,
    ) -> anyhow::Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, created_at, created_by, modified_at, modified_by,
                   deleted_at, deleted_by
            FROM categories
            WHERE deleted_at IS NULL
              AND ($1::TEXT IS NULL OR name ILIKE $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(name_filter.map(contains_pattern))
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn count(&self, name_filter: Option<&str>) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM categories
            WHERE deleted_at IS NULL
              AND ($1::TEXT IS NULL OR name ILIKE $1)
            "#,
        )
        .bind(name_filter.map(contains_pattern))
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    async fn count_by_name(&self, name: &str, exclude: Option<Uuid>) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM categories
            WHERE name = $1
              AND deleted_at IS NULL
              AND ($2::UUID IS NULL OR id <> $2)
            "#,
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &CategoryChanges,
        actor: Uuid,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE categories
               SET name = COALESCE($2, name),
                   modified_by = $3,
                   modified_at = now()
             WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(actor)
        .execute(&self.db)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected())
    }

    async fn stamp_deleted_by(&self, id: Uuid, actor: Uuid) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE categories
               SET deleted_by = $2, modified_at = now()
             WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(actor)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<u64> {
        let result = sqlx::query(
            "UPDATE categories SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }
}
