use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Product, ProductWithCategory};
use crate::pagination::PageRequest;

/// Resolved insert values; the category reference has already been checked.
#[derive(Debug, Clone)]
pub struct ProductInsert {
    pub name: String,
    pub price: f64,
    pub stock: i32,
    pub category_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
}

/// Product persistence. Every read skips soft-deleted rows.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, product: &ProductInsert, actor: Uuid) -> anyhow::Result<Product>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>>;

    /// Like `find_by_id`, with the owning category's id and name when it is still live.
    async fn find_with_category(&self, id: Uuid) -> anyhow::Result<Option<ProductWithCategory>>;

    async fn find_many(&self, page: PageRequest) -> anyhow::Result<Vec<ProductWithCategory>>;

    async fn count(&self) -> anyhow::Result<i64>;

    /// Absent fields keep their value. Returns the number of rows touched.
    async fn update(&self, id: Uuid, changes: &ProductUpdate, actor: Uuid) -> anyhow::Result<u64>;

    async fn stamp_deleted_by(&self, id: Uuid, actor: Uuid) -> anyhow::Result<u64>;

    async fn soft_delete(&self, id: Uuid) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgProductRepository {
    db: PgPool,
}

impl PgProductRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, product: &ProductInsert, actor: Uuid) -> anyhow::Result<Product> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, price, stock, category_id, created_by)
            VALUES ($1, $2::FLOAT8::NUMERIC(10, 2), $3, $4, $5)
            RETURNING id, name, price::FLOAT8 AS price, stock, category_id,
                      created_at, created_by, modified_at, modified_by, deleted_at, deleted_by
            "#,
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.category_id)
        .bind(actor)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price::FLOAT8 AS price, stock, category_id,
                   created_at, created_by, modified_at, modified_by, deleted_at, deleted_by
            FROM products
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_with_category(&self, id: Uuid) -> anyhow::Result<Option<ProductWithCategory>> {
        let row = sqlx::query_as::<_, ProductWithCategory>(
            r#"
            SELECT p.id, p.name, p.price::FLOAT8 AS price, p.stock, p.category_id,
                   p.created_at, p.created_by, p.modified_at, p.modified_by,
                   p.deleted_at, p.deleted_by,
                   c.id AS category_ref_id, c.name AS category_name
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id AND c.deleted_at IS NULL
            WHERE p.id = $1 AND p.deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_many(&self, page: PageRequest) -> anyhow::Result<Vec<ProductWithCategory>> {
        let rows = sqlx::query_as::<_, ProductWithCategory>(
            r#"
            SELECT p.id, p.name, p.price::FLOAT8 AS price, p.stock, p.category_id,
                   p.created_at, p.created_by, p.modified_at, p.modified_by,
                   p.deleted_at, p.deleted_by,
                   c.id AS category_ref_id, c.name AS category_name
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id AND c.deleted_at IS NULL
            WHERE p.deleted_at IS NULL
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
                .fetch_one(&self.db)
                .await?;
        Ok(count)
    }

    async fn update(&self, id: Uuid, changes: &ProductUpdate, actor: Uuid) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE products
               SET name = COALESCE($2, name),
                   price = COALESCE($3::FLOAT8::NUMERIC(10, 2), price),
                   stock = COALESCE($4, stock),
                   category_id = COALESCE($5, category_id),
                   modified_by = $6,
                   modified_at = now()
             WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.price)
        .bind(changes.stock)
        .bind(changes.category_id)
        .bind(actor)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    async fn stamp_deleted_by(&self, id: Uuid, actor: Uuid) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE products
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
            "UPDATE products SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }
}
