use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{dto::NewUser, repo_types::User};
use crate::error::db_error;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user with an already hashed password.
    async fn create(&self, user: &NewUser, password_hash: &str) -> anyhow::Result<User>;

    /// Find a live user by email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Find the live user whose stored refresh token equals `token`.
    async fn find_by_token(&self, token: &str) -> anyhow::Result<Option<User>>;

    /// Count users holding `email`, deleted rows included (emails stay reserved).
    async fn count_by_email(&self, email: &str) -> anyhow::Result<i64>;

    /// Overwrite the stored refresh token.
    async fn set_token(&self, id: Uuid, token: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &NewUser, password_hash: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password AS password_hash, token,
                      created_at, created_by, modified_at, modified_by, deleted_at, deleted_by
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(db_error)?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password AS password_hash, token,
                   created_at, created_by, modified_at, modified_by, deleted_at, deleted_by
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password AS password_hash, token,
                   created_at, created_by, modified_at, modified_by, deleted_at, deleted_by
            FROM users
            WHERE token = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn count_by_email(&self, email: &str) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    async fn set_token(&self, id: Uuid, token: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET token = $2, modified_at = now()
             WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(token)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
