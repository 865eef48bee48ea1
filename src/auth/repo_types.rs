use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,          // Argon2 PHC string, never serialized
    pub token: Option<String>,          // current refresh token, one per user
    pub created_at: OffsetDateTime,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<OffsetDateTime>,
    pub modified_by: Option<Uuid>,
    pub deleted_at: Option<OffsetDateTime>,
    pub deleted_by: Option<Uuid>,
}
