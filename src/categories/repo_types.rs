use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<OffsetDateTime>,
    pub modified_by: Option<Uuid>,
    pub deleted_at: Option<OffsetDateTime>,
    pub deleted_by: Option<Uuid>,
}

impl Category {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
