use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Product record. `price` is NUMERIC(10,2) in the table and read back as FLOAT8.
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub stock: i32,
    pub category_id: Uuid,
    pub created_at: OffsetDateTime,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<OffsetDateTime>,
    pub modified_by: Option<Uuid>,
    pub deleted_at: Option<OffsetDateTime>,
    pub deleted_by: Option<Uuid>,
}

/// Product joined with the id and name of its live category, if any.
#[derive(Debug, Clone, FromRow)]
pub struct ProductWithCategory {
    #[sqlx(flatten)]
    pub product: Product,
    pub category_ref_id: Option<Uuid>,
    pub category_name: Option<String>,
}
