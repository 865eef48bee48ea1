use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::repo_types::Category;
use crate::validation::{trimmed, Schema};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "name is required"),
        length(min = 2, max = 255, message = "name must be between 2 and 255 characters")
    )]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 2, max = 255, message = "name must be between 2 and 255 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
}

impl Schema for CreateCategoryRequest {
    type Output = NewCategory;

    fn narrow(self) -> NewCategory {
        NewCategory {
            name: self.name.unwrap_or_default(),
        }
    }
}

impl Schema for UpdateCategoryRequest {
    type Output = CategoryChanges;

    fn narrow(self) -> CategoryChanges {
        CategoryChanges { name: self.name }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub created_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub modified_at: Option<OffsetDateTime>,
    pub modified_by: Option<Uuid>,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            created_at: c.created_at,
            created_by: c.created_by,
            modified_at: c.modified_at,
            modified_by: c.modified_by,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<CategoryResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}
