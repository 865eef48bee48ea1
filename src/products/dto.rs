use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::repo_types::{Product, ProductWithCategory};
use crate::validation::{trimmed, Schema};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(
        required(message = "name is required"),
        length(min = 2, max = 255, message = "name must be between 2 and 255 characters")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "price is required"),
        range(
            min = 0.0,
            max = 99_999_999.99,
            message = "price must be between 0 and 99999999.99"
        )
    )]
    pub price: Option<f64>,
    #[validate(range(min = 0, message = "stock must be greater than or equal to 0"))]
    pub stock: Option<i32>,
    #[serde(rename = "categoryId")]
    #[validate(
        required(message = "categoryId is required"),
        length(min = 1, message = "categoryId must not be empty")
    )]
    pub category_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 2, max = 255, message = "name must be between 2 and 255 characters"))]
    pub name: Option<String>,
    // Upper bound is the largest NUMERIC(10, 2).
    #[validate(range(
        min = 0.0,
        max = 99_999_999.99,
        message = "price must be between 0 and 99999999.99"
    ))]
    pub price: Option<f64>,
    #[validate(range(min = 0, message = "stock must be greater than or equal to 0"))]
    pub stock: Option<i32>,
    #[serde(rename = "categoryId")]
    #[validate(length(min = 1, message = "categoryId must not be empty"))]
    pub category_id: Option<String>,
}

/// Validated create command. `category_id` is still the raw reference; it is
/// resolved against live categories by the service.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub stock: i32,
    pub category_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    pub category_id: Option<String>,
}

impl Schema for CreateProductRequest {
    type Output = NewProduct;

    fn narrow(self) -> NewProduct {
        NewProduct {
            name: self.name.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            stock: self.stock.unwrap_or(0),
            category_id: self.category_id.unwrap_or_default(),
        }
    }
}

impl Schema for UpdateProductRequest {
    type Output = ProductChanges;

    fn narrow(self) -> ProductChanges {
        ProductChanges {
            name: self.name,
            price: self.price,
            stock: self.stock,
            category_id: self.category_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub stock: i32,
    #[serde(rename = "categoryId")]
    pub category_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategorySummary>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub created_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub modified_at: Option<OffsetDateTime>,
    pub modified_by: Option<Uuid>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            price: p.price,
            stock: p.stock,
            category_id: p.category_id,
            category: None,
            created_at: p.created_at,
            created_by: p.created_by,
            modified_at: p.modified_at,
            modified_by: p.modified_by,
        }
    }
}

impl From<ProductWithCategory> for ProductResponse {
    fn from(row: ProductWithCategory) -> Self {
        let category = match (row.category_ref_id, row.category_name) {
            (Some(id), Some(name)) => Some(CategorySummary { id, name }),
            _ => None,
        };
        Self {
            category,
            ..row.product.into()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}
