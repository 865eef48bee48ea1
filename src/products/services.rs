use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateProductRequest, ProductListResponse, ProductResponse, UpdateProductRequest},
    repo::{ProductInsert, ProductRepository, ProductUpdate},
};
use crate::{
    categories::repo::CategoryRepository,
    error::{AppError, AppResult},
    pagination::ListQuery,
    validation::validate,
};

pub const NOT_FOUND: &str = "Product not found";
const CATEGORY_NOT_FOUND: &str = "Category not found";

/// Resolves a raw category reference to a live category id, or fails with 400.
async fn resolve_category(categories: &dyn CategoryRepository, raw: &str) -> AppResult<Uuid> {
    let Ok(id) = Uuid::parse_str(raw) else {
        warn!(category_id = %raw, "category reference is not a uuid");
        return Err(AppError::bad_request(CATEGORY_NOT_FOUND));
    };
    match categories.find_by_id(id).await? {
        Some(category) => Ok(category.id),
        None => {
            warn!(category_id = %id, "category reference does not resolve");
            Err(AppError::bad_request(CATEGORY_NOT_FOUND))
        }
    }
}

#[instrument(skip(products, categories, request))]
pub async fn create(
    products: &dyn ProductRepository,
    categories: &dyn CategoryRepository,
    request: CreateProductRequest,
    actor: Uuid,
) -> AppResult<ProductResponse> {
    let new_product = validate(request)?;
    let category_id = resolve_category(categories, &new_product.category_id).await?;

    let insert = ProductInsert {
        name: new_product.name,
        price: new_product.price,
        stock: new_product.stock,
        category_id,
    };
    let product = products.create(&insert, actor).await?;
    info!(product_id = %product.id, %category_id, "product created");
    Ok(product.into())
}

#[instrument(skip(products, categories, request))]
pub async fn update(
    products: &dyn ProductRepository,
    categories: &dyn CategoryRepository,
    id: Uuid,
    request: UpdateProductRequest,
    actor: Uuid,
) -> AppResult<ProductResponse> {
    let changes = validate(request)?;

    if products.find_by_id(id).await?.is_none() {
        return Err(AppError::not_found(NOT_FOUND));
    }

    let category_id = match changes.category_id.as_deref() {
        Some(raw) => Some(resolve_category(categories, raw).await?),
        None => None,
    };

    let update = ProductUpdate {
        name: changes.name,
        price: changes.price,
        stock: changes.stock,
        category_id,
    };
    products.update(id, &update, actor).await?;

    let product = products
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    info!(product_id = %id, "product updated");
    Ok(product.into())
}

#[instrument(skip(products))]
pub async fn get_by_id(products: &dyn ProductRepository, id: Uuid) -> AppResult<ProductResponse> {
    products
        .find_with_category(id)
        .await?
        .map(Into::into)
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

#[instrument(skip(products))]
pub async fn get_all(
    products: &dyn ProductRepository,
    query: &ListQuery,
) -> AppResult<ProductListResponse> {
    let page = query.page_request();
    let rows = products.find_many(page).await?;
    let total = products.count().await?;

    Ok(ProductListResponse {
        products: rows.into_iter().map(Into::into).collect(),
        total,
        page: page.page,
        limit: page.limit,
    })
}

/// Same two-step soft delete as categories.
#[instrument(skip(products))]
pub async fn delete(products: &dyn ProductRepository, id: Uuid, actor: Uuid) -> AppResult<()> {
    if products.find_by_id(id).await?.is_none() {
        return Err(AppError::not_found(NOT_FOUND));
    }

    products.stamp_deleted_by(id, actor).await?;
    products.soft_delete(id).await?;
    info!(product_id = %id, "product deleted");
    Ok(())
}
