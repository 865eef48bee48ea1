use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CategoryListResponse, CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest},
    repo::CategoryRepository,
};
use crate::{
    error::{AppError, AppResult},
    pagination::ListQuery,
    validation::validate,
};

pub const NOT_FOUND: &str = "Category not found";
const NAME_TAKEN: &str = "Category name already exists";

#[instrument(skip(repo, request))]
pub async fn create(
    repo: &dyn CategoryRepository,
    request: CreateCategoryRequest,
    actor: Uuid,
) -> AppResult<CategoryResponse> {
    let new_category = validate(request)?;

    if repo.count_by_name(&new_category.name, None).await? != 0 {
        warn!(name = %new_category.name, "category name taken");
        return Err(AppError::conflict(NAME_TAKEN));
    }

    let category = repo
        .create(&new_category, actor)
        .await
        .map_err(|e| AppError::unique_or_internal(e, NAME_TAKEN))?;
    info!(category_id = %category.id, "category created");
    Ok(category.into())
}

#[instrument(skip(repo, request))]
pub async fn update(
    repo: &dyn CategoryRepository,
    id: Uuid,
    request: UpdateCategoryRequest,
    actor: Uuid,
) -> AppResult<CategoryResponse> {
    let changes = validate(request)?;

    if repo.find_by_id(id).await?.is_none() {
        return Err(AppError::not_found(NOT_FOUND));
    }

    if let Some(name) = changes.name.as_deref() {
        if repo.count_by_name(name, Some(id)).await? != 0 {
            warn!(name = %name, "category name taken");
            return Err(AppError::conflict(NAME_TAKEN));
        }
    }

    repo.update(id, &changes, actor)
        .await
        .map_err(|e| AppError::unique_or_internal(e, NAME_TAKEN))?;

    // Read back so server-side fields such as modified_at are current.
    let category = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    info!(category_id = %id, "category updated");
    Ok(category.into())
}

#[instrument(skip(repo))]
pub async fn get_by_id(repo: &dyn CategoryRepository, id: Uuid) -> AppResult<CategoryResponse> {
    repo.find_by_id(id)
        .await?
        .map(Into::into)
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

#[instrument(skip(repo))]
pub async fn get_all(
    repo: &dyn CategoryRepository,
    query: &ListQuery,
) -> AppResult<CategoryListResponse> {
    let page = query.page_request();
    let filter = query.name_filter();

    let rows = repo.find_many(filter.as_deref(), page).await?;
    let total = repo.count(filter.as_deref()).await?;

    Ok(CategoryListResponse {
        categories: rows.into_iter().map(Into::into).collect(),
        total,
        page: page.page,
        limit: page.limit,
    })
}

/// Stamps `deleted_by`, then soft-deletes. Two separate statements; products that
/// reference the category are left as they are.
#[instrument(skip(repo))]
pub async fn delete(repo: &dyn CategoryRepository, id: Uuid, actor: Uuid) -> AppResult<()> {
    if repo.find_by_id(id).await?.is_none() {
        return Err(AppError::not_found(NOT_FOUND));
    }

    repo.stamp_deleted_by(id, actor).await?;
    repo.soft_delete(id).await?;
    info!(category_id = %id, "category deleted");
    Ok(())
}
