use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CategoryListResponse, CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest},
    services,
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    pagination::ListQuery,
    response::{Created, Data, Message},
    state::AppState,
    validation::JsonBody,
};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

/// Ids that are not UUIDs cannot name a row.
fn category_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found(services::NOT_FOUND))
}

#[instrument(skip(state, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(payload): JsonBody<CreateCategoryRequest>,
) -> AppResult<Created<CategoryResponse>> {
    let category = services::create(state.categories.as_ref(), payload, user.id).await?;
    Ok(Created(category))
}

#[instrument(skip(state, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateCategoryRequest>,
) -> AppResult<Data<CategoryResponse>> {
    let id = category_id(&id)?;
    let category = services::update(state.categories.as_ref(), id, payload, user.id).await?;
    Ok(Data::new(category))
}

#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Data<CategoryResponse>> {
    let id = category_id(&id)?;
    let category = services::get_by_id(state.categories.as_ref(), id).await?;
    Ok(Data::new(category))
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Data<CategoryListResponse>> {
    let list = services::get_all(state.categories.as_ref(), &query).await?;
    Ok(Data::new(list))
}

#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Message> {
    let id = category_id(&id)?;
    services::delete(state.categories.as_ref(), id, user.id).await?;
    Ok(Message::new("Category deleted successfully"))
}
