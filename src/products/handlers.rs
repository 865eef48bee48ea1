use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateProductRequest, ProductListResponse, ProductResponse, UpdateProductRequest},
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

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

fn product_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found(services::NOT_FOUND))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(payload): JsonBody<CreateProductRequest>,
) -> AppResult<Created<ProductResponse>> {
    let product = services::create(
        state.products.as_ref(),
        state.categories.as_ref(),
        payload,
        user.id,
    )
    .await?;
    Ok(Created(product))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateProductRequest>,
) -> AppResult<Data<ProductResponse>> {
    let id = product_id(&id)?;
    let product = services::update(
        state.products.as_ref(),
        state.categories.as_ref(),
        id,
        payload,
        user.id,
    )
    .await?;
    Ok(Data::new(product))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Data<ProductResponse>> {
    let id = product_id(&id)?;
    let product = services::get_by_id(state.products.as_ref(), id).await?;
    Ok(Data::new(product))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Data<ProductListResponse>> {
    let list = services::get_all(state.products.as_ref(), &query).await?;
    Ok(Data::new(list))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Message> {
    let id = product_id(&id)?;
    services::delete(state.products.as_ref(), id, user.id).await?;
    Ok(Message::new("Product deleted successfully"))
}
