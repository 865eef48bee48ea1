use axum::{
    extract::{FromRef, State},
    routing::post,
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RefreshResponse, RegisterRequest},
        jwt::JwtKeys,
        services,
    },
    error::AppResult,
    response::{Created, Data},
    state::AppState,
    validation::JsonBody,
};

pub const REFRESH_COOKIE: &str = "refreshToken";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> AppResult<Created<PublicUser>> {
    let user = services::register(state.users.as_ref(), payload).await?;
    Ok(Created(user))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<(CookieJar, Data<LoginResponse>)> {
    let keys = JwtKeys::from_ref(&state);
    let outcome = services::login(state.users.as_ref(), &keys, payload).await?;

    let cookie = Cookie::build((REFRESH_COOKIE, outcome.refresh_token))
        .http_only(true)
        .secure(state.config.jwt.cookie_secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(keys.cookie_max_age());

    Ok((
        jar.add(cookie),
        Data::new(LoginResponse {
            name: outcome.user.name,
            email: outcome.user.email,
            token: outcome.access_token,
        }),
    ))
}

#[instrument(skip(state, jar))]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<Data<RefreshResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());
    let response =
        services::refresh_access_token(state.users.as_ref(), &keys, token.as_deref()).await?;
    Ok(Data::new(response))
}
