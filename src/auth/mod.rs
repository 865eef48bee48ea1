use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use extractors::{require_auth, AuthUser};

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
