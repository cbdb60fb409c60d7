use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, routing::get, Router};

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod service;
pub mod validate;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB, three 5MiB files + fields
}
