use crate::state::AppState;
use axum::{
    routing::{delete, get},
    Router,
};

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod service;

pub use service::DocumentKind;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/documents", get(handlers::list_documents))
        .route("/documents/:kind", delete(handlers::delete_document))
}
