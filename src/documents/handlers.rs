use axum::{
    extract::{Path, State},
    Json,
};
use tracing::instrument;

use crate::{
    auth::{jwt::AuthUser, repo::User},
    error::ApiError,
    state::AppState,
};

use super::{
    dto::{DocumentEntry, DocumentList},
    service::{self, DocumentKind},
};

const PRESIGN_TTL_SECS: u64 = 600;

async fn load_user(state: &AppState, user_id: uuid::Uuid) -> Result<User, ApiError> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::UserNotFound)
}

async fn build_list(state: &AppState, user: &User) -> Result<DocumentList, ApiError> {
    let mut documents = Vec::with_capacity(DocumentKind::ALL.len());
    for kind in DocumentKind::ALL {
        let url = match kind.key_of(user) {
            Some(key) => Some(state.storage.presign_get(key, PRESIGN_TTL_SECS).await?),
            None => None,
        };
        documents.push(DocumentEntry {
            kind: kind.as_str(),
            label: kind.label(),
            uploaded: url.is_some(),
            url,
        });
    }
    Ok(DocumentList { documents })
}

#[instrument(skip(state))]
pub async fn list_documents(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<DocumentList>, ApiError> {
    let user = load_user(&state, user_id).await?;
    Ok(Json(build_list(&state, &user).await?))
}

/// Delete one document slot and answer with the updated list. Unknown
/// kinds fail before anything is touched; an empty slot deletes as a
/// no-op.
#[instrument(skip(state))]
pub async fn delete_document(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(kind): Path<String>,
) -> Result<Json<DocumentList>, ApiError> {
    let kind: DocumentKind = kind.parse()?;
    let user = load_user(&state, user_id).await?;

    service::delete_document(&state, &user, kind).await?;

    let user = load_user(&state, user_id).await?;
    Ok(Json(build_list(&state, &user).await?))
}
