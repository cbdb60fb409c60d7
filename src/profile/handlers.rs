use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::instrument;

use crate::{
    auth::{jwt::AuthUser, repo::User},
    documents::service::{DocumentKind, DocumentUpload},
    error::ApiError,
    state::AppState,
};

use super::{
    dto::{ProfileResponse, ProfileUpdate},
    service,
};

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;
    Ok(Json(ProfileResponse::from(&user)))
}

/// Multipart profile update: text fields plus up to three document
/// files, applied all-or-nothing.
#[instrument(skip(state, mp))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    let mut update = ProfileUpdate::default();
    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        match name.as_str() {
            "full_name" => update.full_name = Some(field.text().await.map_err(bad_multipart)?),
            "document_id" => {
                update.document_id = Some(field.text().await.map_err(bad_multipart)?)
            }
            "pan_number" => update.pan_number = Some(field.text().await.map_err(bad_multipart)?),
            "aadhaar_number" => {
                update.aadhaar_number = Some(field.text().await.map_err(bad_multipart)?)
            }
            "address" => update.address = Some(field.text().await.map_err(bad_multipart)?),
            other => {
                let Some(kind) = DocumentKind::ALL
                    .into_iter()
                    .find(|k| k.field_name() == other)
                else {
                    continue; // unknown fields are ignored
                };
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let body = field.bytes().await.map_err(bad_multipart)?;
                // browsers send an empty part for untouched file inputs
                if body.is_empty() && filename.as_deref().map_or(true, str::is_empty) {
                    continue;
                }
                update.uploads.push(DocumentUpload {
                    kind,
                    body,
                    content_type,
                    filename,
                });
            }
        }
    }

    let updated = service::update_profile(&state, &user, update).await?;
    Ok(Json(ProfileResponse::from(&updated)))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Internal(anyhow::anyhow!("multipart: {e}"))
}
