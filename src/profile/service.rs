use tracing::warn;

use crate::{
    auth::repo::User,
    documents::{
        repo as documents_repo,
        service::{document_key, validate_image, DocumentKind, DocumentUpload},
    },
    error::ApiError,
    state::AppState,
};

use super::{
    dto::ProfileUpdate,
    repo::{self, ProfileFields},
    validate::{normalize_aadhaar, normalize_pan},
};

/// Apply a profile update all-or-nothing: every field and file is
/// validated before anything is persisted. New objects are stored first,
/// then the row is updated in one transaction; replaced objects are only
/// removed after the commit, so a failure can orphan an object but never
/// break a reference.
pub async fn update_profile(
    state: &AppState,
    user: &User,
    update: ProfileUpdate,
) -> Result<User, ApiError> {
    let full_name = match &update.full_name {
        Some(v) => {
            let v = v.trim();
            if v.is_empty() {
                return Err(ApiError::Required("full_name"));
            }
            Some(v.to_string())
        }
        None => None,
    };
    let pan = update
        .pan_number
        .as_deref()
        .map(normalize_pan)
        .transpose()?;
    let aadhaar = update
        .aadhaar_number
        .as_deref()
        .map(normalize_aadhaar)
        .transpose()?;

    for up in &update.uploads {
        validate_image(
            up.kind.field_name(),
            up.body.len(),
            up.content_type.as_deref(),
            up.filename.as_deref(),
        )?;
    }

    // one object per slot: repeated parts for a kind keep only the last
    let uploads = dedupe_by_kind(update.uploads);

    let user_part = user.id.to_string();
    let mut stored: Vec<(DocumentKind, String)> = Vec::with_capacity(uploads.len());
    for up in uploads {
        let key = document_key(Some(&user_part), up.kind, up.filename.as_deref());
        let content_type = up
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".into());
        if let Err(e) = state.storage.put_object(&key, up.body, &content_type).await {
            remove_stored(state, &stored).await;
            return Err(ApiError::Internal(e));
        }
        stored.push((up.kind, key));
    }

    let fields = ProfileFields {
        full_name: full_name.as_deref(),
        document_id: update.document_id.as_deref(),
        pan_number: pan.as_deref(),
        aadhaar_number: aadhaar.as_deref(),
        address: update.address.as_deref(),
    };
    let committed = async {
        let mut tx = state.db.begin().await?;
        repo::update_fields_tx(&mut tx, user.id, &fields).await?;
        for (kind, key) in &stored {
            documents_repo::set_document_key_tx(&mut tx, user.id, *kind, key).await?;
        }
        tx.commit().await?;
        anyhow::Ok(())
    }
    .await;
    if let Err(e) = committed {
        remove_stored(state, &stored).await;
        return Err(ApiError::Internal(e));
    }

    for (kind, _) in &stored {
        if let Some(old_key) = kind.key_of(user) {
            remove_if_present(state, old_key).await;
        }
    }

    let updated = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or(ApiError::UserNotFound)?;
    Ok(updated)
}

fn dedupe_by_kind(uploads: Vec<DocumentUpload>) -> Vec<DocumentUpload> {
    let mut out: Vec<DocumentUpload> = Vec::with_capacity(uploads.len());
    for up in uploads {
        out.retain(|u| u.kind != up.kind);
        out.push(up);
    }
    out
}

/// Best-effort cleanup of objects stored before a failed update.
async fn remove_stored(state: &AppState, stored: &[(DocumentKind, String)]) {
    for (_, key) in stored {
        if let Err(e) = state.storage.delete_object(key).await {
            warn!(key = %key, error = %e, "failed to clean up stored object");
        }
    }
}

async fn remove_if_present(state: &AppState, key: &str) {
    match state.storage.exists(key).await {
        Ok(true) => {
            if let Err(e) = state.storage.delete_object(key).await {
                warn!(key = %key, error = %e, "failed to remove replaced object");
            }
        }
        Ok(false) => {}
        Err(e) => warn!(key = %key, error = %e, "failed to check replaced object"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::documents::service::DocumentUpload;
    use crate::storage::MemoryStorage;

    use super::*;

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            password_hash: "hash".into(),
            full_name: "Jane Doe".into(),
            document_id: String::new(),
            pan_number: String::new(),
            aadhaar_number: String::new(),
            address: String::new(),
            id_document_key: None,
            pan_document_key: None,
            address_proof_key: None,
            is_active: true,
            is_staff: false,
            date_joined: OffsetDateTime::now_utc(),
        }
    }

    fn state_with_memory_storage() -> (AppState, Arc<MemoryStorage>) {
        let mem = Arc::new(MemoryStorage::default());
        let fake = AppState::fake();
        let state = AppState::from_parts(fake.db.clone(), fake.config.clone(), mem.clone());
        (state, mem)
    }

    fn png_upload(kind: DocumentKind) -> DocumentUpload {
        DocumentUpload {
            kind,
            body: Bytes::from_static(b"fake image bytes"),
            content_type: Some("image/png".into()),
            filename: Some("scan.png".into()),
        }
    }

    #[tokio::test]
    async fn invalid_pan_rejects_the_whole_update() {
        let (state, mem) = state_with_memory_storage();
        let update = ProfileUpdate {
            pan_number: Some("AB12".into()),
            uploads: vec![png_upload(DocumentKind::Id)],
            ..Default::default()
        };

        let err = update_profile(&state, &test_user(), update)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidPan));
        // nothing must reach storage when any field fails
        assert!(mem.keys().is_empty());
    }

    #[tokio::test]
    async fn invalid_upload_rejects_the_whole_update() {
        let (state, mem) = state_with_memory_storage();
        let bad = DocumentUpload {
            kind: DocumentKind::Address,
            body: Bytes::from_static(b"x"),
            content_type: Some("image/png".into()),
            filename: Some("proof.exe".into()),
        };
        let update = ProfileUpdate {
            full_name: Some("New Name".into()),
            uploads: vec![png_upload(DocumentKind::Id), bad],
            ..Default::default()
        };

        let err = update_profile(&state, &test_user(), update)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedExtension { .. }));
        assert!(mem.keys().is_empty());
    }

    #[test]
    fn duplicate_kinds_keep_only_the_last_upload() {
        let first = DocumentUpload {
            kind: DocumentKind::Id,
            body: Bytes::from_static(b"first"),
            content_type: Some("image/png".into()),
            filename: Some("a.png".into()),
        };
        let second = DocumentUpload {
            kind: DocumentKind::Id,
            body: Bytes::from_static(b"second"),
            content_type: Some("image/jpeg".into()),
            filename: Some("b.jpg".into()),
        };
        let out = dedupe_by_kind(vec![first, second, png_upload(DocumentKind::Pan)]);

        assert_eq!(out.len(), 2);
        let id = out.iter().find(|u| u.kind == DocumentKind::Id).unwrap();
        assert_eq!(id.body.as_ref(), b"second");
        assert!(out.iter().any(|u| u.kind == DocumentKind::Pan));
    }

    #[tokio::test]
    async fn blank_full_name_is_rejected() {
        let (state, _) = state_with_memory_storage();
        let update = ProfileUpdate {
            full_name: Some("   ".into()),
            ..Default::default()
        };
        let err = update_profile(&state, &test_user(), update)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Required("full_name")));
    }
}
