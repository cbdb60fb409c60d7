use std::path::Path;
use std::str::FromStr;

use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::auth::repo::User;
use crate::error::ApiError;
use crate::state::AppState;

use super::repo;

const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED_MIME: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];
const ALLOWED_EXT: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// The three document slots a user can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Id,
    Pan,
    Address,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [DocumentKind::Id, DocumentKind::Pan, DocumentKind::Address];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Id => "id",
            DocumentKind::Pan => "pan",
            DocumentKind::Address => "address",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Id => "ID Document",
            DocumentKind::Pan => "PAN / Tax",
            DocumentKind::Address => "Address Proof",
        }
    }

    /// The multipart form field carrying this document.
    pub fn field_name(&self) -> &'static str {
        match self {
            DocumentKind::Id => "id_document_photo",
            DocumentKind::Pan => "pan_document_photo",
            DocumentKind::Address => "address_proof_photo",
        }
    }

    /// The users column holding this document's storage key.
    pub fn column(&self) -> &'static str {
        match self {
            DocumentKind::Id => "id_document_key",
            DocumentKind::Pan => "pan_document_key",
            DocumentKind::Address => "address_proof_key",
        }
    }

    pub fn key_of<'a>(&self, user: &'a User) -> Option<&'a str> {
        match self {
            DocumentKind::Id => user.id_document_key.as_deref(),
            DocumentKind::Pan => user.pan_document_key.as_deref(),
            DocumentKind::Address => user.address_proof_key.as_deref(),
        }
    }
}

impl FromStr for DocumentKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(DocumentKind::Id),
            "pan" => Ok(DocumentKind::Pan),
            "address" => Ok(DocumentKind::Address),
            _ => Err(ApiError::InvalidDocumentKind),
        }
    }
}

/// A candidate file for one document slot, as parsed off the wire.
pub struct DocumentUpload {
    pub kind: DocumentKind,
    pub body: Bytes,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

/// Accept or reject an upload before it goes anywhere near storage.
/// Content-type and extension are checked independently; a missing one
/// never skips the other.
pub fn validate_image(
    field: &'static str,
    size: usize,
    content_type: Option<&str>,
    filename: Option<&str>,
) -> Result<(), ApiError> {
    if size > MAX_UPLOAD_BYTES {
        return Err(ApiError::FileTooLarge { field });
    }

    if let Some(ct) = content_type {
        if !ct.is_empty() && !ALLOWED_MIME.contains(&ct) {
            return Err(ApiError::UnsupportedType { field });
        }
    }

    if let Some(ext) = filename.and_then(extension_of) {
        if !ALLOWED_EXT.contains(&ext.as_str()) {
            return Err(ApiError::UnsupportedExtension { field });
        }
    }

    Ok(())
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Storage key for a document: namespaced by user and kind, with a random
/// filename so the original name never reaches the backend. Only the
/// extension survives, lowercased, `.bin` when there is none.
pub fn document_key(
    user_identifier: Option<&str>,
    kind: DocumentKind,
    original_filename: Option<&str>,
) -> String {
    let ext = original_filename
        .and_then(extension_of)
        .map(|e| format!(".{}", e))
        .unwrap_or_else(|| ".bin".to_string());
    let user_part = match user_identifier {
        Some(u) if !u.is_empty() => u,
        _ => "temp",
    };
    format!(
        "documents/{}/{}/{}{}",
        user_part,
        kind.as_str(),
        Uuid::new_v4().simple(),
        ext
    )
}

/// Remove the stored file for one document slot and clear the reference.
/// Returns false when the slot was already empty (which is not an error).
/// The column is cleared before the object is removed, so the reference
/// can never point at a missing object.
pub async fn delete_document(
    state: &AppState,
    user: &User,
    kind: DocumentKind,
) -> Result<bool, ApiError> {
    let Some(key) = kind.key_of(user) else {
        return Ok(false);
    };
    let key = key.to_string();

    repo::clear_document_key(&state.db, user.id, kind).await?;

    if state.storage.exists(&key).await? {
        state.storage.delete_object(&key).await?;
    }

    info!(user_id = %user.id, kind = kind.as_str(), key = %key, "document deleted");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_file_is_rejected() {
        let err = validate_image(
            "id_document_photo",
            6 * 1024 * 1024,
            Some("image/png"),
            Some("scan.png"),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::FileTooLarge { .. }));
    }

    #[test]
    fn exactly_five_mib_is_accepted() {
        assert!(validate_image(
            "id_document_photo",
            5 * 1024 * 1024,
            Some("image/png"),
            Some("scan.png")
        )
        .is_ok());
    }

    #[test]
    fn png_under_the_limit_is_accepted() {
        assert!(validate_image("id_document_photo", 1024, Some("image/png"), Some("a.png")).is_ok());
        assert!(
            validate_image("pan_document_photo", 1024, Some("image/jpeg"), Some("a.JPG")).is_ok()
        );
        assert!(
            validate_image("address_proof_photo", 1024, Some("image/webp"), Some("a.webp")).is_ok()
        );
    }

    #[test]
    fn executable_extension_is_rejected() {
        let err =
            validate_image("id_document_photo", 1024, Some("image/png"), Some("evil.exe"))
                .unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedExtension { .. }));
    }

    #[test]
    fn wrong_content_type_is_rejected() {
        let err = validate_image("id_document_photo", 1024, Some("application/pdf"), Some("a.png"))
            .unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedType { .. }));
    }

    #[test]
    fn extension_is_checked_even_without_content_type() {
        let err = validate_image("id_document_photo", 1024, None, Some("a.gif")).unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedExtension { .. }));
    }

    #[test]
    fn content_type_is_checked_even_without_filename() {
        let err = validate_image("id_document_photo", 1024, Some("text/html"), None).unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedType { .. }));
    }

    #[test]
    fn missing_metadata_passes() {
        assert!(validate_image("id_document_photo", 1024, None, None).is_ok());
        assert!(validate_image("id_document_photo", 1024, Some(""), Some("noext")).is_ok());
    }

    #[test]
    fn key_is_namespaced_by_user_and_kind() {
        let key = document_key(Some("u-123"), DocumentKind::Pan, Some("scan.PNG"));
        assert!(key.starts_with("documents/u-123/pan/"));
        assert!(key.ends_with(".png"));
        assert!(!key.contains("scan"));
    }

    #[test]
    fn key_defaults_to_bin_without_an_extension() {
        let key = document_key(Some("u-123"), DocumentKind::Id, Some("scan"));
        assert!(key.ends_with(".bin"));
        let key = document_key(Some("u-123"), DocumentKind::Id, None);
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn key_falls_back_to_temp_without_a_user() {
        let key = document_key(None, DocumentKind::Address, Some("a.jpg"));
        assert!(key.starts_with("documents/temp/address/"));
        let key = document_key(Some(""), DocumentKind::Address, Some("a.jpg"));
        assert!(key.starts_with("documents/temp/address/"));
    }

    #[test]
    fn keys_never_collide() {
        let a = document_key(Some("u"), DocumentKind::Id, Some("a.jpg"));
        let b = document_key(Some("u"), DocumentKind::Id, Some("a.jpg"));
        assert_ne!(a, b);
    }

    #[test]
    fn kind_parses_its_wire_names() {
        assert_eq!("id".parse::<DocumentKind>().unwrap(), DocumentKind::Id);
        assert_eq!("pan".parse::<DocumentKind>().unwrap(), DocumentKind::Pan);
        assert_eq!(
            "address".parse::<DocumentKind>().unwrap(),
            DocumentKind::Address
        );
        assert!(matches!(
            "passport".parse::<DocumentKind>(),
            Err(ApiError::InvalidDocumentKind)
        ));
    }

    #[tokio::test]
    async fn deleting_an_empty_slot_is_a_noop() {
        use time::OffsetDateTime;

        let state = crate::state::AppState::fake();
        let user = User {
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
        };

        let deleted = delete_document(&state, &user, DocumentKind::Pan)
            .await
            .expect("no-op delete should not error");
        assert!(!deleted);
    }
}
