use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::User;
use crate::documents::DocumentKind;

/// Full profile as returned by GET /profile and after updates.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub document_id: String,
    pub pan_number: String,
    pub aadhaar_number: String,
    pub address: String,
    pub id_document_uploaded: bool,
    pub pan_document_uploaded: bool,
    pub address_proof_uploaded: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            document_id: user.document_id.clone(),
            pan_number: user.pan_number.clone(),
            aadhaar_number: user.aadhaar_number.clone(),
            address: user.address.clone(),
            id_document_uploaded: DocumentKind::Id.key_of(user).is_some(),
            pan_document_uploaded: DocumentKind::Pan.key_of(user).is_some(),
            address_proof_uploaded: DocumentKind::Address.key_of(user).is_some(),
            date_joined: user.date_joined,
        }
    }
}

/// Parsed multipart body of a profile update. Absent fields stay
/// untouched; present files replace their slot.
#[derive(Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub document_id: Option<String>,
    pub pan_number: Option<String>,
    pub aadhaar_number: Option<String>,
    pub address: Option<String>,
    pub uploads: Vec<crate::documents::service::DocumentUpload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_response_reports_document_presence() {
        let user = User {
            id: Uuid::new_v4(),
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            password_hash: "argon2-hash".into(),
            full_name: "Jane Doe".into(),
            document_id: String::new(),
            pan_number: "AB123456".into(),
            aadhaar_number: String::new(),
            address: String::new(),
            id_document_key: None,
            pan_document_key: Some("documents/u/pan/x.png".into()),
            address_proof_key: None,
            is_active: true,
            is_staff: false,
            date_joined: OffsetDateTime::now_utc(),
        };

        let resp = ProfileResponse::from(&user);
        assert!(resp.pan_document_uploaded);
        assert!(!resp.id_document_uploaded);
        assert!(!resp.address_proof_uploaded);

        // the dashboard payload carries the flags, never the raw keys
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("pan_document_uploaded"));
        assert!(!json.contains("documents/u/pan"));
        assert!(!json.contains("argon2-hash"));
    }
}
