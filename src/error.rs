use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Field-scoped validation errors plus a catch-all for infrastructure
/// failures. Validation variants render as `{"field": .., "error": ..}`;
/// `Internal` never leaks backend detail to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("This field is required.")]
    Required(&'static str),
    #[error("A user with this username already exists.")]
    DuplicateUsername,
    #[error("A user with this email already exists.")]
    DuplicateEmail,
    #[error("150 characters or fewer. Letters, digits and @/./+/-/_ only.")]
    InvalidUsername,
    #[error("Enter a valid email address.")]
    InvalidEmail,
    #[error("{0}")]
    WeakPassword(&'static str),
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Invalid username/email or password.")]
    InvalidCredentials,
    #[error("This account is inactive.")]
    InactiveAccount,
    #[error("User not found.")]
    UserNotFound,
    #[error("Invalid or expired token.")]
    InvalidToken,
    #[error("PAN/Tax ID seems too short.")]
    InvalidPan,
    #[error("{0}")]
    InvalidAadhaar(&'static str),
    #[error("File too large (>5MB).")]
    FileTooLarge { field: &'static str },
    #[error("Only JPEG, PNG, or WEBP images are allowed.")]
    UnsupportedType { field: &'static str },
    #[error("Invalid file extension. Use JPEG, PNG, or WEBP.")]
    UnsupportedExtension { field: &'static str },
    #[error("Invalid document type.")]
    InvalidDocumentKind,
    #[error("operation failed")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use ApiError::*;
        match self {
            DuplicateUsername | DuplicateEmail => StatusCode::CONFLICT,
            InvalidCredentials | UserNotFound | InvalidToken => StatusCode::UNAUTHORIZED,
            InactiveAccount => StatusCode::FORBIDDEN,
            FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UnsupportedType { .. } | UnsupportedExtension { .. } => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// The form field this error belongs to, when there is one.
    pub fn field(&self) -> Option<&'static str> {
        use ApiError::*;
        match self {
            Required(field) => Some(*field),
            DuplicateUsername | InvalidUsername => Some("username"),
            DuplicateEmail | InvalidEmail => Some("email"),
            WeakPassword(_) => Some("password"),
            PasswordMismatch => Some("password_confirmation"),
            InvalidPan => Some("pan_number"),
            InvalidAadhaar(_) => Some("aadhaar_number"),
            FileTooLarge { field }
            | UnsupportedType { field }
            | UnsupportedExtension { field } => Some(*field),
            InvalidDocumentKind => Some("doc_type"),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            error!(error = %e, "internal error");
        }
        let body = match self.field() {
            Some(field) => json!({ "field": field, "error": self.to_string() }),
            None => json!({ "error": self.to_string() }),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_errors_are_conflicts_scoped_to_their_field() {
        assert_eq!(ApiError::DuplicateUsername.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::DuplicateUsername.field(), Some("username"));
        assert_eq!(ApiError::DuplicateEmail.field(), Some("email"));
    }

    #[test]
    fn credential_errors_carry_no_field() {
        assert_eq!(ApiError::InvalidCredentials.field(), None);
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::InactiveAccount.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn upload_errors_point_at_the_offending_field() {
        let e = ApiError::FileTooLarge {
            field: "id_document_photo",
        };
        assert_eq!(e.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(e.field(), Some("id_document_photo"));
    }

    #[test]
    fn internal_errors_hide_their_cause() {
        let e = ApiError::Internal(anyhow::anyhow!("connection refused"));
        assert_eq!(e.to_string(), "operation failed");
        assert_eq!(e.field(), None);
    }
}
