use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

use crate::error::ApiError;

const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

lazy_static! {
    /// Verified against when no account matches a login identifier, so
    /// the miss path costs the same as a wrong-password check.
    pub static ref DUMMY_HASH: String =
        hash_password("docvault-dummy-credential").expect("argon2 default params");
}

/// Enforce the signup password policy. Each failed rule keeps its own
/// message so the form can tell the user what is missing.
pub fn validate_strength(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::WeakPassword(
            "Password must be at least 8 characters long.",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ApiError::WeakPassword(
            "Password must contain at least one uppercase letter.",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ApiError::WeakPassword(
            "Password must contain at least one lowercase letter.",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::WeakPassword(
            "Password must contain at least one number.",
        ));
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(ApiError::WeakPassword(
            "Password must contain at least one special character.",
        ));
    }
    Ok(())
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "Correct-Horse7!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("Wrong-Horse7!", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn dummy_hash_is_a_real_hash_that_matches_nothing() {
        assert!(!verify_password("anything", &DUMMY_HASH).expect("dummy hash must parse"));
    }

    #[test]
    fn strength_accepts_a_compliant_password() {
        assert!(validate_strength("Abcdef1!").is_ok());
    }

    #[test]
    fn strength_rejects_each_missing_rule() {
        // too short
        assert!(validate_strength("Ab1!").is_err());
        // no uppercase
        assert!(validate_strength("abcdef1!").is_err());
        // no lowercase
        assert!(validate_strength("ABCDEF1!").is_err());
        // no digit
        assert!(validate_strength("Abcdefg!").is_err());
        // no special character
        assert!(validate_strength("Abcdefg1").is_err());
    }

    #[test]
    fn strength_failures_are_weak_password_errors() {
        let err = validate_strength("short").unwrap_err();
        assert!(matches!(&err, ApiError::WeakPassword(_)));
        assert_eq!(err.field(), Some("password"));
    }
}
