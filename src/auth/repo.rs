use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub full_name: String,
    pub document_id: String,
    pub pan_number: String,
    pub aadhaar_number: String,
    pub address: String,
    pub id_document_key: Option<String>,
    pub pan_document_key: Option<String>,
    pub address_proof_key: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: OffsetDateTime,
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub full_name: &'a str,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, document_id, \
    pan_number, aadhaar_number, address, id_document_key, pan_document_key, \
    address_proof_key, is_active, is_staff, date_joined";

impl User {
    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    /// Create a new user. Username/email uniqueness is enforced by the
    /// database constraints; a violation surfaces as the matching field
    /// error rather than a 500, so pre-checks cannot race with the write.
    pub async fn create(db: &PgPool, new: NewUser<'_>) -> Result<User, ApiError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, full_name) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(new.username)
            .bind(new.email)
            .bind(new.password_hash)
            .bind(new.full_name)
            .fetch_one(db)
            .await
            .map_err(map_unique_violation)?;
        Ok(user)
    }
}

fn map_unique_violation(e: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.code().as_deref() == Some("23505") {
            match db_err.constraint() {
                Some("users_username_key") => return ApiError::DuplicateUsername,
                Some("users_email_key") => return ApiError::DuplicateEmail,
                _ => {}
            }
        }
    }
    ApiError::Internal(e.into())
}

/// Mark a refresh token as revoked. Revoking twice is a no-op.
pub async fn revoke_jti(db: &PgPool, jti: Uuid) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO revoked_tokens (jti) VALUES ($1) ON CONFLICT (jti) DO NOTHING")
        .bind(jti)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn is_jti_revoked(db: &PgPool, jti: Uuid) -> anyhow::Result<bool> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT jti FROM revoked_tokens WHERE jti = $1")
            .bind(jti)
            .fetch_optional(db)
            .await?;
    Ok(row.is_some())
}
