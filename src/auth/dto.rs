use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::User;

/// Request body for signup.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Request body for login. `identifier` accepts a username or an email.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            date_joined: user.date_joined,
        }
    }
}
