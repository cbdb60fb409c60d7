use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, SignupRequest},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, validate_strength, verify_password, DUMMY_HASH},
        repo::{self, NewUser, User},
        validate::{is_valid_email, is_valid_username, normalize_email},
    },
    error::ApiError,
    profile::dto::ProfileResponse,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

/// Create an account. Succeeding does not log the user in; the client is
/// expected to follow up with a login call.
#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    payload.full_name = payload.full_name.trim().to_string();
    payload.username = payload.username.trim().to_string();
    payload.email = normalize_email(&payload.email);

    if payload.full_name.is_empty() {
        return Err(ApiError::Required("full_name"));
    }
    if payload.username.is_empty() {
        return Err(ApiError::Required("username"));
    }
    if !is_valid_username(&payload.username) {
        warn!(username = %payload.username, "invalid username");
        return Err(ApiError::InvalidUsername);
    }
    if payload.email.is_empty() {
        return Err(ApiError::Required("email"));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::InvalidEmail);
    }
    validate_strength(&payload.password)?;
    if payload.password != payload.password_confirmation {
        return Err(ApiError::PasswordMismatch);
    }

    // Friendly pre-checks; the DB constraints remain the source of truth.
    if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        warn!(username = %payload.username, "username already taken");
        return Err(ApiError::DuplicateUsername);
    }
    if User::find_by_email(&state.db, &payload.email)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::DuplicateEmail);
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        NewUser {
            username: &payload.username,
            email: &payload.email,
            password_hash: &hash,
            full_name: &payload.full_name,
        },
    )
    .await?;

    info!(user_id = %user.id, username = %user.username, "user signed up");
    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))))
}

/// Log in with a username or an email. Unknown identifier and wrong
/// password produce the same error, so callers cannot enumerate accounts.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.identifier = payload.identifier.trim().to_string();

    // usernames are case-sensitive; the email fallback goes through the
    // same normalization signup stored with
    let user = match User::find_by_username(&state.db, &payload.identifier).await? {
        Some(u) => Some(u),
        None => User::find_by_email(&state.db, &normalize_email(&payload.identifier)).await?,
    };

    let Some(user) = user else {
        // burn a hash check so a miss takes as long as a wrong password
        let _ = verify_password(&payload.password, &DUMMY_HASH);
        warn!(identifier = %payload.identifier, "login unknown identifier");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on inactive account");
        return Err(ApiError::InactiveAccount);
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(&user),
    }))
}

/// Exchange a refresh token for a fresh pair. The presented token is
/// revoked in the same call, so each refresh token is single-use.
#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| ApiError::InvalidToken)?;

    if repo::is_jti_revoked(&state.db, claims.jti).await? {
        warn!(user_id = %claims.sub, "refresh with revoked token");
        return Err(ApiError::InvalidToken);
    }
    repo::revoke_jti(&state.db, claims.jti).await?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(ApiError::UserNotFound)?;
    if !user.is_active {
        return Err(ApiError::InactiveAccount);
    }

    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(&user),
    }))
}

/// Terminate the session by revoking the refresh token. Access tokens
/// stay valid until they expire; clients drop them on logout.
#[instrument(skip(state, payload))]
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<StatusCode, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| ApiError::InvalidToken)?;

    repo::revoke_jti(&state.db, claims.jti).await?;
    info!(user_id = %claims.sub, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// Dashboard payload: the full profile, including which document slots
/// are filled.
#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;
    Ok(Json(ProfileResponse::from(&user)))
}
