use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info};

use foodgram_types::api::{LoginRequest, LoginResponse, SetPasswordRequest};

use crate::error::ApiError;
use crate::extract::Json;
use crate::middleware::{AuthUser, Claims};
use crate::state::{AppState, blocking};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// POST /auth/token/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let user = blocking(&state, move |s| s.db.get_credentials_by_email(&email))
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    verify_password(&req.password, &user.password)?;

    let token = create_token(&state.jwt_secret, state.token_ttl, user.id, &user.email).map_err(|e| {
        error!("Failed to sign token: {}", e);
        ApiError::Internal
    })?;

    info!("User {} logged in", user.id);
    Ok(Json(LoginResponse { auth_token: token }))
}

/// POST /users/set_password
pub async fn set_password(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(req): Json<SetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_password_strength(&req.new_password)?;

    let user_id = caller.id();
    let current = blocking(&state, move |s| s.db.get_password_hash(user_id)).await?;
    verify_password(&req.current_password, &current)?;

    let new_hash = hash_password(&req.new_password)?;
    blocking(&state, move |s| s.db.set_password(user_id, &new_hash)).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn check_password_strength(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Hash with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::Internal
        })
}

fn verify_password(password: &str, stored_hash: &str) -> Result<(), ApiError> {
    let parsed_hash = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Stored password hash is unreadable: {}", e);
        ApiError::Internal
    })?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)
}

pub fn create_token(
    secret: &str,
    ttl: chrono::Duration,
    user_id: i64,
    email: &str,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
