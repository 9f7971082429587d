//! Authentication route handlers — registration, password login, JWT token, user info.
//!
//! Endpoints:
//! - `POST /api/v1/auth/register` — Create an account and issue a JWT
//! - `POST /api/v1/auth/login`    — Email/password login
//! - `POST /api/v1/auth/refresh`  — Issues a new JWT from a still-valid token
//! - `GET  /api/v1/auth/me`       — Returns the authenticated user (protected)
//! - `PUT  /api/v1/users/me`      — Update name and/or password (protected)

use crate::api::handlers::{AppError, PlatformState};
use crate::auth::extractor::AuthUser;
use crate::auth::jwt::{decode_jwt, encode_jwt};
use crate::store::models::User;
use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const BCRYPT_COST: u32 = 12;

// ============================================================================
// Request / Response types
// ============================================================================

/// Request body for POST /auth/register
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Request body for POST /auth/login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for POST /auth/refresh
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub token: String,
}

/// Request body for PUT /users/me. Omitted fields are left unchanged.
#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Response carrying a JWT and the user it identifies
#[derive(Serialize)]
pub struct AuthTokenResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Public user info (safe to send to client)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserResponse {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            name: u.name.clone(),
        }
    }
}

fn auth_config(state: &PlatformState) -> Result<&crate::AuthConfig, AppError> {
    state.auth_config.as_ref().ok_or_else(|| {
        AppError::Forbidden("Authentication not configured — access denied".to_string())
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register — Create an account and issue a JWT.
pub async fn register(
    State(state): State<PlatformState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    let config = auth_config(&state)?;
    if !config.allow_registration {
        return Err(AppError::Forbidden("Registration is disabled".to_string()));
    }

    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if state.store.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    let password_hash = bcrypt::hash(&req.password, BCRYPT_COST)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email,
        name: req.name.trim().to_string(),
        password_hash,
        created_at: now,
        updated_at: now,
    };
    state.store.create_user(&user).await?;
    tracing::info!(email = %user.email, "User registered");

    let token = encode_jwt(
        user.id,
        &user.email,
        &user.name,
        &config.jwt_secret,
        config.jwt_expiry_secs,
    )?;
    Ok(Json(AuthTokenResponse {
        token,
        user: UserResponse::from(&user),
    }))
}

/// POST /auth/login — Email/password login.
///
/// The failure message never says whether the email exists.
pub async fn login(
    State(state): State<PlatformState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    let config = auth_config(&state)?;
    let email = req.email.trim().to_lowercase();

    let user = state
        .store
        .get_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = bcrypt::verify(&req.password, &user.password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to verify password: {e}"))?;
    if !valid {
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = encode_jwt(
        user.id,
        &user.email,
        &user.name,
        &config.jwt_secret,
        config.jwt_expiry_secs,
    )?;
    Ok(Json(AuthTokenResponse {
        token,
        user: UserResponse::from(&user),
    }))
}

/// POST /auth/refresh — Exchange a still-valid token for a fresh one.
///
/// Stateless: an expired token cannot be refreshed, the user logs in again.
pub async fn refresh(
    State(state): State<PlatformState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    let config = auth_config(&state)?;

    let claims = decode_jwt(&req.token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
    let user_id: Uuid = claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("Invalid user ID in token".to_string()))?;

    // The user may have been deleted since the token was issued.
    let user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    let token = encode_jwt(
        user.id,
        &user.email,
        &user.name,
        &config.jwt_secret,
        config.jwt_expiry_secs,
    )?;
    Ok(Json(AuthTokenResponse {
        token,
        user: UserResponse::from(&user),
    }))
}

/// PUT /users/me — Update the caller's display name and/or password.
pub async fn update_me(
    State(state): State<PlatformState>,
    user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let mut record = state
        .store
        .get_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("Name must not be empty".to_string()));
        }
        record.name = name;
    }
    if let Some(password) = req.password {
        if password.len() < 8 {
            return Err(AppError::BadRequest(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        record.password_hash = bcrypt::hash(&password, BCRYPT_COST)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    }
    record.updated_at = Utc::now();

    state.store.update_user(&record).await?;
    tracing::info!(email = %record.email, "Profile updated");
    Ok(Json(UserResponse::from(&record)))
}

/// GET /auth/me — Returns the authenticated user.
pub async fn me(
    State(state): State<PlatformState>,
    user: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .store
        .get_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(UserResponse::from(&user)))
}
