use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation::{
    validate_email, validate_hostel_block, validate_name, validate_password,
    validate_room_number,
};
use crate::config::AuthConfig;
use crate::db::{AuthResponse, DbPool, LoginRequest, NewUser, RegisterRequest, User, UserResponse};
use crate::AppState;

pub const ROLE_STUDENT: &str = "student";
pub const ROLE_ADMIN: &str = "admin";

/// Claims embedded in every session token.
///
/// Tokens are stateless: validity is signature plus expiry at verification
/// time, nothing is persisted or revoked server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — user ID
    pub sub: String,
    /// User role (`student` | `admin`)
    pub role: String,
    /// Issued-at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Sign a session token for a user
pub fn issue_token(
    user_id: &str,
    role: &str,
    config: &AuthConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(config.token_ttl_hours)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.token_secret.as_bytes()),
    )
}

/// Verify a session token, rejecting tampered, malformed, and expired tokens
pub fn verify_token(token: &str, config: &AuthConfig) -> Result<Claims, TokenError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.token_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })
}

/// Extract the bearer token from request headers
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// The authenticated caller, extracted from a verified bearer token.
///
/// Missing token rejects with 401; a present but invalid or expired token
/// rejects with 403.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Access denied"))?;

        let claims = verify_token(token, &state.config.auth)
            .map_err(|_| ApiError::forbidden("Invalid token"))?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

/// Middleware guarding admin routes: requires a valid token carrying the
/// admin role.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Access denied"))?;

    let claims = verify_token(token, &state.config.auth)
        .map_err(|_| ApiError::forbidden("Invalid token"))?;

    if claims.role != ROLE_ADMIN {
        return Err(ApiError::forbidden("Admin access required"));
    }

    Ok(next.run(request).await)
}

fn validate_register_request(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_name(&req.name) {
        errors.add("name", e);
    }
    if let Err(e) = validate_email(&req.email) {
        errors.add("email", e);
    }
    if let Err(e) = validate_password(&req.password) {
        errors.add("password", e);
    }
    if let Err(e) = validate_hostel_block(&req.hostel_block) {
        errors.add("hostelBlock", e);
    }
    if let Err(e) = validate_room_number(&req.room_number) {
        errors.add("roomNumber", e);
    }

    errors.finish()
}

/// Register endpoint
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    validate_register_request(&request)?;

    // A caller-supplied role is never trusted; admins come from startup
    // configuration only.
    if let Some(role) = request.role.as_deref() {
        if role != ROLE_STUDENT {
            tracing::warn!(email = %request.email, role = %role, "Ignoring caller-supplied role on registration");
        }
    }

    if User::find_by_email(&state.db, &request.email).await?.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }

    let password_hash = hash_password(&request.password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Registration failed")
    })?;

    let user = User::create(
        &state.db,
        NewUser {
            name: &request.name,
            email: &request.email,
            password_hash: &password_hash,
            role: ROLE_STUDENT,
            hostel_block: &request.hostel_block,
            room_number: &request.room_number,
        },
    )
    .await?;

    let token = issue_token(&user.id, &user.role, &state.config.auth).map_err(|e| {
        tracing::error!("Failed to sign token: {}", e);
        ApiError::internal("Registration failed")
    })?;

    tracing::info!(user_id = %user.id, email = %user.email, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserResponse::from(user),
        }),
    ))
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    // Absent user and wrong password take the same path: the caller cannot
    // tell which one failed.
    let user = User::find_by_email(&state.db, &request.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = issue_token(&user.id, &user.role, &state.config.auth).map_err(|e| {
        tracing::error!("Failed to sign token: {}", e);
        ApiError::internal("Login failed")
    })?;

    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// Ensure the configured admin user exists, creating it on first boot.
pub async fn ensure_admin_user(db: &DbPool, email: &str, password: &str) -> anyhow::Result<()> {
    if User::find_by_email(db, email).await?.is_some() {
        return Ok(());
    }

    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;

    User::create(
        db,
        NewUser {
            name: "Administrator",
            email,
            password_hash: &password_hash,
            role: ROLE_ADMIN,
            hostel_block: "-",
            room_number: "-",
        },
    )
    .await?;

    tracing::info!(email = %email, "Created admin user");
    Ok(())
}
