use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::db::{
    timestamp, LoginRequest, LoginResponse, RegisterRequest, User, UserRepo, UserResponse,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::ApiJson;
use super::validation::{validate_email, validate_username};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt_bytes: [u8; 16] = rand::rng().random();
    let salt = SaltString::encode_b64(&salt_bytes)?;
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

/// Generate a random token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Expiry of a token issued at `issued_at`, `None` when out of range
fn token_expiry(
    issued_at: chrono::DateTime<chrono::Utc>,
    ttl_hours: i64,
) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::Duration::try_hours(ttl_hours).and_then(|ttl| issued_at.checked_add_signed(ttl))
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Passwords rejected outright regardless of length
const COMMON_PASSWORDS: [&str; 12] = [
    "password", "password1", "password123", "12345678", "123456789", "qwertyuiop",
    "iloveyou", "sunshine", "letmein123", "welcome123", "abc12345", "trustno1",
];

/// Validate password strength.
///
/// Rejects passwords that are too short, entirely numeric, common, or
/// built from the username or the local part of the email.
pub fn validate_password_strength(
    password: &str,
    username: &str,
    email: &str,
    min_length: usize,
) -> Result<(), Vec<String>> {
    let mut problems = Vec::new();

    if password.chars().count() < min_length {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            min_length
        ));
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    let lower = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lower.as_str()) {
        problems.push("This password is too common.".to_string());
    }

    let email_local = email.split('@').next().unwrap_or_default().to_lowercase();
    let similar_to = [username.to_lowercase(), email_local];
    if similar_to
        .iter()
        .any(|attr| attr.len() >= 3 && (lower.contains(attr.as_str()) || attr.contains(lower.as_str())))
    {
        problems.push("The password is too similar to the username or email.".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

/// Registration endpoint
///
/// POST /api/auth/register/
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let username = request.username.trim();
    let email = request.email.trim();

    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_username(username) {
        errors.add("username", e);
    } else if UserRepo::username_exists(&state.db, username).await? {
        errors.add("username", "A user with that username already exists.");
    }

    if let Err(e) = validate_email(email) {
        errors.add("email", e);
    } else if UserRepo::email_exists(&state.db, email).await? {
        errors.add("email", "A user with that email already exists.");
    }

    if request.password.is_empty() {
        errors.add("password", "This field is required");
    } else if let Err(problems) = validate_password_strength(
        &request.password,
        username,
        email,
        state.config.auth.min_password_length,
    ) {
        for problem in problems {
            errors.add("password", problem);
        }
    }

    errors.finish()?;

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    // A concurrent registration can still trip the UNIQUE constraints; the
    // sqlx error conversion reports that as a field validation error.
    let user = UserRepo::create(&state.db, username, email, &password_hash).await?;

    tracing::info!(user_id = user.id, username = %user.username, "Registered user");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Login endpoint
///
/// POST /api/auth/login/
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (username, password) = match (request.username, request.password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
        _ => return Err(ApiError::bad_request("username and password are required")),
    };

    let invalid = || ApiError::bad_request("Unable to log in with provided credentials.");

    let user = UserRepo::find_by_username(&state.db, &username)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&password, &user.password_hash) {
        tracing::info!(user_id = user.id, "Rejected login with wrong password");
        return Err(invalid());
    }

    let token = generate_token();
    let expires_at = token_expiry(chrono::Utc::now(), state.config.auth.session_ttl_hours)
        .ok_or_else(|| {
            tracing::error!(
                ttl_hours = state.config.auth.session_ttl_hours,
                "Token lifetime out of range"
            );
            ApiError::internal("Failed to create login token")
        })?;

    UserRepo::create_session(&state.db, user.id, &hash_token(&token), &timestamp(expires_at))
        .await?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// Logout endpoint, revokes the presented token
///
/// POST /api/auth/logout/
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = extract_token(&headers).ok_or_else(missing_credentials)?;
    if !UserRepo::delete_session(&state.db, &hash_token(&token)).await? {
        return Err(invalid_token());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Current user endpoint
///
/// GET /api/auth/me/
pub async fn me(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

fn missing_credentials() -> ApiError {
    ApiError::unauthorized("Authentication credentials were not provided.")
}

fn invalid_token() -> ApiError {
    ApiError::unauthorized("Invalid token.")
}

/// Extract the token from request headers.
///
/// Accepts `Authorization: Bearer <token>` and `Authorization: Token <token>`.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get("Authorization").and_then(|h| h.to_str().ok())?;
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token") {
        Some(token.to_string())
    } else {
        None
    }
}

/// Get the user bound to a token
pub async fn get_current_user(pool: &sqlx::SqlitePool, token: &str) -> Result<User, ApiError> {
    UserRepo::find_by_token_hash(pool, &hash_token(token))
        .await?
        .ok_or_else(invalid_token)
}

/// Auth middleware that validates tokens and stashes the user for handlers
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).ok_or_else(missing_credentials)?;
    let user = get_current_user(&state.db, &token).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for getting the current authenticated user from a request
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(user.clone());
        }
        let token = extract_token(&parts.headers).ok_or_else(missing_credentials)?;
        get_current_user(&state.db, &token).await
    }
}

/// The authenticated user if a token was sent, `None` for anonymous callers.
///
/// A token that is present but invalid is still rejected.
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key("Authorization") {
            return Ok(MaybeUser(None));
        }
        User::from_request_parts(parts, state).await.map(|u| MaybeUser(Some(u)))
    }
}
