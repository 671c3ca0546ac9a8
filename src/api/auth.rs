use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Form, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::WithRejection;
use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use super::error::ApiError;
use super::forms::FormBody;
use crate::config::Config;
use crate::db::{
    timestamp, LoginRequest, LoginResponse, RegisterRequest, Role, Session, User, UserResponse,
};
use crate::engine::validation::{normalize_email, validate_email, validate_required};
use crate::engine::{Caller, FieldErrors};
use crate::{AppState, DbPool};

/// Cookie carrying the session token for browser clients
pub const SESSION_COOKIE: &str = "airdesk_session";

const MIN_PASSWORD_LENGTH: usize = 8;

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

/// Generate a random secret
fn generate_secret() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token secret for storage
fn hash_token(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validate password strength
/// Returns None if valid, or Some(error_message) if invalid
fn validate_password_strength(password: &str) -> Option<String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Some(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    if password.trim().is_empty() {
        return Some("Password cannot be blank".to_string());
    }
    None
}

/// Insert a new identity
pub async fn create_user(
    pool: &DbPool,
    email: &str,
    password: &str,
    name: &str,
    role: Role,
) -> Result<User, ApiError> {
    let password_hash = hash_password(password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;
    let now = timestamp(Utc::now());

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: normalize_email(email),
        password_hash,
        name: name.trim().to_string(),
        role: role.to_string(),
        created_at: now.clone(),
        updated_at: now,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, name, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(&user.role)
    .bind(&user.created_at)
    .bind(&user.updated_at)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(user),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            let mut errors = FieldErrors::new();
            errors.add("email", "An account with this email already exists");
            Err(ApiError::validation(errors.into_map()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Open a session for a user and return the bearer token.
///
/// Tokens have the form `<session id>.<secret>`; only a hash of the secret
/// is stored.
pub async fn create_session(pool: &DbPool, user: &User, ttl_days: i64) -> Result<String, ApiError> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let secret = generate_secret();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session_id)
    .bind(&user.id)
    .bind(hash_token(&secret))
    .bind(timestamp(now + Duration::days(ttl_days.max(1))))
    .bind(timestamp(now))
    .execute(pool)
    .await?;

    Ok(format!("{}.{}", session_id, secret))
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Register a customer identity and sign it in
pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    WithRejection(Form(request), _): FormBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&request.email);

    let mut errors = FieldErrors::new();
    errors.check("email", validate_email(&email));
    errors.check("name", validate_required(&request.name, "Name", 100));
    if let Some(message) = validate_password_strength(&request.password) {
        errors.add("password", message);
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors.into_map()));
    }

    let user = create_user(
        &state.db,
        &email,
        &request.password,
        &request.name,
        Role::Customer,
    )
    .await?;
    let token = create_session(&state.db, &user, state.config.auth.session_ttl_days).await?;

    tracing::info!(user_id = %user.id, "Customer registered");

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(token.clone())),
        Json(LoginResponse {
            token,
            user: UserResponse::from(user),
        }),
    ))
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    WithRejection(Form(request), _): FormBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(normalize_email(&request.email))
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify_password(&request.password, &user.password_hash) {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = create_session(&state.db, &user, state.config.auth.session_ttl_days).await?;

    Ok((
        jar.add(session_cookie(token.clone())),
        Json(LoginResponse {
            token,
            user: UserResponse::from(user),
        }),
    ))
}

/// End the current session, if any
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some((session_id, _)) = extract_token(&headers, &jar)
        .as_deref()
        .and_then(|t| t.split_once('.'))
    {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(session_id)
            .execute(&state.db)
            .await?;
    }

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/"),
    ))
}

/// Extract the token from the Authorization header or the session cookie
fn extract_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    if let Some(auth_header) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }

    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Resolve a bearer token to the user it was issued to
pub async fn get_current_user(pool: &DbPool, token: &str) -> Result<User, ApiError> {
    let (session_id, secret) = token
        .split_once('.')
        .ok_or_else(|| ApiError::unauthorized("Invalid session token"))?;

    let session: Option<Session> =
        sqlx::query_as("SELECT * FROM sessions WHERE id = ? AND expires_at > ?")
            .bind(session_id)
            .bind(timestamp(Utc::now()))
            .fetch_optional(pool)
            .await?;

    let session = session.ok_or_else(|| ApiError::unauthorized("Session expired or unknown"))?;

    let presented = hash_token(secret);
    if !bool::from(presented.as_bytes().ct_eq(session.token_hash.as_bytes())) {
        return Err(ApiError::unauthorized("Invalid session token"));
    }

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&session.user_id)
        .fetch_optional(pool)
        .await?;

    user.ok_or_else(|| ApiError::unauthorized("Session expired or unknown"))
}

impl From<User> for Caller {
    fn from(user: User) -> Self {
        let role = user.role_enum();
        Caller {
            user_id: user.id,
            email: user.email,
            name: user.name,
            role,
        }
    }
}

/// Extractor for the authenticated caller of a request
#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = extract_token(&parts.headers, &jar)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        let user = get_current_user(&state.db, &token).await?;
        Ok(Caller::from(user))
    }
}

/// Make sure the bootstrap administrator exists.
///
/// Without a configured password one is generated and logged once.
pub async fn ensure_admin_user(pool: &DbPool, config: &Config) -> anyhow::Result<()> {
    let email = normalize_email(&config.auth.admin_email);
    let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(pool)
        .await?;

    if let Some(user) = existing {
        if !user.role_enum().is_admin() {
            sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
                .bind(Role::Admin.to_string())
                .bind(timestamp(Utc::now()))
                .bind(&user.id)
                .execute(pool)
                .await?;
            tracing::info!(email = %email, "Promoted bootstrap account to admin");
        }
        return Ok(());
    }

    let (password, generated) = match &config.auth.admin_password {
        Some(p) if !p.is_empty() => (p.clone(), false),
        _ => (generate_secret()[..20].to_string(), true),
    };

    create_user(pool, &email, &password, "Administrator", Role::Admin)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create admin user: {}", e))?;

    if generated {
        tracing::warn!(
            email = %email,
            password = %password,
            "Created admin user with a generated password; change it or set auth.admin_password"
        );
    } else {
        tracing::info!(email = %email, "Created admin user");
    }
    Ok(())
}
