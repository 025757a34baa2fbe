use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{LoginRequest, RegisterRequest, TokenResponse, User, UserResponse};
use crate::state::AppState;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
        let token_ttl_minutes = std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60 * 24);
        Ok(Self { jwt_secret, token_ttl_minutes })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::External(format!("Password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hashed: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hashed) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn issue_token(config: &AuthConfig, user_id: Uuid) -> Result<String, AppError> {
    let exp = (Utc::now() + Duration::minutes(config.token_ttl_minutes)).timestamp() as usize;
    let claims = Claims { sub: user_id.to_string(), exp };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::External(format!("Token encoding failed: {e}")))
}

pub fn decode_token(config: &AuthConfig, token: &str) -> Result<Uuid, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;
    Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthorized)
}

pub async fn register(pool: &PgPool, input: RegisterRequest) -> Result<UserResponse, AppError> {
    let email = input.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if input.password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    if db::user_queries::fetch_by_email(pool, &email).await?.is_some() {
        return Err(AppError::Validation("Email already registered".to_string()));
    }

    let hashed = hash_password(&input.password)?;
    let user = db::user_queries::insert(pool, User::new(email, hashed, input.full_name)).await?;
    info!("Registered user {}", user.id);
    Ok(user.into())
}

pub async fn login(
    pool: &PgPool,
    config: &AuthConfig,
    input: LoginRequest,
) -> Result<TokenResponse, AppError> {
    let email = input.email.trim().to_lowercase();
    let user = db::user_queries::fetch_by_email(pool, &email).await?;

    let Some(user) = user else {
        warn!("Login attempt for unknown email");
        return Err(AppError::Unauthorized);
    };
    if !user.is_active || !verify_password(&input.password, &user.hashed_password) {
        return Err(AppError::Unauthorized);
    }

    let access_token = issue_token(config, user.id)?;
    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    })
}

// Extractor for the authenticated user on protected routes.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;
        let user_id = decode_token(&state.auth, token)?;

        let user = db::user_queries::fetch_one(&state.pool, user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        if !user.is_active {
            return Err(AppError::Unauthorized);
        }

        Ok(CurrentUser(user))
    }
}
