use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{LoginRequest, RegisterRequest, TokenResponse, UserResponse};
use crate::services::auth_service::{self, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

pub async fn register(
    State(state): State<AppState>,
    Json(data): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, AppError> {
    info!("POST /auth/register - Registering new user");
    let user = auth_service::register(&state.pool, data).await.map_err(|e| {
        error!("Failed to register user: {}", e);
        e
    })?;
    Ok(Json(user))
}

pub async fn login(
    State(state): State<AppState>,
    Json(data): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    info!("POST /auth/login - Logging in");
    let token = auth_service::login(&state.pool, &state.auth, data).await?;
    Ok(Json(token))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    info!("GET /auth/me - Fetching current user {}", user.id);
    Json(user.into())
}
