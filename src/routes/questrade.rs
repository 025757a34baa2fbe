use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ConnectRequest, QtAccount, SyncReport, SyncRequest};
use crate::services::auth_service::CurrentUser;
use crate::services::{questrade_service, questrade_sync_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/connect", post(connect))
        .route("/accounts", get(get_accounts))
        .route("/sync/:portfolio_id", post(sync_portfolio))
        .route("/disconnect", delete(disconnect))
}

pub async fn connect(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(data): Json<ConnectRequest>,
) -> Result<Json<Value>, AppError> {
    info!("POST /questrade/connect - Connecting Questrade for user {}", user.id);
    questrade_service::connect(&state.pool, &state.questrade, user.id, &data.refresh_token)
        .await
        .map_err(|e| {
            error!("Questrade connect failed for user {}: {}", user.id, e);
            e
        })?;
    Ok(Json(json!({ "message": "Questrade connected successfully" })))
}

pub async fn get_accounts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<QtAccount>>, AppError> {
    info!("GET /questrade/accounts - Listing accounts for user {}", user.id);
    let accounts = questrade_service::get_accounts(&state.pool, &state.questrade, user.id).await?;
    Ok(Json(accounts))
}

pub async fn sync_portfolio(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(portfolio_id): Path<Uuid>,
    Json(data): Json<SyncRequest>,
) -> Result<Json<SyncReport>, AppError> {
    info!(
        "POST /questrade/sync/{} - Syncing account {} for user {}",
        portfolio_id, data.account_id, user.id
    );
    let report = questrade_sync_service::sync_account_to_portfolio(
        &state.pool,
        &state.questrade,
        user.id,
        portfolio_id,
        &data.account_id,
        data.include_dividends,
    )
    .await
    .map_err(|e| {
        error!("Questrade sync failed for portfolio {}: {}", portfolio_id, e);
        e
    })?;
    Ok(Json(report))
}

pub async fn disconnect(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, AppError> {
    info!("DELETE /questrade/disconnect - Disconnecting Questrade for user {}", user.id);
    let removed = questrade_service::disconnect(&state.pool, user.id).await?;
    if !removed {
        return Err(AppError::NotFound("Questrade not connected".to_string()));
    }
    Ok(Json(json!({ "message": "Questrade disconnected" })))
}
