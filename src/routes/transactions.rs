use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CreateTransaction, Transaction, UpdateTransaction};
use crate::services::auth_service::CurrentUser;
use crate::services::transaction_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_transaction))
        .route("/portfolio/:portfolio_id", get(fetch_portfolio_transactions))
        .route("/:id", get(get_transaction))
        .route("/:id", put(update_transaction))
        .route("/:id", delete(delete_transaction))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(data): Json<CreateTransaction>,
) -> Result<Json<Transaction>, AppError> {
    info!("POST /transactions - Recording {:?} {}", data.transaction_type, data.symbol);
    let transaction = transaction_service::create(&state.pool, user.id, data)
        .await
        .map_err(|e| {
            error!("Failed to create transaction: {}", e);
            e
        })?;
    Ok(Json(transaction))
}

pub async fn fetch_portfolio_transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(portfolio_id): Path<Uuid>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    info!("GET /transactions/portfolio/{} - Fetching transactions", portfolio_id);
    let transactions =
        transaction_service::fetch_by_portfolio(&state.pool, portfolio_id, user.id).await?;
    Ok(Json(transactions))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    info!("GET /transactions/{} - Fetching transaction", id);
    let transaction = transaction_service::fetch_one(&state.pool, id, user.id).await?;
    Ok(Json(transaction))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateTransaction>,
) -> Result<Json<Transaction>, AppError> {
    info!("PUT /transactions/{} - Updating transaction", id);
    let transaction = transaction_service::update(&state.pool, id, user.id, data)
        .await
        .map_err(|e| {
            error!("Failed to update transaction {}: {}", id, e);
            e
        })?;
    Ok(Json(transaction))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<()>, AppError> {
    info!("DELETE /transactions/{} - Deleting transaction", id);
    transaction_service::delete(&state.pool, id, user.id).await?;
    Ok(Json(()))
}
