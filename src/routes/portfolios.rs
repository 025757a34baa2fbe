use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    CreatePortfolio, Portfolio, PortfolioSummary, PortfolioView, UpdateCashBalances,
    UpdatePortfolio,
};
use crate::services::auth_service::CurrentUser;
use crate::services::portfolio_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_portfolio).get(fetch_portfolios))
        .route("/:id", get(get_portfolio))
        .route("/:id", put(update_portfolio))
        .route("/:id", delete(delete_portfolio))
        .route("/:id/cash", put(update_cash))
}

pub async fn create_portfolio(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(data): Json<CreatePortfolio>,
) -> Result<Json<Portfolio>, AppError> {
    info!("POST /portfolios - Creating new portfolio");
    let portfolio = portfolio_service::create(&state.pool, user.id, data)
        .await
        .map_err(|e| {
            error!("Failed to create portfolio: {}", e);
            e
        })?;
    Ok(Json(portfolio))
}

pub async fn fetch_portfolios(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<PortfolioSummary>>, AppError> {
    info!("GET /portfolios - Fetching portfolios for user {}", user.id);
    let portfolios = portfolio_service::fetch_summaries(&state.pool, user.id).await?;
    Ok(Json(portfolios))
}

/// Full portfolio detail with live valuation.
pub async fn get_portfolio(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PortfolioView>, AppError> {
    info!("GET /portfolios/{} - Fetching portfolio with performance", id);
    let view = portfolio_service::get_with_performance(&state.pool, &state.quotes, id, user.id)
        .await
        .map_err(|e| {
            error!("Failed to fetch portfolio {}: {}", id, e);
            e
        })?;
    Ok(Json(view))
}

pub async fn update_portfolio(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdatePortfolio>,
) -> Result<Json<Portfolio>, AppError> {
    info!("PUT /portfolios/{} - Updating portfolio", id);
    let portfolio = portfolio_service::update(&state.pool, id, user.id, data).await?;
    Ok(Json(portfolio))
}

pub async fn update_cash(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateCashBalances>,
) -> Result<Json<Portfolio>, AppError> {
    info!("PUT /portfolios/{}/cash - Updating cash balances", id);
    let portfolio = portfolio_service::update_cash(&state.pool, id, user.id, data).await?;
    Ok(Json(portfolio))
}

pub async fn delete_portfolio(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<()>, AppError> {
    info!("DELETE /portfolios/{} - Deleting portfolio", id);
    portfolio_service::delete(&state.pool, id, user.id)
        .await
        .map_err(|e| {
            error!("Failed to delete portfolio {}: {}", id, e);
            e
        })?;
    Ok(Json(()))
}
