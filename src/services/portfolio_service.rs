use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{
    CreatePortfolio, Portfolio, PortfolioSummary, PortfolioView, UpdateCashBalances,
    UpdatePortfolio,
};
use crate::services::quote_service::QuoteService;
use crate::services::valuation_service;
use bigdecimal::{BigDecimal, Zero};

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    input: CreatePortfolio,
) -> Result<Portfolio, AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("Portfolio name cannot be empty".into()));
    }
    let portfolio = db::portfolio_queries::insert(
        pool,
        Portfolio::new(user_id, input.name, input.description),
    )
    .await?;
    Ok(portfolio)
}

pub async fn fetch_summaries(pool: &PgPool, user_id: Uuid) -> Result<Vec<PortfolioSummary>, AppError> {
    let summaries = db::portfolio_queries::fetch_summaries(pool, user_id).await?;
    Ok(summaries)
}

/// Load a portfolio and enforce ownership: unknown ids are not-found,
/// someone else's portfolio is forbidden.
pub async fn fetch_owned(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Portfolio, AppError> {
    let portfolio = db::portfolio_queries::fetch_one(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Portfolio not found".to_string()))?;
    if portfolio.user_id != user_id {
        return Err(AppError::Forbidden("Not authorized to access this portfolio".to_string()));
    }
    Ok(portfolio)
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    input: UpdatePortfolio,
) -> Result<Portfolio, AppError> {
    let existing = fetch_owned(pool, id, user_id).await?;

    let name = input.name.unwrap_or(existing.name);
    if name.trim().is_empty() {
        return Err(AppError::Validation("Portfolio name cannot be empty".into()));
    }
    let description = input.description.or(existing.description);

    db::portfolio_queries::update(pool, id, name, description)
        .await?
        .ok_or_else(|| AppError::NotFound("Portfolio not found".to_string()))
}

pub async fn update_cash(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    input: UpdateCashBalances,
) -> Result<Portfolio, AppError> {
    fetch_owned(pool, id, user_id).await?;

    if input.cash_balance_cad < BigDecimal::zero() || input.cash_balance_usd < BigDecimal::zero() {
        return Err(AppError::Validation("Cash balances cannot be negative".into()));
    }

    db::portfolio_queries::update_cash_balances(
        pool,
        id,
        &input.cash_balance_cad,
        &input.cash_balance_usd,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Portfolio not found".to_string()))
}

pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    fetch_owned(pool, id, user_id).await?;
    // Transactions and holdings cascade with the portfolio.
    db::portfolio_queries::delete(pool, id).await?;
    Ok(())
}

/// Portfolio detail with live prices and gain/loss figures.
pub async fn get_with_performance(
    pool: &PgPool,
    quotes: &QuoteService,
    id: Uuid,
    user_id: Uuid,
) -> Result<PortfolioView, AppError> {
    let portfolio = fetch_owned(pool, id, user_id).await?;
    valuation_service::portfolio_view(pool, quotes, &portfolio).await
}
