use bigdecimal::{BigDecimal, Zero};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{CreateTransaction, Transaction, UpdateTransaction};
use crate::services::{holdings_service, portfolio_service};

fn validate_amounts(quantity: &BigDecimal, price: &BigDecimal, fees: &BigDecimal) -> Result<(), AppError> {
    if *quantity <= BigDecimal::zero() {
        return Err(AppError::Validation("Quantity must be positive".into()));
    }
    if *price <= BigDecimal::zero() {
        return Err(AppError::Validation("Price must be positive".into()));
    }
    if *fees < BigDecimal::zero() {
        return Err(AppError::Validation("Fees cannot be negative".into()));
    }
    Ok(())
}

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    input: CreateTransaction,
) -> Result<Transaction, AppError> {
    portfolio_service::fetch_owned(pool, input.portfolio_id, user_id).await?;

    if input.symbol.trim().is_empty() {
        return Err(AppError::Validation("Symbol cannot be empty".into()));
    }
    validate_amounts(&input.quantity, &input.price, &input.fees)?;

    let transaction = db::transaction_queries::insert(
        pool,
        Transaction::new(
            input.portfolio_id,
            input.symbol,
            input.transaction_type,
            input.quantity,
            input.price,
            input.currency,
            input.fees,
            input.transaction_date,
            input.notes,
        ),
    )
    .await?;

    // Holdings are derived: every mutation triggers a full rebuild.
    holdings_service::sync_holdings(pool, transaction.portfolio_id).await?;

    Ok(transaction)
}

pub async fn fetch_by_portfolio(
    pool: &PgPool,
    portfolio_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<Transaction>, AppError> {
    portfolio_service::fetch_owned(pool, portfolio_id, user_id).await?;
    let transactions = db::transaction_queries::fetch_by_portfolio(pool, portfolio_id).await?;
    Ok(transactions)
}

pub async fn fetch_one(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Transaction, AppError> {
    let transaction = db::transaction_queries::fetch_one(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;
    portfolio_service::fetch_owned(pool, transaction.portfolio_id, user_id).await?;
    Ok(transaction)
}

/// The rare explicit update path. Recomputes total_amount from the new
/// quantity/price/fees before rebuilding holdings.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    input: UpdateTransaction,
) -> Result<Transaction, AppError> {
    let mut transaction = fetch_one(pool, id, user_id).await?;

    if let Some(quantity) = input.quantity {
        transaction.quantity = quantity;
    }
    if let Some(price) = input.price {
        transaction.price = price;
    }
    if let Some(fees) = input.fees {
        transaction.fees = fees;
    }
    if let Some(date) = input.transaction_date {
        transaction.transaction_date = date;
    }
    if input.notes.is_some() {
        transaction.notes = input.notes;
    }
    validate_amounts(&transaction.quantity, &transaction.price, &transaction.fees)?;
    transaction.total_amount = &transaction.quantity * &transaction.price + &transaction.fees;

    let updated = db::transaction_queries::update(pool, &transaction)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

    holdings_service::sync_holdings(pool, updated.portfolio_id).await?;
    info!("Updated transaction {} and rebuilt holdings", id);

    Ok(updated)
}

pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let transaction = fetch_one(pool, id, user_id).await?;

    db::transaction_queries::delete(pool, id).await?;
    holdings_service::sync_holdings(pool, transaction.portfolio_id).await?;

    Ok(())
}
