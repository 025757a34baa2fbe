use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;
use crate::models::{Currency, Holding};

pub async fn fetch_by_portfolio(pool: &PgPool, portfolio_id: Uuid) -> Result<Vec<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(
        "SELECT id, portfolio_id, symbol, quantity, average_cost, total_cost, currency, updated_at
         FROM holdings
         WHERE portfolio_id = $1
         ORDER BY symbol ASC"
    )
        .bind(portfolio_id)
        .fetch_all(pool)
        .await
}

// Idempotent by design: re-running the reconstruction with unchanged
// transactions upserts identical values.
pub async fn upsert(
    pool: &PgPool,
    portfolio_id: Uuid,
    symbol: &str,
    quantity: &BigDecimal,
    average_cost: &BigDecimal,
    total_cost: &BigDecimal,
    currency: Currency,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO holdings (id, portfolio_id, symbol, quantity, average_cost, total_cost, currency, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
         ON CONFLICT (portfolio_id, symbol)
         DO UPDATE SET quantity = EXCLUDED.quantity,
                       average_cost = EXCLUDED.average_cost,
                       total_cost = EXCLUDED.total_cost,
                       currency = EXCLUDED.currency,
                       updated_at = NOW()"
    )
        .bind(Uuid::new_v4())
        .bind(portfolio_id)
        .bind(symbol)
        .bind(quantity)
        .bind(average_cost)
        .bind(total_cost)
        .bind(currency)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_one(pool: &PgPool, portfolio_id: Uuid, symbol: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM holdings WHERE portfolio_id = $1 AND symbol = $2")
        .bind(portfolio_id)
        .bind(symbol)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_distinct_symbols(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT DISTINCT symbol FROM holdings ORDER BY symbol")
        .fetch_all(pool)
        .await
}
