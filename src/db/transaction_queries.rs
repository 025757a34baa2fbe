use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;
use crate::models::{Transaction, TransactionType};

const TRANSACTION_COLUMNS: &str =
    "id, portfolio_id, symbol, transaction_type, quantity, price, currency,
     fees, total_amount, transaction_date, notes, created_at";

pub async fn insert(pool: &PgPool, input: Transaction) -> Result<Transaction, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "INSERT INTO transactions
             (id, portfolio_id, symbol, transaction_type, quantity, price, currency,
              fees, total_amount, transaction_date, notes, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING {TRANSACTION_COLUMNS}"
    ))
        .bind(input.id)
        .bind(input.portfolio_id)
        .bind(input.symbol)
        .bind(input.transaction_type)
        .bind(input.quantity)
        .bind(input.price)
        .bind(input.currency)
        .bind(input.fees)
        .bind(input.total_amount)
        .bind(input.transaction_date)
        .bind(input.notes)
        .bind(input.created_at)
        .fetch_one(pool)
        .await
}

// Ordering matters to the holdings fold: date ascending, ties broken
// deterministically by insertion order.
pub async fn fetch_by_portfolio(pool: &PgPool, portfolio_id: Uuid) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {TRANSACTION_COLUMNS}
         FROM transactions
         WHERE portfolio_id = $1
         ORDER BY transaction_date ASC, created_at ASC, id ASC"
    ))
        .bind(portfolio_id)
        .fetch_all(pool)
        .await
}

pub async fn fetch_recent(pool: &PgPool, portfolio_id: Uuid, limit: i64) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {TRANSACTION_COLUMNS}
         FROM transactions
         WHERE portfolio_id = $1
         ORDER BY transaction_date DESC
         LIMIT $2"
    ))
        .bind(portfolio_id)
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
    ))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn update(pool: &PgPool, txn: &Transaction) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(&format!(
        "UPDATE transactions
         SET quantity = $2, price = $3, fees = $4, total_amount = $5,
             transaction_date = $6, notes = $7
         WHERE id = $1
         RETURNING {TRANSACTION_COLUMNS}"
    ))
        .bind(txn.id)
        .bind(&txn.quantity)
        .bind(&txn.price)
        .bind(&txn.fees)
        .bind(&txn.total_amount)
        .bind(txn.transaction_date)
        .bind(&txn.notes)
        .fetch_optional(pool)
        .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// A Questrade position is considered already imported when a BUY for the
// symbol carries the account note tag (one-shot adopt, not reconciliation).
pub async fn synced_buy_exists(
    pool: &PgPool,
    portfolio_id: Uuid,
    symbol: &str,
    note_tag: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
             SELECT 1 FROM transactions
             WHERE portfolio_id = $1
               AND symbol = $2
               AND transaction_type = $3
               AND notes LIKE '%' || $4 || '%'
         )"
    )
        .bind(portfolio_id)
        .bind(symbol)
        .bind(TransactionType::Buy)
        .bind(note_tag)
        .fetch_one(pool)
        .await
}

// Dividend dedup compares the calendar date, not the datetime, plus the
// absolute net amount.
pub async fn dividend_exists(
    pool: &PgPool,
    portfolio_id: Uuid,
    symbol: &str,
    date: NaiveDate,
    total_amount: &BigDecimal,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
             SELECT 1 FROM transactions
             WHERE portfolio_id = $1
               AND symbol = $2
               AND transaction_type = $3
               AND transaction_date::date = $4
               AND total_amount = $5
         )"
    )
        .bind(portfolio_id)
        .bind(symbol)
        .bind(TransactionType::Dividend)
        .bind(date)
        .bind(total_amount)
        .fetch_one(pool)
        .await
}
