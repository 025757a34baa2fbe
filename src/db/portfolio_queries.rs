use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;
use crate::models::{Portfolio, PortfolioSummary};

const PORTFOLIO_COLUMNS: &str =
    "id, user_id, name, description, cash_balance_cad, cash_balance_usd,
     questrade_account_id, last_questrade_sync, questrade_forex_rate,
     created_at, updated_at";

pub async fn insert(pool: &PgPool, input: Portfolio) -> Result<Portfolio, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(&format!(
        "INSERT INTO portfolios (id, user_id, name, description, cash_balance_cad, cash_balance_usd, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {PORTFOLIO_COLUMNS}"
    ))
        .bind(input.id)
        .bind(input.user_id)
        .bind(input.name)
        .bind(input.description)
        .bind(input.cash_balance_cad)
        .bind(input.cash_balance_usd)
        .bind(input.created_at)
        .fetch_one(pool)
        .await
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Option<Portfolio>, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(&format!(
        "SELECT {PORTFOLIO_COLUMNS} FROM portfolios WHERE id = $1"
    ))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_summaries(pool: &PgPool, user_id: Uuid) -> Result<Vec<PortfolioSummary>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (Uuid, String, Option<String>, i64, Option<String>, Option<chrono::DateTime<chrono::Utc>>, chrono::DateTime<chrono::Utc>)>(
        "SELECT p.id, p.name, p.description,
                (SELECT COUNT(*) FROM holdings h WHERE h.portfolio_id = p.id) AS holdings_count,
                p.questrade_account_id, p.last_questrade_sync, p.created_at
         FROM portfolios p
         WHERE p.user_id = $1
         ORDER BY p.created_at DESC"
    )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, description, holdings_count, questrade_account_id, last_questrade_sync, created_at)| {
            PortfolioSummary {
                id,
                name,
                description,
                holdings_count,
                questrade_account_id,
                last_questrade_sync,
                created_at,
            }
        })
        .collect())
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    name: String,
    description: Option<String>,
) -> Result<Option<Portfolio>, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(&format!(
        "UPDATE portfolios
         SET name = $2, description = $3, updated_at = NOW()
         WHERE id = $1
         RETURNING {PORTFOLIO_COLUMNS}"
    ))
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(pool)
        .await
}

pub async fn update_cash_balances(
    pool: &PgPool,
    id: Uuid,
    cash_cad: &BigDecimal,
    cash_usd: &BigDecimal,
) -> Result<Option<Portfolio>, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(&format!(
        "UPDATE portfolios
         SET cash_balance_cad = $2, cash_balance_usd = $3, updated_at = NOW()
         WHERE id = $1
         RETURNING {PORTFOLIO_COLUMNS}"
    ))
        .bind(id)
        .bind(cash_cad)
        .bind(cash_usd)
        .fetch_optional(pool)
        .await
}

// Overwrites the broker-derived fields wholesale, as each sync re-reads them
// from Questrade's own balance data.
pub async fn record_questrade_sync(
    pool: &PgPool,
    id: Uuid,
    account_id: &str,
    cash_cad: &BigDecimal,
    cash_usd: &BigDecimal,
    forex_rate: Option<&BigDecimal>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE portfolios
         SET questrade_account_id = $2,
             last_questrade_sync = NOW(),
             cash_balance_cad = $3,
             cash_balance_usd = $4,
             questrade_forex_rate = COALESCE($5, questrade_forex_rate),
             updated_at = NOW()
         WHERE id = $1"
    )
        .bind(id)
        .bind(account_id)
        .bind(cash_cad)
        .bind(cash_usd)
        .bind(forex_rate)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM portfolios WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
