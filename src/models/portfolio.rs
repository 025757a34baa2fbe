use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Represents a user's investment portfolio. Cash balances and the pinned
// forex rate are overwritten wholesale on each Questrade sync.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Portfolio {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub cash_balance_cad: BigDecimal,
    pub cash_balance_usd: BigDecimal,
    pub questrade_account_id: Option<String>,
    pub last_questrade_sync: Option<chrono::DateTime<chrono::Utc>>,
    pub questrade_forex_rate: Option<BigDecimal>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Portfolio {
    pub fn new(user_id: uuid::Uuid, name: String, description: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            user_id,
            name,
            description,
            cash_balance_cad: BigDecimal::zero(),
            cash_balance_usd: BigDecimal::zero(),
            questrade_account_id: None,
            last_questrade_sync: None,
            questrade_forex_rate: None,
            created_at: chrono::Utc::now(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePortfolio {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePortfolio {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCashBalances {
    pub cash_balance_cad: BigDecimal,
    pub cash_balance_usd: BigDecimal,
}

#[derive(Debug, Serialize)]
pub struct PortfolioSummary {
    pub id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub holdings_count: i64,
    pub questrade_account_id: Option<String>,
    pub last_questrade_sync: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
