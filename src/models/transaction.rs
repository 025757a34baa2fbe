use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Buy,
    Sell,
    Dividend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "currency", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Cad,
    Usd,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Cad => write!(f, "CAD"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

// Represents a buy, sell or dividend event that affects a portfolio's holdings.
// Append-mostly: rows are immutable apart from the explicit update path,
// which recomputes total_amount.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: uuid::Uuid,
    pub portfolio_id: uuid::Uuid,
    pub symbol: String,
    pub transaction_type: TransactionType,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub currency: Currency,
    pub fees: BigDecimal,
    pub total_amount: BigDecimal,
    pub transaction_date: chrono::DateTime<chrono::Utc>,
    pub notes: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Transaction {
    pub fn new(
        portfolio_id: uuid::Uuid,
        symbol: String,
        transaction_type: TransactionType,
        quantity: BigDecimal,
        price: BigDecimal,
        currency: Currency,
        fees: BigDecimal,
        transaction_date: chrono::DateTime<chrono::Utc>,
        notes: Option<String>,
    ) -> Self {
        let total_amount = &quantity * &price + &fees;
        Self {
            id: uuid::Uuid::new_v4(),
            portfolio_id,
            symbol: symbol.to_uppercase(),
            transaction_type,
            quantity,
            price,
            currency,
            fees,
            total_amount,
            transaction_date,
            notes,
            created_at: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTransaction {
    pub portfolio_id: uuid::Uuid,
    pub symbol: String,
    pub transaction_type: TransactionType,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    #[serde(default = "BigDecimal::zero")]
    pub fees: BigDecimal,
    pub transaction_date: chrono::DateTime<chrono::Utc>,
    pub notes: Option<String>,
}

fn default_currency() -> Currency {
    Currency::Cad
}

#[derive(Debug, Deserialize)]
pub struct UpdateTransaction {
    pub quantity: Option<BigDecimal>,
    pub price: Option<BigDecimal>,
    pub fees: Option<BigDecimal>,
    pub transaction_date: Option<chrono::DateTime<chrono::Utc>>,
    pub notes: Option<String>,
}
