use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::transaction::Currency;

// Current position for one symbol within a portfolio. Fully derived from the
// transaction log: safe to drop and rebuild at any time, never hand-edited.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Holding {
    pub id: uuid::Uuid,
    pub portfolio_id: uuid::Uuid,
    pub symbol: String,
    pub quantity: BigDecimal,
    pub average_cost: BigDecimal,
    pub total_cost: BigDecimal,
    pub currency: Currency,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// A holding joined with live market data. Derived fields are null when no
// quote was available for the symbol.
#[derive(Debug, Clone, Serialize)]
pub struct HoldingView {
    pub id: uuid::Uuid,
    pub symbol: String,
    pub quantity: BigDecimal,
    pub average_cost: BigDecimal,
    pub total_cost: BigDecimal,
    pub currency: Currency,
    pub current_price: Option<BigDecimal>,
    pub current_value: Option<BigDecimal>,
    pub unrealized_gain_loss: Option<BigDecimal>,
    pub unrealized_gain_loss_percent: Option<BigDecimal>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// Portfolio with valuation figures. All aggregates are expressed in the
// reporting currency (CAD).
#[derive(Debug, Serialize)]
pub struct PortfolioView {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub cash_balance_cad: BigDecimal,
    pub cash_balance_usd: BigDecimal,
    pub questrade_account_id: Option<String>,
    pub last_questrade_sync: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub holdings: Vec<HoldingView>,
    pub total_value: BigDecimal,
    pub total_cost: BigDecimal,
    pub total_gain_loss: BigDecimal,
    pub total_gain_loss_percent: Option<BigDecimal>,
    pub total_value_with_cash: BigDecimal,
}
