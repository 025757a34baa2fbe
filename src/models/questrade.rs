use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Stored OAuth state for a user's Questrade connection. Tokens are rotated on
// every refresh; api_server can change between refreshes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestradeConnection {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub api_server: String,
    pub token_expires_at: chrono::DateTime<chrono::Utc>,
    pub last_sync_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub account_id: String,
    #[serde(default = "default_include_dividends")]
    pub include_dividends: bool,
}

fn default_include_dividends() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub message: String,
    pub synced_count: usize,
    pub skipped_count: usize,
    pub dividend_count: usize,
    pub cash_cad: BigDecimal,
    pub cash_usd: BigDecimal,
}

// ---------------------------------------------------------------------------
// Questrade wire types (only the fields we consume)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct QtAuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub api_server: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QtAccount {
    pub number: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub status: String,
    pub is_primary: bool,
}

#[derive(Debug, Deserialize)]
pub struct QtAccountList {
    pub accounts: Vec<QtAccount>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QtPosition {
    pub symbol: String,
    pub open_quantity: BigDecimal,
    pub average_entry_price: BigDecimal,
    pub total_cost: BigDecimal,
}

#[derive(Debug, Deserialize)]
pub struct QtPositionList {
    pub positions: Vec<QtPosition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QtBalance {
    pub currency: String,
    pub cash: BigDecimal,
    pub market_value: BigDecimal,
    pub total_equity: BigDecimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QtBalances {
    #[serde(default)]
    pub per_currency_balances: Vec<QtBalance>,
    #[serde(default)]
    pub combined_balances: Vec<QtBalance>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QtActivity {
    #[serde(default)]
    pub action: String,
    #[serde(rename = "type", default)]
    pub activity_type: String,
    #[serde(default)]
    pub symbol: String,
    pub transaction_date: chrono::DateTime<chrono::Utc>,
    pub net_amount: BigDecimal,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct QtActivityList {
    pub activities: Vec<QtActivity>,
}
