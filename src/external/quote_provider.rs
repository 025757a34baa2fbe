use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::Serialize;
use thiserror::Error;

use crate::models::Currency;

#[derive(Debug, Clone, Serialize)]
pub struct ExternalQuote {
    pub symbol: String,
    pub current_price: BigDecimal,
    pub previous_close: Option<BigDecimal>,
    pub open_price: Option<BigDecimal>,
    pub day_high: Option<BigDecimal>,
    pub day_low: Option<BigDecimal>,
    pub volume: Option<i64>,
    pub currency: Currency,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Error)]
pub enum QuoteProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no data available for symbol {0}")]
    NotFound(String),

    #[error("rate limited")]
    RateLimited,
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, QuoteProviderError>;

    async fn fetch_fx_rate(
        &self,
        from: Currency,
        to: Currency,
    ) -> Result<BigDecimal, QuoteProviderError>;
}
