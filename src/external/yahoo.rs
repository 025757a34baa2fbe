use async_trait::async_trait;
use bigdecimal::{BigDecimal, FromPrimitive};
use serde::Deserialize;

use crate::external::quote_provider::{ExternalQuote, QuoteProvider, QuoteProviderError};
use crate::models::Currency;

pub struct YahooProvider {
    client: reqwest::Client,
}

impl YahooProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    async fn fetch_chart_meta(&self, symbol: &str) -> Result<YahooMeta, QuoteProviderError> {
        let url = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{symbol}?range=1d&interval=1d"
        );

        let resp = self.client
            .get(url)
            .send()
            .await
            .map_err(|e| QuoteProviderError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(QuoteProviderError::RateLimited);
        }
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(QuoteProviderError::NotFound(symbol.to_string()));
        }

        let body = resp
            .json::<YahooChartResponse>()
            .await
            .map_err(|e| QuoteProviderError::Parse(e.to_string()))?;

        let result = body.chart.result
            .and_then(|mut r| r.pop())
            .ok_or_else(|| QuoteProviderError::NotFound(symbol.to_string()))?;

        Ok(result.meta)
    }
}

// Minimal response structs (only what we need)
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    #[allow(dead_code)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: YahooMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    currency: Option<String>,
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    regular_market_volume: Option<i64>,
}

fn decimal(value: f64) -> Result<BigDecimal, QuoteProviderError> {
    BigDecimal::from_f64(value)
        .ok_or_else(|| QuoteProviderError::Parse(format!("non-finite price: {value}")))
}

#[async_trait]
impl QuoteProvider for YahooProvider {
    async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, QuoteProviderError> {
        let meta = self.fetch_chart_meta(symbol).await?;

        let price = meta.regular_market_price
            .ok_or_else(|| QuoteProviderError::NotFound(symbol.to_string()))?;

        let currency = match meta.currency.as_deref() {
            Some("CAD") => Currency::Cad,
            Some("USD") => Currency::Usd,
            other => {
                return Err(QuoteProviderError::BadResponse(format!(
                    "unsupported quote currency {:?} for {}", other, symbol
                )))
            }
        };

        Ok(ExternalQuote {
            symbol: symbol.to_uppercase(),
            current_price: decimal(price)?,
            previous_close: meta.chart_previous_close.map(decimal).transpose()?,
            open_price: None,
            day_high: meta.regular_market_day_high.map(decimal).transpose()?,
            day_low: meta.regular_market_day_low.map(decimal).transpose()?,
            volume: meta.regular_market_volume,
            currency,
            timestamp: chrono::Utc::now(),
        })
    }

    async fn fetch_fx_rate(
        &self,
        from: Currency,
        to: Currency,
    ) -> Result<BigDecimal, QuoteProviderError> {
        // Yahoo quotes currency pairs as e.g. USDCAD=X
        let pair = format!("{}{}=X", from, to);
        let meta = self.fetch_chart_meta(&pair).await?;

        let rate = meta.regular_market_price
            .ok_or_else(|| QuoteProviderError::NotFound(pair.clone()))?;

        decimal(rate)
    }
}
