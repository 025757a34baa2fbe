use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bigdecimal::{BigDecimal, One};
use dashmap::DashMap;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::external::quote_provider::{ExternalQuote, QuoteProvider, QuoteProviderError};
use crate::models::Currency;

const DEFAULT_QUOTE_TTL_SECS: u64 = 300;
const FX_TTL_SECS: u64 = 3600;

/// Quote and FX lookups with short-lived in-process caching.
///
/// Quotes are cached briefly (configurable), FX rates for an hour. Batch
/// lookups tolerate per-symbol failure; single lookups surface it as
/// data-unavailable.
#[derive(Clone)]
pub struct QuoteService {
    provider: Arc<dyn QuoteProvider>,
    quote_ttl: Duration,
    quote_cache: Arc<DashMap<String, (ExternalQuote, Instant)>>,
    fx_cache: Arc<DashMap<(Currency, Currency), (BigDecimal, Instant)>>,
}

impl QuoteService {
    pub fn new(provider: Arc<dyn QuoteProvider>, quote_ttl_secs: Option<u64>) -> Self {
        Self {
            provider,
            quote_ttl: Duration::from_secs(quote_ttl_secs.unwrap_or(DEFAULT_QUOTE_TTL_SECS)),
            quote_cache: Arc::new(DashMap::new()),
            fx_cache: Arc::new(DashMap::new()),
        }
    }

    pub async fn get_quote(&self, symbol: &str) -> Result<ExternalQuote, AppError> {
        let key = symbol.to_uppercase();

        if let Some(entry) = self.quote_cache.get(&key) {
            let (quote, fetched_at) = entry.value();
            if fetched_at.elapsed() < self.quote_ttl {
                return Ok(quote.clone());
            }
        }

        let quote = self.provider.fetch_quote(&key).await.map_err(map_provider_error)?;
        self.quote_cache.insert(key, (quote.clone(), Instant::now()));
        Ok(quote)
    }

    /// Batch lookup. Symbols that fail are skipped, not fatal: the valuation
    /// layer treats a missing quote as partial data.
    pub async fn get_quotes(&self, symbols: &[String]) -> HashMap<String, ExternalQuote> {
        let mut results = HashMap::new();
        for symbol in symbols {
            match self.get_quote(symbol).await {
                Ok(quote) => {
                    results.insert(symbol.to_uppercase(), quote);
                }
                Err(e) => {
                    warn!("Skipping quote for {}: {}", symbol, e);
                }
            }
        }
        results
    }

    pub async fn get_exchange_rate(
        &self,
        from: Currency,
        to: Currency,
    ) -> Result<BigDecimal, AppError> {
        if from == to {
            return Ok(BigDecimal::one());
        }

        if let Some(entry) = self.fx_cache.get(&(from, to)) {
            let (rate, fetched_at) = entry.value();
            if fetched_at.elapsed() < Duration::from_secs(FX_TTL_SECS) {
                return Ok(rate.clone());
            }
        }

        let rate = self.provider
            .fetch_fx_rate(from, to)
            .await
            .map_err(|e| match e {
                QuoteProviderError::RateLimited => AppError::RateLimited,
                other => AppError::DataUnavailable(format!(
                    "Failed to fetch exchange rate for {} to {}: {}", from, to, other
                )),
            })?;

        info!("Fetched {}/{} exchange rate: {}", from, to, rate);
        self.fx_cache.insert((from, to), (rate.clone(), Instant::now()));
        Ok(rate)
    }

    pub async fn convert_amount(
        &self,
        amount: &BigDecimal,
        from: Currency,
        to: Currency,
    ) -> Result<BigDecimal, AppError> {
        if from == to {
            return Ok(amount.clone());
        }
        let rate = self.get_exchange_rate(from, to).await?;
        Ok(amount * rate)
    }

    /// Pre-fetch quotes for a set of symbols, ignoring failures. Used by the
    /// cache-warming job.
    pub async fn warm(&self, symbols: &[String]) -> (usize, usize) {
        let mut warmed = 0;
        let mut failed = 0;
        for symbol in symbols {
            match self.get_quote(symbol).await {
                Ok(_) => warmed += 1,
                Err(e) => {
                    warn!("Cache warm failed for {}: {}", symbol, e);
                    failed += 1;
                }
            }
        }
        (warmed, failed)
    }
}

fn map_provider_error(e: QuoteProviderError) -> AppError {
    match e {
        QuoteProviderError::RateLimited => AppError::RateLimited,
        QuoteProviderError::NotFound(symbol) => {
            AppError::DataUnavailable(format!("No data available for symbol: {symbol}"))
        }
        other => AppError::DataUnavailable(other.to_string()),
    }
}
