use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};
use sqlx::PgPool;
use tracing::info;

use crate::db;
use crate::errors::AppError;
use crate::external::quote_provider::ExternalQuote;
use crate::models::{Currency, Holding, HoldingView, Portfolio, PortfolioView};
use crate::services::quote_service::QuoteService;

const REPORTING_CURRENCY: Currency = Currency::Cad;

/// Join a portfolio's holdings with live quotes and produce the valuation
/// view. All aggregates come out in the reporting currency (CAD).
///
/// Quotes are a partial map: holdings without one still appear in the
/// response with null derived fields and contribute nothing to the totals.
/// A missing USD/CAD rate when one is needed aborts the whole valuation — a
/// silently wrong rate would corrupt every downstream total.
pub fn evaluate(
    portfolio: &Portfolio,
    holdings: &[Holding],
    quotes: &HashMap<String, ExternalQuote>,
    usd_to_cad: Option<&BigDecimal>,
) -> Result<PortfolioView, AppError> {
    let to_reporting = |amount: &BigDecimal, currency: Currency| -> Result<BigDecimal, AppError> {
        if currency == REPORTING_CURRENCY {
            return Ok(amount.clone());
        }
        let rate = usd_to_cad.ok_or_else(|| {
            AppError::DataUnavailable("USD/CAD exchange rate unavailable".to_string())
        })?;
        Ok(amount * rate)
    };

    let mut views: Vec<HoldingView> = Vec::with_capacity(holdings.len());
    let mut total_value = BigDecimal::zero();
    let mut total_cost = BigDecimal::zero();

    for holding in holdings {
        let mut view = HoldingView {
            id: holding.id,
            symbol: holding.symbol.clone(),
            quantity: holding.quantity.clone(),
            average_cost: holding.average_cost.clone(),
            total_cost: holding.total_cost.clone(),
            currency: holding.currency,
            current_price: None,
            current_value: None,
            unrealized_gain_loss: None,
            unrealized_gain_loss_percent: None,
            updated_at: holding.updated_at,
        };

        if let Some(quote) = quotes.get(&holding.symbol) {
            // Derived fields stay in the holding's native currency.
            let current_value = &holding.quantity * &quote.current_price;
            let gain_loss = &current_value - &holding.total_cost;
            let gain_loss_percent = if holding.total_cost > BigDecimal::zero() {
                (&gain_loss / &holding.total_cost) * BigDecimal::from(100)
            } else {
                BigDecimal::zero()
            };

            total_value += to_reporting(&current_value, holding.currency)?;
            total_cost += to_reporting(&holding.total_cost, holding.currency)?;

            view.current_price = Some(quote.current_price.clone());
            view.current_value = Some(current_value);
            view.unrealized_gain_loss = Some(gain_loss);
            view.unrealized_gain_loss_percent = Some(gain_loss_percent);
        }

        views.push(view);
    }

    let total_gain_loss = &total_value - &total_cost;
    let total_gain_loss_percent = if total_cost > BigDecimal::zero() {
        Some((&total_gain_loss / &total_cost) * BigDecimal::from(100))
    } else {
        None
    };

    let mut cash = portfolio.cash_balance_cad.clone();
    if portfolio.cash_balance_usd != BigDecimal::zero() {
        cash += to_reporting(&portfolio.cash_balance_usd, Currency::Usd)?;
    }
    let total_value_with_cash = &total_value + &cash;

    Ok(PortfolioView {
        id: portfolio.id,
        user_id: portfolio.user_id,
        name: portfolio.name.clone(),
        description: portfolio.description.clone(),
        cash_balance_cad: portfolio.cash_balance_cad.clone(),
        cash_balance_usd: portfolio.cash_balance_usd.clone(),
        questrade_account_id: portfolio.questrade_account_id.clone(),
        last_questrade_sync: portfolio.last_questrade_sync,
        created_at: portfolio.created_at,
        updated_at: portfolio.updated_at,
        holdings: views,
        total_value,
        total_cost,
        total_gain_loss,
        total_gain_loss_percent,
        total_value_with_cash,
    })
}

/// Fetch holdings and quotes for a portfolio and evaluate it.
///
/// The USD/CAD rate is resolved once: the broker-pinned rate when the
/// portfolio carries one (keeps a sync batch consistent with Questrade's own
/// numbers), otherwise a live lookup — which is fatal if it fails.
pub async fn portfolio_view(
    pool: &PgPool,
    quotes: &QuoteService,
    portfolio: &Portfolio,
) -> Result<PortfolioView, AppError> {
    let holdings = db::holding_queries::fetch_by_portfolio(pool, portfolio.id).await?;

    let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
    let quote_map = quotes.get_quotes(&symbols).await;
    info!(
        "Valuing portfolio {}: {}/{} symbols quoted",
        portfolio.id,
        quote_map.len(),
        symbols.len()
    );

    let needs_rate = portfolio.cash_balance_usd != BigDecimal::zero()
        || holdings
            .iter()
            .any(|h| h.currency == Currency::Usd && quote_map.contains_key(&h.symbol));

    let usd_to_cad = if needs_rate {
        Some(resolve_usd_to_cad(quotes, portfolio).await?)
    } else {
        None
    };

    evaluate(portfolio, &holdings, &quote_map, usd_to_cad.as_ref())
}

async fn resolve_usd_to_cad(
    quotes: &QuoteService,
    portfolio: &Portfolio,
) -> Result<BigDecimal, AppError> {
    if let Some(rate) = &portfolio.questrade_forex_rate {
        if *rate > BigDecimal::zero() {
            return Ok(rate.clone());
        }
    }
    quotes.get_exchange_rate(Currency::Usd, Currency::Cad).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::quote_provider::{QuoteProvider, QuoteProviderError};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::str::FromStr;
    use std::sync::Arc;
    use uuid::Uuid;

    fn portfolio(cash_cad: i64, cash_usd: i64) -> Portfolio {
        let mut p = Portfolio::new(Uuid::new_v4(), "Test".to_string(), None);
        p.cash_balance_cad = BigDecimal::from(cash_cad);
        p.cash_balance_usd = BigDecimal::from(cash_usd);
        p
    }

    fn holding(symbol: &str, quantity: i64, total_cost: i64, currency: Currency) -> Holding {
        Holding {
            id: Uuid::new_v4(),
            portfolio_id: Uuid::nil(),
            symbol: symbol.to_string(),
            quantity: BigDecimal::from(quantity),
            average_cost: BigDecimal::from(total_cost) / BigDecimal::from(quantity),
            total_cost: BigDecimal::from(total_cost),
            currency,
            updated_at: Utc::now(),
        }
    }

    fn quote(symbol: &str, price: i64, currency: Currency) -> ExternalQuote {
        ExternalQuote {
            symbol: symbol.to_string(),
            current_price: BigDecimal::from(price),
            previous_close: None,
            open_price: None,
            day_high: None,
            day_low: None,
            volume: None,
            currency,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn unquoted_holdings_keep_null_fields_and_skip_totals() {
        let portfolio = portfolio(0, 0);
        let holdings = vec![
            holding("VTI", 10, 1000, Currency::Cad),
            holding("MYSTERY", 5, 500, Currency::Cad),
        ];
        let mut quotes = HashMap::new();
        quotes.insert("VTI".to_string(), quote("VTI", 120, Currency::Cad));

        let view = evaluate(&portfolio, &holdings, &quotes, None).unwrap();

        assert_eq!(view.total_value, BigDecimal::from(1200));
        assert_eq!(view.total_cost, BigDecimal::from(1000));
        assert_eq!(view.total_gain_loss, BigDecimal::from(200));

        let mystery = view.holdings.iter().find(|h| h.symbol == "MYSTERY").unwrap();
        assert!(mystery.current_price.is_none());
        assert!(mystery.current_value.is_none());
        assert!(mystery.unrealized_gain_loss.is_none());
    }

    #[test]
    fn usd_holdings_convert_to_cad_in_totals() {
        let portfolio = portfolio(0, 0);
        let holdings = vec![holding("AAPL", 10, 1000, Currency::Usd)];
        let mut quotes = HashMap::new();
        quotes.insert("AAPL".to_string(), quote("AAPL", 150, Currency::Usd));

        let rate = BigDecimal::from_str("1.35").unwrap();
        let view = evaluate(&portfolio, &holdings, &quotes, Some(&rate)).unwrap();

        // 10 * 150 * 1.35 and 1000 * 1.35
        assert_eq!(view.total_value, BigDecimal::from_str("2025.0").unwrap());
        assert_eq!(view.total_cost, BigDecimal::from_str("1350.0").unwrap());

        // Per-holding fields stay in USD.
        let aapl = &view.holdings[0];
        assert_eq!(aapl.current_value, Some(BigDecimal::from(1500)));
        assert_eq!(aapl.unrealized_gain_loss, Some(BigDecimal::from(500)));
    }

    #[test]
    fn missing_rate_for_usd_holding_is_fatal() {
        let portfolio = portfolio(0, 0);
        let holdings = vec![holding("AAPL", 10, 1000, Currency::Usd)];
        let mut quotes = HashMap::new();
        quotes.insert("AAPL".to_string(), quote("AAPL", 150, Currency::Usd));

        let result = evaluate(&portfolio, &holdings, &quotes, None);
        assert!(matches!(result, Err(AppError::DataUnavailable(_))));
    }

    #[test]
    fn missing_rate_is_fine_when_nothing_needs_it() {
        let portfolio = portfolio(100, 0);
        let holdings = vec![holding("VTI", 10, 1000, Currency::Cad)];
        let mut quotes = HashMap::new();
        quotes.insert("VTI".to_string(), quote("VTI", 110, Currency::Cad));

        let view = evaluate(&portfolio, &holdings, &quotes, None).unwrap();
        assert_eq!(view.total_value_with_cash, BigDecimal::from(1200));
    }

    #[test]
    fn usd_cash_converts_into_total_with_cash() {
        let portfolio = portfolio(100, 200);
        let rate = BigDecimal::from_str("1.5").unwrap();

        let view = evaluate(&portfolio, &[], &HashMap::new(), Some(&rate)).unwrap();

        // 0 value + 100 CAD cash + 200 USD * 1.5
        assert_eq!(view.total_value_with_cash, BigDecimal::from(400));
        assert!(view.total_gain_loss_percent.is_none());
    }

    // Provider whose live USD/CAD rate is recognizably different from any
    // pinned rate used in the tests below.
    struct FixedFxProvider;

    #[async_trait]
    impl QuoteProvider for FixedFxProvider {
        async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, QuoteProviderError> {
            Err(QuoteProviderError::NotFound(symbol.to_string()))
        }

        async fn fetch_fx_rate(
            &self,
            _from: Currency,
            _to: Currency,
        ) -> Result<BigDecimal, QuoteProviderError> {
            Ok(BigDecimal::from(2))
        }
    }

    #[tokio::test]
    async fn pinned_broker_rate_wins_over_live_lookup() {
        let quotes = QuoteService::new(Arc::new(FixedFxProvider), None);
        let mut p = portfolio(0, 0);
        p.questrade_forex_rate = Some(BigDecimal::from_str("1.38").unwrap());

        let rate = resolve_usd_to_cad(&quotes, &p).await.unwrap();
        assert_eq!(rate, BigDecimal::from_str("1.38").unwrap());
    }

    #[tokio::test]
    async fn non_positive_pinned_rate_falls_back_to_live_lookup() {
        let quotes = QuoteService::new(Arc::new(FixedFxProvider), None);

        let mut zero_pin = portfolio(0, 0);
        zero_pin.questrade_forex_rate = Some(BigDecimal::zero());
        let rate = resolve_usd_to_cad(&quotes, &zero_pin).await.unwrap();
        assert_eq!(rate, BigDecimal::from(2));

        let unpinned = portfolio(0, 0);
        let rate = resolve_usd_to_cad(&quotes, &unpinned).await.unwrap();
        assert_eq!(rate, BigDecimal::from(2));
    }

    #[test]
    fn zero_cost_leaves_percent_unset() {
        let portfolio = portfolio(0, 0);
        let holdings = vec![holding("FREE", 10, 0, Currency::Cad)];
        let mut quotes = HashMap::new();
        quotes.insert("FREE".to_string(), quote("FREE", 5, Currency::Cad));

        let view = evaluate(&portfolio, &holdings, &quotes, None).unwrap();
        assert!(view.total_gain_loss_percent.is_none());
        assert_eq!(
            view.holdings[0].unrealized_gain_loss_percent,
            Some(BigDecimal::zero())
        );
    }
}
