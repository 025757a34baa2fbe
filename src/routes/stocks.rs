use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use bigdecimal::BigDecimal;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::external::quote_provider::ExternalQuote;
use crate::models::Currency;
use crate::services::auth_service::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:symbol/price", get(get_price))
        .route("/exchange-rate/:from/:to", get(get_exchange_rate))
}

pub async fn get_price(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(symbol): Path<String>,
) -> Result<Json<ExternalQuote>, AppError> {
    info!("GET /stocks/{}/price - Fetching quote", symbol);
    let quote = state.quotes.get_quote(&symbol).await?;
    Ok(Json(quote))
}

#[derive(Debug, Serialize)]
pub struct ExchangeRateResponse {
    pub from_currency: Currency,
    pub to_currency: Currency,
    pub rate: BigDecimal,
}

pub async fn get_exchange_rate(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path((from, to)): Path<(String, String)>,
) -> Result<Json<ExchangeRateResponse>, AppError> {
    info!("GET /stocks/exchange-rate/{}/{} - Fetching rate", from, to);
    let from = parse_currency(&from)?;
    let to = parse_currency(&to)?;
    let rate = state.quotes.get_exchange_rate(from, to).await?;
    Ok(Json(ExchangeRateResponse {
        from_currency: from,
        to_currency: to,
        rate,
    }))
}

fn parse_currency(value: &str) -> Result<Currency, AppError> {
    match value.to_uppercase().as_str() {
        "CAD" => Ok(Currency::Cad),
        "USD" => Ok(Currency::Usd),
        other => Err(AppError::Validation(format!("Unsupported currency: {other}"))),
    }
}
