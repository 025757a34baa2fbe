use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{advisor, auth, health, portfolios, questrade, stocks, transactions};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/auth", auth::router())
        .nest("/api/portfolios", portfolios::router())
        .nest("/api/transactions", transactions::router())
        .nest("/api/stocks", stocks::router())
        .nest("/api/questrade", questrade::router())
        .nest("/api/advisor", advisor::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
