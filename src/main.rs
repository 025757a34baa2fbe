mod app;
mod db;
mod errors;
mod external;
mod jobs;
mod logging;
mod models;
mod routes;
mod services;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use crate::external::questrade::QuestradeClient;
use crate::external::quote_provider::QuoteProvider;
use crate::external::yahoo::YahooProvider;
use crate::services::advisor_service::{AdvisorConfig, AdvisorService};
use crate::services::auth_service::AuthConfig;
use crate::services::quote_service::QuoteService;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    logging::init_logging(logging::LoggingConfig::from_env())?;

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let quote_ttl = std::env::var("QUOTE_CACHE_TTL_SECS")
        .ok()
        .and_then(|v| v.parse().ok());
    let provider: Arc<dyn QuoteProvider> = Arc::new(YahooProvider::new());
    let quotes = QuoteService::new(provider, quote_ttl);

    let state = AppState {
        pool,
        quotes,
        questrade: Arc::new(QuestradeClient::new()),
        advisor: Arc::new(AdvisorService::new(AdvisorConfig::from_env())),
        auth: AuthConfig::from_env()?,
    };

    let _scheduler = jobs::start(state.clone()).await?;

    let app = app::create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Trackfolio backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
