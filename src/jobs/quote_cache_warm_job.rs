//! Pre-fetches quotes for every symbol currently held in any portfolio, so
//! interactive valuation requests mostly hit the cache.

use tracing::info;

use crate::db;
use crate::errors::AppError;
use crate::state::AppState;

pub async fn run(state: &AppState) -> Result<(), AppError> {
    let symbols = db::holding_queries::fetch_distinct_symbols(&state.pool).await?;

    if symbols.is_empty() {
        info!("Quote cache warm: no held symbols, nothing to do");
        return Ok(());
    }

    info!("Quote cache warm: fetching {} symbols", symbols.len());
    let (warmed, failed) = state.quotes.warm(&symbols).await;
    info!("Quote cache warm complete: {} warmed, {} failed", warmed, failed);

    Ok(())
}
