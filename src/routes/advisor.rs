use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::services::auth_service::CurrentUser;
use crate::services::portfolio_service;
use crate::state::AppState;

const RECENT_TRANSACTION_LIMIT: i64 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/portfolios/:id/analysis", post(analyze_portfolio))
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub portfolio_id: Uuid,
    pub analysis: String,
}

pub async fn analyze_portfolio(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, AppError> {
    info!("POST /advisor/portfolios/{}/analysis - Generating analysis", id);

    let view =
        portfolio_service::get_with_performance(&state.pool, &state.quotes, id, user.id).await?;
    let recent =
        db::transaction_queries::fetch_recent(&state.pool, id, RECENT_TRANSACTION_LIMIT).await?;

    let analysis = state
        .advisor
        .analyze_portfolio(&view, &recent)
        .await
        .map_err(|e| {
            error!("Advisor analysis failed for portfolio {}: {}", id, e);
            AppError::from(e)
        })?;

    Ok(Json(AnalysisResponse {
        portfolio_id: id,
        analysis,
    }))
}
