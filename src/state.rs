use std::sync::Arc;

use sqlx::PgPool;

use crate::external::questrade::QuestradeClient;
use crate::services::advisor_service::AdvisorService;
use crate::services::auth_service::AuthConfig;
use crate::services::quote_service::QuoteService;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub quotes: QuoteService,
    pub questrade: Arc<QuestradeClient>,
    pub advisor: Arc<AdvisorService>,
    pub auth: AuthConfig,
}
