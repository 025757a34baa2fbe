pub mod auth_service;
pub mod portfolio_service;
pub mod transaction_service;
pub mod holdings_service;
pub mod valuation_service;
pub mod quote_service;
pub mod questrade_service;
pub mod questrade_sync_service;
pub mod advisor_service;
