pub mod user_queries;
pub mod portfolio_queries;
pub mod holding_queries;
pub mod transaction_queries;
pub mod questrade_queries;
