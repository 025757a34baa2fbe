pub mod advisor;
pub mod auth;
pub mod health;
pub mod portfolios;
pub mod questrade;
pub mod stocks;
pub mod transactions;
