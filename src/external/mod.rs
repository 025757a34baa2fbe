pub mod quote_provider;
pub mod yahoo;
pub mod questrade;
