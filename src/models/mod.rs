mod user;
mod portfolio;
mod transaction;
mod holding;
mod questrade;

pub use user::{User, RegisterRequest, LoginRequest, TokenResponse, UserResponse};
pub use portfolio::{Portfolio, CreatePortfolio, UpdatePortfolio, UpdateCashBalances, PortfolioSummary};
pub use transaction::{Transaction, TransactionType, Currency, CreateTransaction, UpdateTransaction};
pub use holding::{Holding, HoldingView, PortfolioView};
pub use questrade::{
    QuestradeConnection, ConnectRequest, SyncRequest, SyncReport,
    QtAuthResponse, QtAccount, QtAccountList, QtPosition, QtPositionList,
    QtBalance, QtBalances, QtActivity, QtActivityList,
};
