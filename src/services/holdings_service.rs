use std::collections::BTreeMap;

use bigdecimal::{BigDecimal, Zero};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{Currency, Transaction, TransactionType};

#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedHolding {
    pub quantity: BigDecimal,
    pub average_cost: BigDecimal,
    pub total_cost: BigDecimal,
    pub currency: Currency,
}

/// Fold a portfolio's transaction list into per-symbol positions.
///
/// One pass in date order (ties broken by insertion order). Sells reduce the
/// cost basis proportionally at the pre-sale average cost; dividends reduce
/// the cost basis directly instead of being booked as income. Symbols whose
/// final quantity is not positive are dropped. Re-running on the same list
/// always yields the same result.
pub fn reconstruct(transactions: &[Transaction]) -> BTreeMap<String, ReconstructedHolding> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by(|a, b| {
        a.transaction_date
            .cmp(&b.transaction_date)
            .then(a.created_at.cmp(&b.created_at))
    });

    let mut holdings: BTreeMap<String, ReconstructedHolding> = BTreeMap::new();

    for txn in ordered {
        let symbol = txn.symbol.to_uppercase();
        let entry = holdings.entry(symbol).or_insert_with(|| ReconstructedHolding {
            quantity: BigDecimal::zero(),
            average_cost: BigDecimal::zero(),
            total_cost: BigDecimal::zero(),
            // Currency pinned by the first transaction seen for the symbol.
            currency: txn.currency,
        });

        match txn.transaction_type {
            TransactionType::Buy => {
                entry.quantity += &txn.quantity;
                entry.total_cost += &txn.total_amount;
                entry.average_cost = if entry.quantity > BigDecimal::zero() {
                    &entry.total_cost / &entry.quantity
                } else {
                    BigDecimal::zero()
                };
            }
            TransactionType::Sell => {
                entry.quantity -= &txn.quantity;
                if entry.quantity > BigDecimal::zero() {
                    // Pre-sale average cost; realized gain/loss is not tracked.
                    entry.total_cost -= &entry.average_cost * &txn.quantity;
                    entry.average_cost = &entry.total_cost / &entry.quantity;
                } else {
                    // Position closed. No short support.
                    entry.total_cost = BigDecimal::zero();
                    entry.average_cost = BigDecimal::zero();
                }
            }
            TransactionType::Dividend => {
                entry.total_cost -= &txn.total_amount;
                if entry.quantity > BigDecimal::zero() {
                    entry.average_cost = &entry.total_cost / &entry.quantity;
                }
            }
        }
    }

    holdings.retain(|_, h| h.quantity > BigDecimal::zero());
    holdings
}

/// Rebuild the holdings table for a portfolio from its transaction log.
///
/// Holdings are never the source of truth: every mutation triggers this full
/// recompute, upserting rows for surviving symbols and deleting rows for
/// symbols that were fully sold.
pub async fn sync_holdings(pool: &PgPool, portfolio_id: Uuid) -> Result<(), AppError> {
    let transactions = db::transaction_queries::fetch_by_portfolio(pool, portfolio_id).await?;
    let calculated = reconstruct(&transactions);

    let existing = db::holding_queries::fetch_by_portfolio(pool, portfolio_id).await?;

    for (symbol, holding) in &calculated {
        db::holding_queries::upsert(
            pool,
            portfolio_id,
            symbol,
            &holding.quantity,
            &holding.average_cost,
            &holding.total_cost,
            holding.currency,
        )
        .await?;
    }

    for stale in existing.iter().filter(|h| !calculated.contains_key(&h.symbol)) {
        db::holding_queries::delete_one(pool, portfolio_id, &stale.symbol).await?;
    }

    info!(
        "Rebuilt holdings for portfolio {}: {} symbols from {} transactions",
        portfolio_id,
        calculated.len(),
        transactions.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn txn(
        symbol: &str,
        kind: TransactionType,
        quantity: i64,
        price: i64,
        fees: i64,
        day_offset: i64,
    ) -> Transaction {
        Transaction::new(
            Uuid::nil(),
            symbol.to_string(),
            kind,
            BigDecimal::from(quantity),
            BigDecimal::from(price),
            Currency::Cad,
            BigDecimal::from(fees),
            Utc::now() + Duration::days(day_offset),
            None,
        )
    }

    #[test]
    fn buys_accumulate_and_average() {
        let transactions = vec![
            txn("VTI", TransactionType::Buy, 10, 100, 0, 0),
            txn("VTI", TransactionType::Buy, 10, 200, 0, 1),
        ];
        let holdings = reconstruct(&transactions);

        let vti = &holdings["VTI"];
        assert_eq!(vti.quantity, BigDecimal::from(20));
        assert_eq!(vti.total_cost, BigDecimal::from(3000));
        assert_eq!(vti.average_cost, BigDecimal::from(150));
    }

    #[test]
    fn fees_are_part_of_the_cost_basis() {
        let transactions = vec![txn("VTI", TransactionType::Buy, 10, 100, 10, 0)];
        let holdings = reconstruct(&transactions);

        assert_eq!(holdings["VTI"].total_cost, BigDecimal::from(1010));
        assert_eq!(holdings["VTI"].average_cost, BigDecimal::from(101));
    }

    #[test]
    fn sell_reduces_cost_at_pre_sale_average() {
        let transactions = vec![
            txn("VTI", TransactionType::Buy, 10, 100, 0, 0),
            txn("VTI", TransactionType::Sell, 4, 120, 0, 1),
        ];
        let holdings = reconstruct(&transactions);

        let vti = &holdings["VTI"];
        assert_eq!(vti.quantity, BigDecimal::from(6));
        assert_eq!(vti.total_cost, BigDecimal::from(600));
        assert_eq!(vti.average_cost, BigDecimal::from(100));
    }

    #[test]
    fn fully_sold_symbol_is_dropped() {
        let transactions = vec![
            txn("VTI", TransactionType::Buy, 10, 100, 0, 0),
            txn("VTI", TransactionType::Sell, 10, 120, 0, 1),
            txn("XEQT", TransactionType::Buy, 5, 30, 0, 0),
        ];
        let holdings = reconstruct(&transactions);

        assert!(!holdings.contains_key("VTI"));
        assert!(holdings.contains_key("XEQT"));
    }

    #[test]
    fn dividend_reduces_cost_basis_and_average() {
        let transactions = vec![
            txn("VTI", TransactionType::Buy, 10, 100, 0, 0),
            txn("VTI", TransactionType::Dividend, 1, 50, 0, 1),
        ];
        let holdings = reconstruct(&transactions);

        let vti = &holdings["VTI"];
        assert_eq!(vti.quantity, BigDecimal::from(10));
        assert_eq!(vti.total_cost, BigDecimal::from(950));
        assert_eq!(vti.average_cost, BigDecimal::from(95));
    }

    #[test]
    fn input_order_does_not_matter() {
        let buy_early = txn("VTI", TransactionType::Buy, 10, 100, 0, 0);
        let sell_later = txn("VTI", TransactionType::Sell, 4, 120, 0, 5);

        let forward = reconstruct(&[buy_early.clone(), sell_later.clone()]);
        let reversed = reconstruct(&[sell_later, buy_early]);

        assert_eq!(forward, reversed);
        assert_eq!(forward["VTI"].quantity, BigDecimal::from(6));
    }

    #[test]
    fn reconstruction_is_idempotent() {
        let transactions = vec![
            txn("VTI", TransactionType::Buy, 10, 100, 5, 0),
            txn("VTI", TransactionType::Dividend, 1, 25, 0, 1),
            txn("XEQT", TransactionType::Buy, 3, 30, 0, 2),
        ];

        assert_eq!(reconstruct(&transactions), reconstruct(&transactions));
    }
}
