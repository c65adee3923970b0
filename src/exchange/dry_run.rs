//! Dry-run wrapper: live market reads, simulated side effects.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use super::types::{BookLimits, FeeSchedule};
use super::ExchangeClient;
use crate::error::ExchangeError;
use crate::orderbook::InnermostBook;
use crate::trading::{Balances, OpenOrder, OrderAck, OrderIntent};

/// Forwards reads to the inner client and never places or cancels orders.
///
/// Simulated orders are treated as filled immediately, so the account never
/// shows open orders.
#[derive(Debug)]
pub struct DryRunExchange<E> {
    inner: E,
    simulated: AtomicU64,
}

impl<E: ExchangeClient> DryRunExchange<E> {
    /// Wrap an exchange client.
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            simulated: AtomicU64::new(0),
        }
    }

    /// Number of simulated placements so far.
    pub fn simulated_orders(&self) -> u64 {
        self.simulated.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<E: ExchangeClient> ExchangeClient for DryRunExchange<E> {
    async fn get_order_book_innermost(&self, pair: &str) -> Result<InnermostBook, ExchangeError> {
        self.inner.get_order_book_innermost(pair).await
    }

    async fn get_ticker_last_price(&self, pair: &str) -> Result<Decimal, ExchangeError> {
        self.inner.get_ticker_last_price(pair).await
    }

    async fn get_fees(&self, pairs: &[String]) -> Result<FeeSchedule, ExchangeError> {
        self.inner.get_fees(pairs).await
    }

    async fn get_balances(&self, assets: &[String]) -> Result<Balances, ExchangeError> {
        self.inner.get_balances(assets).await
    }

    async fn get_available_books(
        &self,
        pairs: &[String],
    ) -> Result<HashMap<String, BookLimits>, ExchangeError> {
        self.inner.get_available_books(pairs).await
    }

    async fn list_open_orders(&self) -> Result<Vec<OpenOrder>, ExchangeError> {
        Ok(Vec::new())
    }

    async fn cancel_all_orders(&self) -> Result<Vec<String>, ExchangeError> {
        info!("[DRY RUN] Would cancel all open orders");
        Ok(Vec::new())
    }

    async fn place_order(&self, intent: &OrderIntent) -> Result<OrderAck, ExchangeError> {
        intent.validate().map_err(|reason| ExchangeError::Rejected {
            pair: intent.pair.clone(),
            reason,
        })?;

        let n = self.simulated.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            pair = %intent.pair,
            side = %intent.side,
            price = %intent.price,
            amount = %intent.amount,
            notional = %intent.notional(),
            "[DRY RUN] Would place order"
        );

        Ok(OrderAck {
            order_id: format!("dry-run-{}", n),
            pair: intent.pair.clone(),
            side: intent.side,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::MockExchange;
    use crate::trading::Side;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn reads_pass_through_and_writes_are_simulated() {
        let mock = MockExchange::builder()
            .book("eth_btc", (dec!(0.05), dec!(2)), (dec!(0.051), dec!(3)))
            .open_orders([2])
            .build();
        let dry = DryRunExchange::new(mock.clone());

        let book = dry.get_order_book_innermost("eth_btc").await.unwrap();
        assert_eq!(book.ask.price, dec!(0.051));

        let intent = OrderIntent::limit("eth_btc", Side::Buy, dec!(0.051), dec!(1));
        let ack = dry.place_order(&intent).await.unwrap();
        assert_eq!(ack.order_id, "dry-run-1");
        assert_eq!(dry.simulated_orders(), 1);

        assert!(dry.list_open_orders().await.unwrap().is_empty());
        assert!(dry.cancel_all_orders().await.unwrap().is_empty());

        assert!(mock.placed_orders().is_empty());
        assert_eq!(mock.cancel_all_calls(), 0);
        assert_eq!(mock.list_open_orders_calls(), 0);
    }
}
