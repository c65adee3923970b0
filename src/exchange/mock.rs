//! Mock exchange for unit and integration testing.
//!
//! State lives behind an `Arc<Mutex<_>>`, so a clone handed to the engine and
//! a clone kept by the test observe the same books, orders and counters.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::types::{BookLimits, FeeSchedule};
use super::ExchangeClient;
use crate::error::ExchangeError;
use crate::orderbook::{BookSide, InnermostBook, PriceLevel};
use crate::trading::{Balances, OpenOrder, OrderAck, OrderIntent, Side};

/// Which call should fail.
#[derive(Debug, Clone, Default)]
pub struct MockFailures {
    /// Fail order book and ticker requests.
    pub books: bool,
    /// Fail fee requests.
    pub fees: bool,
    /// Fail balance requests.
    pub balances: bool,
    /// Fail open order listing.
    pub open_orders: bool,
    /// Fail cancel-all.
    pub cancel_all: bool,
    /// Reject the n-th placement (zero-based, counted over the mock's life).
    pub reject_placement: Option<usize>,
}

#[derive(Debug, Default)]
struct MockState {
    books: HashMap<String, InnermostBook>,
    thin_books: HashMap<String, BookSide>,
    fees: FeeSchedule,
    balances: Balances,
    limits: HashMap<String, BookLimits>,
    open_orders: Vec<OpenOrder>,
    open_order_script: VecDeque<usize>,
    resting_orders: bool,
    failures: MockFailures,
    placed: Vec<OrderIntent>,
    placement_attempts: usize,
    cancel_all_calls: usize,
    list_open_orders_calls: usize,
    book_requests: usize,
    last_prices: HashMap<String, Decimal>,
}

/// Scripted in-memory exchange.
#[derive(Debug, Clone, Default)]
pub struct MockExchange {
    state: Arc<Mutex<MockState>>,
}

impl MockExchange {
    /// Create an empty mock exchange.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a mock exchange.
    pub fn builder() -> MockExchangeBuilder {
        MockExchangeBuilder::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set the innermost book for a pair.
    pub fn set_book(&self, pair: &str, bid: (Decimal, Decimal), ask: (Decimal, Decimal)) {
        let book = InnermostBook::new(
            pair,
            PriceLevel::new(bid.0, bid.1),
            PriceLevel::new(ask.0, ask.1),
        );
        let mut state = self.state();
        state.thin_books.remove(pair);
        state.books.insert(pair.to_string(), book);
    }

    /// Make a pair's book report a missing side.
    pub fn set_thin_book(&self, pair: &str, side: BookSide) {
        self.state().thin_books.insert(pair.to_string(), side);
    }

    /// Set the available balance for an asset.
    pub fn set_balance(&self, asset: &str, available: Decimal) {
        self.state().balances.insert(asset, available);
    }

    /// Replace the failure configuration.
    pub fn set_failures(&self, failures: MockFailures) {
        self.state().failures = failures;
    }

    /// Queue open order counts returned by successive listings.
    pub fn script_open_orders(&self, counts: impl IntoIterator<Item = usize>) {
        self.state().open_order_script.extend(counts);
    }

    /// Drop every resting order, as if all of them filled.
    pub fn fill_all(&self) {
        self.state().open_orders.clear();
    }

    /// Orders accepted so far, in placement order.
    pub fn placed_orders(&self) -> Vec<OrderIntent> {
        self.state().placed.clone()
    }

    /// Number of placement attempts, including rejected ones.
    pub fn placement_attempts(&self) -> usize {
        self.state().placement_attempts
    }

    /// Number of cancel-all calls.
    pub fn cancel_all_calls(&self) -> usize {
        self.state().cancel_all_calls
    }

    /// Number of open order listings.
    pub fn list_open_orders_calls(&self) -> usize {
        self.state().list_open_orders_calls
    }

    /// Number of order book requests.
    pub fn book_requests(&self) -> usize {
        self.state().book_requests
    }

}

fn mock_failure(what: &str) -> ExchangeError {
    ExchangeError::Status {
        endpoint: what.to_string(),
        status: 503,
        body: format!("mock {} failure", what),
    }
}

fn synthetic_open_order(n: usize) -> OpenOrder {
    OpenOrder {
        order_id: format!("scripted-{}", n),
        pair: "scripted".to_string(),
        side: Side::Buy,
        price: Decimal::ONE,
        original_amount: Decimal::ONE,
        unfilled_amount: Decimal::ONE,
    }
}

#[async_trait]
impl ExchangeClient for MockExchange {
    async fn get_order_book_innermost(&self, pair: &str) -> Result<InnermostBook, ExchangeError> {
        let mut state = self.state();
        state.book_requests += 1;

        if state.failures.books {
            return Err(mock_failure("order_book"));
        }
        if let Some(side) = state.thin_books.get(pair) {
            return Err(ExchangeError::IncompleteBook {
                pair: pair.to_string(),
                side: *side,
            });
        }
        state
            .books
            .get(pair)
            .cloned()
            .ok_or_else(|| ExchangeError::UnknownPair(pair.to_string()))
    }

    async fn get_ticker_last_price(&self, pair: &str) -> Result<Decimal, ExchangeError> {
        let state = self.state();
        if state.failures.books {
            return Err(mock_failure("ticker"));
        }
        state
            .last_prices
            .get(pair)
            .copied()
            .ok_or_else(|| ExchangeError::UnknownPair(pair.to_string()))
    }

    async fn get_fees(&self, pairs: &[String]) -> Result<FeeSchedule, ExchangeError> {
        let state = self.state();
        if state.failures.fees {
            return Err(mock_failure("fees"));
        }
        Ok(pairs
            .iter()
            .filter_map(|p| state.fees.taker_fee(p).map(|fee| (p.clone(), fee)))
            .collect())
    }

    async fn get_balances(&self, assets: &[String]) -> Result<Balances, ExchangeError> {
        let state = self.state();
        if state.failures.balances {
            return Err(mock_failure("balance"));
        }
        let mut balances = state.balances.clone();
        if !assets.is_empty() {
            balances.retain_assets(assets);
        }
        Ok(balances)
    }

    async fn get_available_books(
        &self,
        pairs: &[String],
    ) -> Result<HashMap<String, BookLimits>, ExchangeError> {
        let state = self.state();
        Ok(state
            .limits
            .iter()
            .filter(|(pair, _)| pairs.is_empty() || pairs.contains(pair))
            .map(|(pair, limits)| (pair.clone(), *limits))
            .collect())
    }

    async fn list_open_orders(&self) -> Result<Vec<OpenOrder>, ExchangeError> {
        let mut state = self.state();
        state.list_open_orders_calls += 1;

        if state.failures.open_orders {
            return Err(mock_failure("open_orders"));
        }
        if let Some(count) = state.open_order_script.pop_front() {
            return Ok((0..count).map(synthetic_open_order).collect());
        }
        Ok(state.open_orders.clone())
    }

    async fn cancel_all_orders(&self) -> Result<Vec<String>, ExchangeError> {
        let mut state = self.state();
        state.cancel_all_calls += 1;

        if state.failures.cancel_all {
            return Err(mock_failure("orders/all"));
        }
        Ok(state
            .open_orders
            .drain(..)
            .map(|order| order.order_id)
            .collect())
    }

    async fn place_order(&self, intent: &OrderIntent) -> Result<OrderAck, ExchangeError> {
        let mut state = self.state();
        let attempt = state.placement_attempts;
        state.placement_attempts += 1;

        if state.failures.reject_placement == Some(attempt) {
            return Err(ExchangeError::Rejected {
                pair: intent.pair.clone(),
                reason: "mock rejection".to_string(),
            });
        }
        intent.validate().map_err(|reason| ExchangeError::Rejected {
            pair: intent.pair.clone(),
            reason,
        })?;

        let order_id = format!("mock-{}", attempt + 1);
        if state.resting_orders {
            state.open_orders.push(OpenOrder {
                order_id: order_id.clone(),
                pair: intent.pair.clone(),
                side: intent.side,
                price: intent.price,
                original_amount: intent.amount,
                unfilled_amount: intent.amount,
            });
        }
        state.placed.push(intent.clone());

        Ok(OrderAck {
            order_id,
            pair: intent.pair.clone(),
            side: intent.side,
        })
    }
}

/// Builder for [`MockExchange`].
#[derive(Debug, Default)]
pub struct MockExchangeBuilder {
    state: MockState,
}

impl MockExchangeBuilder {
    /// Innermost book for a pair as `(price, amount)` tuples.
    pub fn book(mut self, pair: &str, bid: (Decimal, Decimal), ask: (Decimal, Decimal)) -> Self {
        self.state.books.insert(
            pair.to_string(),
            InnermostBook::new(
                pair,
                PriceLevel::new(bid.0, bid.1),
                PriceLevel::new(ask.0, ask.1),
            ),
        );
        self
    }

    /// Taker fee for a pair.
    pub fn fee(mut self, pair: &str, fee: Decimal) -> Self {
        self.state.fees.insert(pair, fee);
        self
    }

    /// Available balance for an asset.
    pub fn balance(mut self, asset: &str, available: Decimal) -> Self {
        self.state.balances.insert(asset, available);
        self
    }

    /// Trade size bounds for a pair.
    pub fn limits(mut self, pair: &str, minimum: Decimal, maximum: Decimal) -> Self {
        self.state
            .limits
            .insert(pair.to_string(), BookLimits::new(minimum, maximum));
        self
    }

    /// Keep placed orders open until [`MockExchange::fill_all`] is called.
    pub fn resting_orders(mut self) -> Self {
        self.state.resting_orders = true;
        self
    }

    /// Queue open order counts returned by successive listings.
    pub fn open_orders(mut self, counts: impl IntoIterator<Item = usize>) -> Self {
        self.state.open_order_script.extend(counts);
        self
    }

    /// Failure configuration.
    pub fn failures(mut self, failures: MockFailures) -> Self {
        self.state.failures = failures;
        self
    }

    /// Last traded price for a pair.
    pub fn last_price(mut self, pair: &str, price: Decimal) -> Self {
        self.state.last_prices.insert(pair.to_string(), price);
        self
    }

    /// Build the exchange.
    pub fn build(self) -> MockExchange {
        MockExchange {
            state: Arc::new(Mutex::new(self.state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn exchange() -> MockExchange {
        MockExchange::builder()
            .book("eth_btc", (dec!(0.05), dec!(2)), (dec!(0.051), dec!(3)))
            .fee("eth_btc", dec!(0.001))
            .balance("btc", dec!(1))
            .limits("eth_btc", dec!(0.001), dec!(100))
            .last_price("eth_btc", dec!(0.0505))
            .build()
    }

    #[tokio::test]
    async fn serves_scripted_reads() {
        let exchange = exchange();
        let pairs = vec!["eth_btc".to_string()];

        let book = exchange.get_order_book_innermost("eth_btc").await.unwrap();
        assert_eq!(book.bid.price, dec!(0.05));
        assert_eq!(
            exchange.get_fees(&pairs).await.unwrap().taker_fee("eth_btc"),
            Some(dec!(0.001))
        );
        assert_eq!(
            exchange.get_balances(&[]).await.unwrap().available("btc"),
            dec!(1)
        );
        assert!(exchange
            .get_available_books(&pairs)
            .await
            .unwrap()
            .contains_key("eth_btc"));
        assert_eq!(
            exchange.get_ticker_last_price("eth_btc").await.unwrap(),
            dec!(0.0505)
        );
        assert!(matches!(
            exchange.get_order_book_innermost("xrp_btc").await,
            Err(ExchangeError::UnknownPair(_))
        ));
        assert!(matches!(
            exchange.get_ticker_last_price("xrp_btc").await,
            Err(ExchangeError::UnknownPair(_))
        ));
    }

    #[tokio::test]
    async fn thin_book_is_incomplete() {
        let exchange = exchange();
        exchange.set_thin_book("eth_btc", BookSide::Bid);
        let err = exchange.get_order_book_innermost("eth_btc").await.unwrap_err();
        assert!(err.is_incomplete_book());
    }

    #[tokio::test]
    async fn open_order_script_then_resting_orders() {
        let exchange = MockExchange::builder().open_orders([4, 1]).build();

        assert_eq!(exchange.list_open_orders().await.unwrap().len(), 4);
        assert_eq!(exchange.list_open_orders().await.unwrap().len(), 1);
        assert!(exchange.list_open_orders().await.unwrap().is_empty());
        assert_eq!(exchange.list_open_orders_calls(), 3);
    }

    #[tokio::test]
    async fn placement_rejection_by_index() {
        let exchange = MockExchange::builder()
            .resting_orders()
            .failures(MockFailures {
                reject_placement: Some(1),
                ..Default::default()
            })
            .build();
        let intent = OrderIntent::limit("eth_btc", Side::Sell, dec!(0.05), dec!(1));

        assert_eq!(exchange.place_order(&intent).await.unwrap().order_id, "mock-1");
        assert!(matches!(
            exchange.place_order(&intent).await,
            Err(ExchangeError::Rejected { .. })
        ));
        assert_eq!(exchange.placement_attempts(), 2);
        assert_eq!(exchange.placed_orders().len(), 1);
        assert_eq!(exchange.list_open_orders().await.unwrap().len(), 1);

        let cancelled = exchange.cancel_all_orders().await.unwrap();
        assert_eq!(cancelled, vec!["mock-1".to_string()]);
        assert_eq!(exchange.cancel_all_calls(), 1);
    }
}
