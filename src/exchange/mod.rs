//! Exchange access.
//!
//! The [`ExchangeClient`] trait is the only way the engine touches the
//! exchange. Implementations:
//! - [`BitsoClient`]: authenticated Bitso REST v3 client
//! - [`DryRunExchange`]: live reads, simulated order side effects
//! - [`MockExchange`]: scripted in-memory exchange for tests

pub mod bitso;
pub mod dry_run;
pub mod mock;
pub mod types;

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::ExchangeError;
use crate::orderbook::InnermostBook;
use crate::trading::{Balances, OpenOrder, OrderAck, OrderIntent};

pub use bitso::BitsoClient;
pub use dry_run::DryRunExchange;
pub use mock::{MockExchange, MockExchangeBuilder};
pub use types::{BookLimits, FeeSchedule};

/// Authenticated access to one exchange account.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Best bid and ask for a pair. Fails with
    /// [`ExchangeError::IncompleteBook`] if either side is missing.
    async fn get_order_book_innermost(&self, pair: &str) -> Result<InnermostBook, ExchangeError>;

    /// Price of the most recent trade on a pair.
    async fn get_ticker_last_price(&self, pair: &str) -> Result<Decimal, ExchangeError>;

    /// Taker fees for the given pairs.
    async fn get_fees(&self, pairs: &[String]) -> Result<FeeSchedule, ExchangeError>;

    /// Available balances for the given assets.
    async fn get_balances(&self, assets: &[String]) -> Result<Balances, ExchangeError>;

    /// Minimum and maximum trade amounts for the given pairs.
    async fn get_available_books(
        &self,
        pairs: &[String],
    ) -> Result<HashMap<String, BookLimits>, ExchangeError>;

    /// All open orders of the account.
    async fn list_open_orders(&self) -> Result<Vec<OpenOrder>, ExchangeError>;

    /// Cancel every open order, returning the cancelled ids.
    async fn cancel_all_orders(&self) -> Result<Vec<String>, ExchangeError>;

    /// Place one order. A rejection is an error.
    async fn place_order(&self, intent: &OrderIntent) -> Result<OrderAck, ExchangeError>;
}
