//! Trading module for order management and execution.
//!
//! This module handles:
//! - Order intents, open orders and acknowledgements
//! - Account balances
//! - Sequential leg placement and cancellation
//! - Balances valued in the anchor asset

pub mod balance;
pub mod execution;
pub mod order;
pub mod valuation;

pub use balance::Balances;
pub use execution::{cancel_all, place_intents};
pub use order::{OpenOrder, OrderAck, OrderIntent, OrderType, Side};
pub use valuation::{value_balances, AssetValuation, PortfolioValuation};
