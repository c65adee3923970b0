//! Triangular arbitrage engine for a single Bitso account.
//!
//! Three pairs that close a loop over three assets, e.g. `eth_mxn`, `eth_btc`
//! and `btc_mxn`, can be traded around the loop in either direction. When the
//! product of the fee-adjusted conversion rates exceeds one, the account ends
//! the loop holding more of the starting asset than it began with.
//!
//! ```text
//! BidRoute: mxn -buy eth_mxn-> eth -sell eth_btc-> btc -sell btc_mxn-> mxn
//! factor  = 1/ask(eth_mxn) * bid(eth_btc) * bid(btc_mxn) * (1-fee)^3
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Trading pairs and the configured triangle
//! - [`orderbook`]: Innermost book types
//! - [`exchange`]: Exchange client trait, Bitso, dry-run and mock clients
//! - [`signing`]: Bitso request signing
//! - [`arbitrage`]: Snapshot, route evaluation, sizing and the engine loop
//! - [`trading`]: Orders, balances and leg placement
//! - [`notify`]: Operator notifications
//! - [`clock`]: Injectable time source
//! - [`metrics`]: Prometheus metrics
//! - [`api`]: HTTP API for health/status

pub mod api;
pub mod arbitrage;
pub mod clock;
pub mod config;
pub mod error;
pub mod exchange;
pub mod market;
pub mod metrics;
pub mod notify;
pub mod orderbook;
pub mod signing;
pub mod trading;

pub use config::Config;
pub use error::{BotError, Result};
