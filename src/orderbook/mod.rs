//! Order book module for top-of-book market data.

pub mod types;

pub use types::{BookSide, InnermostBook, PriceLevel};
