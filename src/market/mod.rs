//! Market module describing the configured triangle.
//!
//! This module handles:
//! - Trading pair identifiers and their base/quote assets
//! - Validation that three pairs form a closed triangle

pub mod types;

pub use types::{Triangle, TradingPair, LEGS};
