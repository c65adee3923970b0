//! Unified error types for the arbitrage bot.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::orderbook::BookSide;

/// Unified error type for the arbitrage bot.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Exchange read or write error.
    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    /// Orchestrator error.
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),
}

/// Errors raised by an [`ExchangeClient`](crate::exchange::ExchangeClient).
///
/// Everything except [`IncompleteBook`](ExchangeError::IncompleteBook) and
/// [`Rejected`](ExchangeError::Rejected) is a transport failure.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// HTTP request failed before a response was received.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        /// Endpoint that failed.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        body: String,
    },

    /// Exchange answered with `success: false`.
    #[error("exchange error {code}: {message}")]
    Api {
        /// Exchange error code.
        code: String,
        /// Exchange error message.
        message: String,
    },

    /// Response could not be parsed.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Request could not be signed.
    #[error("signing error: {0}")]
    Signing(String),

    /// The exchange has no data for a configured pair.
    #[error("no data for pair {0}")]
    UnknownPair(String),

    /// The order book is missing its innermost bid or ask.
    #[error("order book {pair} has no usable {side}")]
    IncompleteBook {
        /// Pair whose book is thin.
        pair: String,
        /// Side that is missing.
        side: BookSide,
    },

    /// Order placement was rejected.
    #[error("order on {pair} rejected: {reason}")]
    Rejected {
        /// Pair of the rejected order.
        pair: String,
        /// Rejection reason from the exchange.
        reason: String,
    },
}

impl ExchangeError {
    /// Whether this error means "thin book, no opportunity this cycle".
    pub fn is_incomplete_book(&self) -> bool {
        matches!(self, ExchangeError::IncompleteBook { .. })
    }
}

/// Position sizing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SizingError {
    /// A leg's tradable amount is below the exchange minimum.
    #[error("{pair} amount {amount} below minimum {minimum}")]
    BelowMinimum {
        /// Pair of the failing leg.
        pair: String,
        /// Computed amount.
        amount: Decimal,
        /// Exchange minimum.
        minimum: Decimal,
    },

    /// No trade limits were loaded for a pair.
    #[error("no trade limits loaded for {0}")]
    MissingLimits(String),
}

/// Orchestrator errors.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// More open orders than legs ever placed.
    #[error("{open_orders} open orders exceed the {legs} legs of a trade")]
    InconsistentOrderState {
        /// Open orders reported by the exchange.
        open_orders: usize,
        /// Legs per trade.
        legs: usize,
    },

    /// A leg failed to place; earlier legs may be live.
    #[error("placing leg {leg} on {pair} failed after {} accepted legs: {source}", .placed.len())]
    PlacementFailed {
        /// Zero-based leg index.
        leg: usize,
        /// Pair of the failed leg.
        pair: String,
        /// Order ids of legs accepted before the failure.
        placed: Vec<String>,
        /// Underlying exchange error.
        #[source]
        source: ExchangeError,
    },
}

/// Notification delivery failure.
#[derive(Error, Debug)]
#[error("notification to {recipient} failed: {reason}")]
pub struct NotifyError {
    /// Intended recipient.
    pub recipient: String,
    /// Failure reason.
    pub reason: String,
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn incomplete_book_is_classified() {
        let thin = ExchangeError::IncompleteBook {
            pair: "eth_btc".to_string(),
            side: BookSide::Ask,
        };
        assert!(thin.is_incomplete_book());
        assert_eq!(thin.to_string(), "order book eth_btc has no usable ask");

        let api = ExchangeError::Api {
            code: "0201".to_string(),
            message: "Invalid Nonce".to_string(),
        };
        assert!(!api.is_incomplete_book());
    }

    #[test]
    fn placement_failure_reports_accepted_legs() {
        let err = OrchestratorError::PlacementFailed {
            leg: 1,
            pair: "eth_btc".to_string(),
            placed: vec!["oid-1".to_string()],
            source: ExchangeError::Rejected {
                pair: "eth_btc".to_string(),
                reason: "insufficient funds".to_string(),
            },
        };
        assert!(err.to_string().contains("after 1 accepted legs"));
    }

    #[test]
    fn below_minimum_message() {
        let err = SizingError::BelowMinimum {
            pair: "btc_mxn".to_string(),
            amount: dec!(0.00001),
            minimum: dec!(0.0003),
        };
        assert_eq!(err.to_string(), "btc_mxn amount 0.00001 below minimum 0.0003");
    }
}
