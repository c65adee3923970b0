//! Route evaluation with logging and metrics.

use std::fmt;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use super::calculator::{evaluate_routes, RouteDecision};
use super::snapshot::MarketSnapshot;
use crate::market::{Triangle, LEGS};
use crate::metrics;

/// Evaluate both routes for a snapshot, logging and recording the result.
#[instrument(skip_all, fields(triangle = %triangle.label()))]
pub fn check_arbitrage(triangle: &Triangle, snapshot: &MarketSnapshot) -> RouteDecision {
    let decision = evaluate_routes(triangle, &snapshot.books, &snapshot.fees);
    metrics::record_route_factors(decision.bid_factor, decision.ask_factor);

    if let Some(direction) = decision.direction {
        metrics::record_opportunity(direction.as_str());
        info!(
            route = %direction,
            bid_factor = %decision.bid_factor,
            ask_factor = %decision.ask_factor,
            "Arbitrage opportunity detected"
        );
    } else {
        debug!(
            bid_factor = %decision.bid_factor,
            ask_factor = %decision.ask_factor,
            best = %decision.best_factor(),
            "No arbitrage opportunity"
        );
    }

    decision
}

/// Both route results next to the prices that produced them.
pub fn diagnose(triangle: &Triangle, snapshot: &MarketSnapshot) -> RouteDiagnosis {
    let decision = evaluate_routes(triangle, &snapshot.books, &snapshot.fees);
    let pairs = triangle.pair_ids();

    RouteDiagnosis {
        decision,
        legs: std::array::from_fn(|idx| LegQuote {
            pair: pairs[idx].clone(),
            bid: snapshot.books[idx].bid.price,
            ask: snapshot.books[idx].ask.price,
            fee: snapshot.fees[idx],
        }),
    }
}

/// Quote used for one leg of a diagnosis.
#[derive(Debug, Clone)]
pub struct LegQuote {
    /// Pair identifier.
    pub pair: String,
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
    /// Taker fee.
    pub fee: Decimal,
}

/// Diagnostic information for a single evaluation.
#[derive(Debug, Clone)]
pub struct RouteDiagnosis {
    /// Evaluation result.
    pub decision: RouteDecision,
    /// Quotes in pair order.
    pub legs: [LegQuote; LEGS],
}

impl fmt::Display for RouteDiagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BidRoute={} AskRoute={} => {}",
            self.decision.bid_factor.round_dp(6),
            self.decision.ask_factor.round_dp(6),
            self.decision
                .direction
                .map(|d| d.to_string())
                .unwrap_or_else(|| "NoOpportunity".to_string()),
        )?;
        for leg in &self.legs {
            write!(
                f,
                " | {} bid={} ask={} fee={}",
                leg.pair, leg.bid, leg.ask, leg.fee
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::calculator::RouteDirection;
    use crate::orderbook::{InnermostBook, PriceLevel};
    use rust_decimal_macros::dec;
    use time::OffsetDateTime;

    fn triangle() -> Triangle {
        Triangle::new(["eth_mxn", "eth_btc", "btc_mxn"], ["mxn", "eth", "btc"]).unwrap()
    }

    fn snapshot(ask_a: Decimal) -> MarketSnapshot {
        let level = |p| PriceLevel::new(p, dec!(1));
        MarketSnapshot {
            books: [
                InnermostBook::new("eth_mxn", level(dec!(0.049)), level(ask_a)),
                InnermostBook::new("eth_btc", level(dec!(20)), level(dec!(20.5))),
                InnermostBook::new("btc_mxn", level(dec!(1.01)), level(dec!(1.02))),
            ],
            fees: [Decimal::ZERO; 3],
            fetched_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn check_arbitrage_finds_opportunity() {
        let decision = check_arbitrage(&triangle(), &snapshot(dec!(0.05)));
        assert_eq!(decision.direction, Some(RouteDirection::Bid));
    }

    #[test]
    fn check_arbitrage_returns_none_when_costly() {
        let decision = check_arbitrage(&triangle(), &snapshot(dec!(100)));
        assert!(!decision.is_opportunity());
    }

    #[test]
    fn diagnosis_lists_both_routes_and_legs() {
        let text = diagnose(&triangle(), &snapshot(dec!(0.05))).to_string();
        assert!(text.starts_with("BidRoute=404"));
        assert!(text.contains("=> BidRoute"));
        assert!(text.contains("eth_btc bid=20 ask=20.5 fee=0"));
    }
}
