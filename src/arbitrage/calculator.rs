//! Route factor calculations for the configured triangle.
//!
//! Both routes start and end in the anchor asset. On each leg the engine
//! either holds the pair's quote asset (buy at the ask, rate `1/ask`) or its
//! base asset (sell at the bid, rate `bid`), and every rate is reduced by the
//! pair's taker fee.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::market::{Triangle, LEGS};
use crate::orderbook::InnermostBook;
use crate::trading::Side;

/// Direction of travel around the triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RouteDirection {
    /// Pair A, then B, then C.
    Bid,
    /// Pair C, then B, then A.
    Ask,
}

impl RouteDirection {
    /// Pair indices in execution order.
    pub fn leg_order(&self) -> [usize; LEGS] {
        match self {
            RouteDirection::Bid => [0, 1, 2],
            RouteDirection::Ask => [2, 1, 0],
        }
    }

    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteDirection::Bid => "bid",
            RouteDirection::Ask => "ask",
        }
    }
}

impl fmt::Display for RouteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteDirection::Bid => f.write_str("BidRoute"),
            RouteDirection::Ask => f.write_str("AskRoute"),
        }
    }
}

/// Outcome of evaluating both routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    /// Profitable direction, if any.
    pub direction: Option<RouteDirection>,
    /// Fee-adjusted factor of the bid route.
    pub bid_factor: Decimal,
    /// Fee-adjusted factor of the ask route.
    pub ask_factor: Decimal,
}

impl RouteDecision {
    /// Whether a route was selected.
    pub fn is_opportunity(&self) -> bool {
        self.direction.is_some()
    }

    /// The larger of the two factors.
    pub fn best_factor(&self) -> Decimal {
        self.bid_factor.max(self.ask_factor)
    }

    /// Factor of the selected route.
    pub fn selected_factor(&self) -> Option<Decimal> {
        self.direction.map(|d| match d {
            RouteDirection::Bid => self.bid_factor,
            RouteDirection::Ask => self.ask_factor,
        })
    }
}

impl fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Some(direction) => write!(f, "{}", direction)?,
            None => f.write_str("NoOpportunity")?,
        }
        write!(f, " (bid={}, ask={})", self.bid_factor, self.ask_factor)
    }
}

/// Side of each pair's order for a direction, indexed like the triangle's
/// pairs (not in execution order).
pub fn leg_sides(triangle: &Triangle, direction: RouteDirection) -> [Side; LEGS] {
    let pairs = triangle.pairs();
    let mut sides = [Side::Sell; LEGS];
    let mut held = triangle.anchor().to_string();

    for idx in direction.leg_order() {
        let pair = &pairs[idx];
        if held == pair.quote {
            sides[idx] = Side::Buy;
            held = pair.base.clone();
        } else {
            sides[idx] = Side::Sell;
            held = pair.quote.clone();
        }
    }

    sides
}

/// Fee-adjusted conversion rate of a single leg.
///
/// Zero when the relevant price is not positive.
pub fn leg_rate(book: &InnermostBook, side: Side, fee: Decimal) -> Decimal {
    let gross = match side {
        Side::Buy => {
            if book.ask.price <= Decimal::ZERO {
                return Decimal::ZERO;
            }
            Decimal::ONE.checked_div(book.ask.price)
        }
        Side::Sell => {
            if book.bid.price <= Decimal::ZERO {
                return Decimal::ZERO;
            }
            Some(book.bid.price)
        }
    };

    gross
        .and_then(|rate| rate.checked_mul(Decimal::ONE - fee))
        .unwrap_or(Decimal::ZERO)
}

/// Product of the three leg rates for a direction.
pub fn route_factor(
    triangle: &Triangle,
    direction: RouteDirection,
    books: &[InnermostBook; LEGS],
    fees: &[Decimal; LEGS],
) -> Decimal {
    let sides = leg_sides(triangle, direction);

    direction
        .leg_order()
        .iter()
        .try_fold(Decimal::ONE, |acc, &idx| {
            acc.checked_mul(leg_rate(&books[idx], sides[idx], fees[idx]))
        })
        .unwrap_or(Decimal::ZERO)
}

/// Evaluate both routes and pick the profitable one.
///
/// A route is profitable when its factor exceeds one. When both are, the
/// strictly larger wins and ties go to the bid route.
pub fn evaluate_routes(
    triangle: &Triangle,
    books: &[InnermostBook; LEGS],
    fees: &[Decimal; LEGS],
) -> RouteDecision {
    let bid_factor = route_factor(triangle, RouteDirection::Bid, books, fees);
    let ask_factor = route_factor(triangle, RouteDirection::Ask, books, fees);

    let direction = if bid_factor <= Decimal::ONE && ask_factor <= Decimal::ONE {
        None
    } else if ask_factor > bid_factor {
        Some(RouteDirection::Ask)
    } else {
        Some(RouteDirection::Bid)
    };

    RouteDecision {
        direction,
        bid_factor,
        ask_factor,
    }
}
