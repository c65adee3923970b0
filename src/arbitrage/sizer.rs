//! Position sizing for the three legs of a trade.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::debug;

use super::calculator::{leg_sides, RouteDirection};
use super::snapshot::TriangleLimits;
use crate::error::SizingError;
use crate::market::{Triangle, LEGS};
use crate::orderbook::InnermostBook;
use crate::trading::{Balances, OrderIntent, Side};

/// Sizing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizingParams {
    /// Fraction of the available balance a leg may commit.
    pub haircut: Decimal,
    /// Decimal places amounts are rounded to.
    pub precision: u32,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            haircut: dec!(0.8),
            precision: 8,
        }
    }
}

/// Round an amount toward zero to `precision` decimal places.
pub fn round_amount(amount: Decimal, precision: u32) -> Decimal {
    amount.round_dp_with_strategy(precision, RoundingStrategy::ToZero)
}

/// Largest amount of the pair's base asset a leg can trade.
///
/// Buys spend the quote balance at the ask, sells spend the base balance at
/// the bid. Either way the amount is capped by the depth at that level.
pub fn leg_amount(
    book: &InnermostBook,
    side: Side,
    base_balance: Decimal,
    quote_balance: Decimal,
    haircut: Decimal,
) -> Decimal {
    match side {
        Side::Buy => {
            if book.ask.price <= Decimal::ZERO {
                return Decimal::ZERO;
            }
            // an overflowing quotient is still capped by the depth
            quote_balance
                .checked_mul(haircut)
                .and_then(|spend| spend.checked_div(book.ask.price))
                .map_or(book.ask.amount, |affordable| affordable.min(book.ask.amount))
        }
        Side::Sell => base_balance
            .checked_mul(haircut)
            .map_or(book.bid.amount, |available| available.min(book.bid.amount)),
    }
}

/// Size each leg of the chosen route.
///
/// Returns intents in pair order (A, B, C) regardless of direction. Every
/// leg is checked against its minimum before any is clamped to its maximum.
pub fn size_legs(
    triangle: &Triangle,
    direction: RouteDirection,
    books: &[InnermostBook; LEGS],
    balances: &Balances,
    limits: &TriangleLimits,
    params: &SizingParams,
) -> Result<[OrderIntent; LEGS], SizingError> {
    let sides = leg_sides(triangle, direction);
    let pairs = triangle.pairs();

    let mut amounts = [Decimal::ZERO; LEGS];
    for idx in 0..LEGS {
        let pair = &pairs[idx];
        let raw = leg_amount(
            &books[idx],
            sides[idx],
            balances.available(&pair.base),
            balances.available(&pair.quote),
            params.haircut,
        );
        amounts[idx] = round_amount(raw, params.precision);
    }

    for idx in 0..LEGS {
        let bounds = limits
            .get(idx)
            .ok_or_else(|| SizingError::MissingLimits(pairs[idx].id.clone()))?;
        if amounts[idx] < bounds.minimum_amount {
            debug!(
                pair = %pairs[idx],
                amount = %amounts[idx],
                minimum = %bounds.minimum_amount,
                "Leg below exchange minimum"
            );
            return Err(SizingError::BelowMinimum {
                pair: pairs[idx].id.clone(),
                amount: amounts[idx],
                minimum: bounds.minimum_amount,
            });
        }
    }

    Ok(std::array::from_fn(|idx| {
        let maximum = limits.0[idx].maximum_amount;
        let side = sides[idx];
        let price = books[idx].level(side.taker_side()).price;
        OrderIntent::limit(
            pairs[idx].id.clone(),
            side,
            price,
            amounts[idx].min(maximum),
        )
    }))
}
