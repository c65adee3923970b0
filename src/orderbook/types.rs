//! Order book types and data structures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Single price level in an order book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceLevel {
    /// Price at this level.
    pub price: Decimal,
    /// Amount of base asset available at this price.
    pub amount: Decimal,
}

impl PriceLevel {
    /// Create a new price level.
    pub fn new(price: Decimal, amount: Decimal) -> Self {
        Self { price, amount }
    }

    /// Whether the level can be traded against.
    pub fn is_usable(&self) -> bool {
        self.price > Decimal::ZERO && self.amount > Decimal::ZERO
    }
}

/// Side of an order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BookSide {
    /// Resting buy orders.
    Bid,
    /// Resting sell orders.
    Ask,
}

/// Innermost (top of book) bid and ask for one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InnermostBook {
    /// Pair identifier.
    pub pair: String,
    /// Best bid.
    pub bid: PriceLevel,
    /// Best ask.
    pub ask: PriceLevel,
}

impl InnermostBook {
    /// Create a book from its best levels.
    pub fn new(pair: impl Into<String>, bid: PriceLevel, ask: PriceLevel) -> Self {
        Self {
            pair: pair.into(),
            bid,
            ask,
        }
    }

    /// Build from optional levels, naming the missing side if any.
    pub fn from_levels(
        pair: &str,
        bid: Option<PriceLevel>,
        ask: Option<PriceLevel>,
    ) -> Result<Self, BookSide> {
        let bid = bid.filter(PriceLevel::is_usable).ok_or(BookSide::Bid)?;
        let ask = ask.filter(PriceLevel::is_usable).ok_or(BookSide::Ask)?;
        Ok(Self::new(pair, bid, ask))
    }

    /// Level on the given side.
    pub fn level(&self, side: BookSide) -> PriceLevel {
        match side {
            BookSide::Bid => self.bid,
            BookSide::Ask => self.ask,
        }
    }
}
