//! Order types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::orderbook::BookSide;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order.
    #[strum(to_string = "buy", serialize = "BUY")]
    Buy,
    /// Sell order.
    #[strum(to_string = "sell", serialize = "SELL")]
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Book side this order executes against (buys take the ask).
    pub fn taker_side(&self) -> BookSide {
        match self {
            Side::Buy => BookSide::Ask,
            Side::Sell => BookSide::Bid,
        }
    }
}

/// Order type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Limit order at an explicit price.
    #[default]
    #[strum(to_string = "limit", serialize = "LIMIT")]
    Limit,
}

/// One leg of a sized triangular trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderIntent {
    /// Pair to trade.
    pub pair: String,
    /// Order side.
    pub side: Side,
    /// Limit price.
    pub price: Decimal,
    /// Amount in the pair's base asset.
    pub amount: Decimal,
    /// Order type.
    pub order_type: OrderType,
}

impl OrderIntent {
    /// Create a new limit order intent.
    pub fn limit(pair: impl Into<String>, side: Side, price: Decimal, amount: Decimal) -> Self {
        Self {
            pair: pair.into(),
            side,
            price,
            amount,
            order_type: OrderType::Limit,
        }
    }

    /// Quote-asset value of the order.
    pub fn notional(&self) -> Decimal {
        self.price.saturating_mul(self.amount)
    }

    /// Validate order parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.pair.is_empty() {
            return Err("pair is required".to_string());
        }
        if self.price <= Decimal::ZERO {
            return Err("price must be positive".to_string());
        }
        if self.amount <= Decimal::ZERO {
            return Err("amount must be positive".to_string());
        }
        Ok(())
    }
}

/// Open order reported by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenOrder {
    /// Exchange order id.
    pub order_id: String,
    /// Pair of the order.
    pub pair: String,
    /// Order side.
    pub side: Side,
    /// Limit price.
    pub price: Decimal,
    /// Amount originally requested.
    pub original_amount: Decimal,
    /// Amount still open.
    pub unfilled_amount: Decimal,
}

impl OpenOrder {
    /// Whether part of the order has already filled.
    pub fn is_partially_filled(&self) -> bool {
        self.unfilled_amount < self.original_amount
    }
}

/// Accepted order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderAck {
    /// Exchange order id.
    pub order_id: String,
    /// Pair of the order.
    pub pair: String,
    /// Order side.
    pub side: Side,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn limit_intent_creation() {
        let intent = OrderIntent::limit("eth_btc", Side::Sell, dec!(0.05), dec!(2));
        assert_eq!(intent.order_type, OrderType::Limit);
        assert_eq!(intent.notional(), dec!(0.10));
        assert!(intent.validate().is_ok());
    }

    #[test]
    fn intent_validation() {
        assert!(OrderIntent::limit("", Side::Buy, dec!(1), dec!(1)).validate().is_err());
        assert!(OrderIntent::limit("eth_btc", Side::Buy, dec!(0), dec!(1)).validate().is_err());
        assert!(OrderIntent::limit("eth_btc", Side::Buy, dec!(1), dec!(-1)).validate().is_err());
    }

    #[test]
    fn side_helpers() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Buy.taker_side(), BookSide::Ask);
        assert_eq!(Side::Sell.taker_side(), BookSide::Bid);
        assert_eq!(Side::Buy.to_string(), "buy");
    }

    #[test]
    fn side_from_string() {
        use std::str::FromStr;
        assert_eq!(Side::from_str("SELL").unwrap(), Side::Sell);
        assert_eq!(OrderType::from_str("limit").unwrap(), OrderType::Limit);
    }

    #[test]
    fn open_order_fill_state() {
        let order = OpenOrder {
            order_id: "oid".to_string(),
            pair: "eth_btc".to_string(),
            side: Side::Buy,
            price: dec!(0.05),
            original_amount: dec!(2),
            unfilled_amount: dec!(1.5),
        };
        assert!(order.is_partially_filled());
    }
}
