//! Balances valued in the triangle's anchor asset.

use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::balance::Balances;
use crate::error::ExchangeError;
use crate::exchange::ExchangeClient;
use crate::market::Triangle;

/// One asset's balance and its worth in the anchor asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetValuation {
    /// Asset identifier.
    pub asset: String,
    /// Available balance.
    pub balance: Decimal,
    /// Price of one unit in the anchor asset.
    pub price: Decimal,
    /// Balance times price.
    pub value: Decimal,
}

/// Holdings of the triangle's assets, each valued in the anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioValuation {
    /// Asset prices are quoted in.
    pub anchor: String,
    /// One entry per asset, in configured order.
    pub assets: Vec<AssetValuation>,
}

impl PortfolioValuation {
    /// Sum of all asset values.
    pub fn total(&self) -> Decimal {
        self.assets
            .iter()
            .fold(Decimal::ZERO, |acc, a| acc.saturating_add(a.value))
    }
}

/// Value each asset of the triangle in the anchor at the last traded price.
///
/// The anchor is worth 1. Every other asset shares a pair with the anchor;
/// when the anchor is that pair's base the price is inverted. Tickers are read
/// concurrently and any failure fails the whole valuation.
pub async fn value_balances<E: ExchangeClient + ?Sized>(
    exchange: &E,
    triangle: &Triangle,
    balances: &Balances,
) -> Result<PortfolioValuation, ExchangeError> {
    let anchor = triangle.anchor();

    let prices = try_join_all(triangle.assets().iter().map(|asset| async move {
        if asset == anchor {
            return Ok::<_, ExchangeError>(Decimal::ONE);
        }
        let pair = triangle
            .pairs()
            .iter()
            .find(|p| p.contains(asset) && p.contains(anchor))
            .ok_or_else(|| ExchangeError::UnknownPair(format!("{}_{}", asset, anchor)))?;
        let last = exchange.get_ticker_last_price(&pair.id).await?;
        debug!(pair = %pair, last = %last, "Read last price");

        if pair.base == *asset {
            Ok(last)
        } else {
            Ok(Decimal::ONE.checked_div(last).unwrap_or(Decimal::ZERO))
        }
    }))
    .await?;

    let assets = triangle
        .assets()
        .iter()
        .zip(prices)
        .map(|(asset, price)| {
            let balance = balances.available(asset);
            AssetValuation {
                asset: asset.clone(),
                balance,
                price,
                value: balance.saturating_mul(price),
            }
        })
        .collect();

    Ok(PortfolioValuation {
        anchor: anchor.to_string(),
        assets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::mock::MockFailures;
    use crate::exchange::MockExchange;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn triangle() -> Triangle {
        Triangle::new(["eth_mxn", "eth_btc", "btc_mxn"], ["mxn", "eth", "btc"]).unwrap()
    }

    #[tokio::test]
    async fn values_assets_in_anchor() {
        let exchange = MockExchange::builder()
            .last_price("eth_mxn", dec!(50000))
            .last_price("btc_mxn", dec!(1000000))
            .build();
        let balances: Balances = [("mxn", dec!(100)), ("eth", dec!(2)), ("btc", dec!(0.5))]
            .into_iter()
            .collect();

        let valuation = value_balances(&exchange, &triangle(), &balances)
            .await
            .unwrap();

        assert_eq!(valuation.anchor, "mxn");
        let values: Vec<(&str, Decimal, Decimal)> = valuation
            .assets
            .iter()
            .map(|a| (a.asset.as_str(), a.price, a.value))
            .collect();
        assert_eq!(
            values,
            vec![
                ("mxn", dec!(1), dec!(100)),
                ("eth", dec!(50000), dec!(100000)),
                ("btc", dec!(1000000), dec!(500000)),
            ]
        );
        assert_eq!(valuation.total(), dec!(600100));
    }

    #[tokio::test]
    async fn anchor_as_base_inverts_price() {
        // usd is priced through btc_usd, where the anchor is the base
        let triangle =
            Triangle::new(["btc_usd", "eth_usd", "eth_btc"], ["btc", "usd", "eth"]).unwrap();
        assert_eq!(triangle.anchor(), "btc");
        let exchange = MockExchange::builder()
            .last_price("btc_usd", dec!(50000))
            .last_price("eth_btc", dec!(0.05))
            .build();
        let balances: Balances = [("usd", dec!(1000))].into_iter().collect();

        let valuation = value_balances(&exchange, &triangle, &balances)
            .await
            .unwrap();

        let usd = &valuation.assets[1];
        assert_eq!(usd.price, dec!(0.00002));
        assert_eq!(usd.value, dec!(0.02));
        assert_eq!(valuation.assets[2].price, dec!(0.05));
        assert_eq!(valuation.assets[2].value, Decimal::ZERO);
    }

    #[tokio::test]
    async fn missing_ticker_fails_valuation() {
        let exchange = MockExchange::builder()
            .last_price("eth_mxn", dec!(50000))
            .build();

        let err = value_balances(&exchange, &triangle(), &Balances::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::UnknownPair(pair) if pair == "btc_mxn"));
    }

    #[tokio::test]
    async fn ticker_failure_propagates() {
        let exchange = MockExchange::builder()
            .last_price("eth_mxn", dec!(50000))
            .last_price("btc_mxn", dec!(1000000))
            .failures(MockFailures {
                books: true,
                ..Default::default()
            })
            .build();

        let result = value_balances(&exchange, &triangle(), &Balances::new()).await;

        assert!(matches!(result, Err(ExchangeError::Status { .. })));
    }
}
