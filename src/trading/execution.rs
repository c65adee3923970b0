//! Order placement and cancellation.

use std::time::Instant;

use tracing::{debug, error, info, instrument};

use super::order::{OrderAck, OrderIntent};
use crate::error::{ExchangeError, OrchestratorError};
use crate::exchange::ExchangeClient;
use crate::metrics;

/// Place intents one after another, in order, without retries.
///
/// Stops at the first failure. Legs accepted before it stay live and their
/// ids are carried in the error.
#[instrument(skip_all, fields(legs = intents.len()))]
pub async fn place_intents<E: ExchangeClient + ?Sized>(
    exchange: &E,
    intents: &[OrderIntent],
) -> Result<Vec<OrderAck>, OrchestratorError> {
    let mut acks: Vec<OrderAck> = Vec::with_capacity(intents.len());

    for (leg, intent) in intents.iter().enumerate() {
        debug!(
            leg,
            pair = %intent.pair,
            side = %intent.side,
            price = %intent.price,
            amount = %intent.amount,
            "Placing leg"
        );

        let start = Instant::now();
        match exchange.place_order(intent).await {
            Ok(ack) => {
                metrics::record_order_latency(start);
                metrics::record_order_placed(&intent.pair, intent.side);
                info!(
                    leg,
                    order_id = %ack.order_id,
                    pair = %intent.pair,
                    side = %intent.side,
                    price = %intent.price,
                    amount = %intent.amount,
                    "Leg placed"
                );
                acks.push(ack);
            }
            Err(source) => {
                metrics::record_order_failed(&intent.pair);
                error!(
                    leg,
                    pair = %intent.pair,
                    error = %source,
                    accepted = acks.len(),
                    "Leg placement failed"
                );
                return Err(OrchestratorError::PlacementFailed {
                    leg,
                    pair: intent.pair.clone(),
                    placed: acks.into_iter().map(|a| a.order_id).collect(),
                    source,
                });
            }
        }
    }

    Ok(acks)
}

/// Cancel every open order on the account.
#[instrument(skip_all)]
pub async fn cancel_all<E: ExchangeClient + ?Sized>(
    exchange: &E,
) -> Result<Vec<String>, ExchangeError> {
    let cancelled = exchange.cancel_all_orders().await?;
    info!(count = cancelled.len(), ids = ?cancelled, "Cancelled open orders");
    Ok(cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::mock::MockFailures;
    use crate::exchange::MockExchange;
    use crate::trading::Side;
    use rust_decimal_macros::dec;

    fn intents() -> Vec<OrderIntent> {
        vec![
            OrderIntent::limit("eth_mxn", Side::Buy, dec!(10), dec!(8)),
            OrderIntent::limit("eth_btc", Side::Sell, dec!(0.5), dec!(8)),
            OrderIntent::limit("btc_mxn", Side::Sell, dec!(21), dec!(4)),
        ]
    }

    #[tokio::test]
    async fn places_all_legs_in_order() {
        let exchange = MockExchange::new();
        let acks = place_intents(&exchange, &intents()).await.unwrap();

        assert_eq!(acks.len(), 3);
        let placed: Vec<String> = exchange.placed_orders().into_iter().map(|i| i.pair).collect();
        assert_eq!(placed, vec!["eth_mxn", "eth_btc", "btc_mxn"]);
    }

    #[tokio::test]
    async fn stops_at_first_rejection() {
        let exchange = MockExchange::builder()
            .failures(MockFailures {
                reject_placement: Some(1),
                ..Default::default()
            })
            .build();

        let err = place_intents(&exchange, &intents()).await.unwrap_err();

        match err {
            OrchestratorError::PlacementFailed { leg, pair, placed, .. } => {
                assert_eq!(leg, 1);
                assert_eq!(pair, "eth_btc");
                assert_eq!(placed, vec!["mock-1".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(exchange.placement_attempts(), 2);
    }

    #[tokio::test]
    async fn cancel_all_returns_ids() {
        let exchange = MockExchange::builder().resting_orders().build();
        place_intents(&exchange, &intents()[..1]).await.unwrap();

        let cancelled = cancel_all(&exchange).await.unwrap();
        assert_eq!(cancelled.len(), 1);
    }
}
