//! End-to-end engine scenarios against the in-memory exchange.
//!
//! Run with: cargo test --test integration

use std::time::Duration;

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_test::{assert_err, assert_ok};

use tri_arb::api::AppState;
use tri_arb::arbitrage::{
    CycleOutcome, EngineSettings, EngineState, Orchestrator, RouteDirection, TriangleLimits,
};
use tri_arb::clock::ManualClock;
use tri_arb::error::OrchestratorError;
use tri_arb::exchange::mock::MockFailures;
use tri_arb::exchange::{BookLimits, DryRunExchange, ExchangeClient, MockExchange};
use tri_arb::market::Triangle;
use tri_arb::notify::RecordingNotifier;
use tri_arb::trading::Side;

fn triangle() -> Triangle {
    Triangle::new(["eth_mxn", "eth_btc", "btc_mxn"], ["mxn", "eth", "btc"]).unwrap()
}

fn limits() -> TriangleLimits {
    TriangleLimits([BookLimits::new(dec!(0.001), dec!(1000)); 3])
}

/// ask(eth_mxn)=0.05, bid(eth_btc)=20, bid(btc_mxn)=1.01, no fees.
fn reference_exchange() -> tri_arb::exchange::MockExchangeBuilder {
    MockExchange::builder()
        .book("eth_mxn", (dec!(0.049), dec!(100)), (dec!(0.05), dec!(100)))
        .book("eth_btc", (dec!(20), dec!(100)), (dec!(20.5), dec!(100)))
        .book("btc_mxn", (dec!(1.01), dec!(100)), (dec!(1.02), dec!(100)))
        .fee("eth_mxn", Decimal::ZERO)
        .fee("eth_btc", Decimal::ZERO)
        .fee("btc_mxn", Decimal::ZERO)
        .balance("mxn", dec!(100))
        .balance("eth", dec!(100))
        .balance("btc", dec!(100))
}

fn engine<E: ExchangeClient>(
    exchange: E,
    notifier: RecordingNotifier,
    clock: ManualClock,
    settings: EngineSettings,
) -> Orchestrator<E, RecordingNotifier, ManualClock> {
    Orchestrator::new(exchange, notifier, clock, triangle(), limits(), settings)
}

#[tokio::test]
async fn reference_scenario_trades_bid_route() {
    let exchange = reference_exchange().build();
    let mut engine = engine(
        exchange.clone(),
        RecordingNotifier::new(),
        ManualClock::new(),
        EngineSettings::default(),
    );

    let report = assert_ok!(engine.step().await);

    match report.outcome {
        CycleOutcome::Traded { direction, order_ids } => {
            assert_eq!(direction, RouteDirection::Bid);
            assert_eq!(order_ids.len(), 3);
        }
        other => panic!("expected a trade, got {other:?}"),
    }

    let decision = engine.run_state().last_decision.unwrap();
    assert_eq!(decision.bid_factor, dec!(404));
    assert!(decision.ask_factor <= Decimal::ONE);

    let placed = exchange.placed_orders();
    let legs: Vec<(&str, Side, Decimal)> = placed
        .iter()
        .map(|o| (o.pair.as_str(), o.side, o.price))
        .collect();
    assert_eq!(
        legs,
        vec![
            ("eth_mxn", Side::Buy, dec!(0.05)),
            ("eth_btc", Side::Sell, dec!(20)),
            ("btc_mxn", Side::Sell, dec!(1.01)),
        ]
    );
    // 100 mxn * 0.8 / 0.05 = 1600, capped by 100 at the ask
    assert_eq!(placed[0].amount, dec!(100));
    assert_eq!(placed[1].amount, dec!(80));
}

#[tokio::test]
async fn four_open_orders_cancel_once_without_evaluating() {
    let exchange = reference_exchange().open_orders([4]).build();
    let mut engine = engine(
        exchange.clone(),
        RecordingNotifier::new(),
        ManualClock::new(),
        EngineSettings::default(),
    );

    let report = assert_ok!(engine.step().await);

    assert_eq!(
        report.outcome,
        CycleOutcome::CancelledInconsistent { open_orders: 4 }
    );
    assert_eq!(engine.run_state().state, EngineState::Idle);
    assert_eq!(exchange.cancel_all_calls(), 1);
    assert_eq!(exchange.book_requests(), 0);
    assert!(exchange.placed_orders().is_empty());

    // next cycle sees a flat account and trades
    let report = assert_ok!(engine.step().await);
    assert!(matches!(report.outcome, CycleOutcome::Traded { .. }));
    assert_eq!(exchange.cancel_all_calls(), 1);
}

#[tokio::test]
async fn trade_limit_ends_the_run_without_further_polling() {
    let exchange = reference_exchange().build();
    let clock = ManualClock::new();
    let mut engine = engine(
        exchange.clone(),
        RecordingNotifier::new(),
        clock.clone(),
        EngineSettings::default(),
    );

    let summary = assert_ok!(engine.run().await);

    assert_eq!(summary.trades_executed, 10);
    assert_eq!(engine.run_state().state, EngineState::Stopped);
    assert_eq!(exchange.list_open_orders_calls(), 10);
    assert_eq!(exchange.placed_orders().len(), 30);

    // a cooldown between trades, none after the last one
    let sleeps = clock.sleeps();
    assert_eq!(sleeps.len(), 9);
    assert!(sleeps.iter().all(|s| *s == Duration::from_secs(60)));
}

#[tokio::test]
async fn placement_failure_aborts_run_and_alerts() {
    let exchange = reference_exchange()
        .failures(MockFailures {
            reject_placement: Some(1),
            ..Default::default()
        })
        .build();
    let notifier = RecordingNotifier::new();
    let mut engine = engine(
        exchange.clone(),
        notifier.clone(),
        ManualClock::new(),
        EngineSettings::default(),
    );

    let err = assert_err!(engine.run().await);

    match err {
        OrchestratorError::PlacementFailed { leg, pair, placed, .. } => {
            assert_eq!(leg, 1);
            assert_eq!(pair, "eth_btc");
            assert_eq!(placed, vec!["mock-1".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(exchange.placement_attempts(), 2);
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn notifier_failure_does_not_block_progress() {
    let exchange = reference_exchange().build();
    let notifier = RecordingNotifier::failing();
    let mut engine = engine(
        exchange.clone(),
        notifier.clone(),
        ManualClock::new(),
        EngineSettings {
            trade_limit: 2,
            ..EngineSettings::default()
        },
    );

    let summary = assert_ok!(engine.run().await);

    assert_eq!(summary.trades_executed, 2);
    assert_eq!(notifier.sent().len(), 2);
}

#[tokio::test]
async fn waits_for_resting_orders_before_trading_again() {
    let exchange = reference_exchange().resting_orders().build();
    let mut engine = engine(
        exchange.clone(),
        RecordingNotifier::new(),
        ManualClock::new(),
        EngineSettings::default(),
    );

    assert_ok!(engine.step().await);
    let report = assert_ok!(engine.step().await);
    assert_eq!(report.outcome, CycleOutcome::Reconciling { open_orders: 3 });
    assert_eq!(report.wait, Duration::from_secs(300));
    assert_eq!(exchange.placed_orders().len(), 3);

    exchange.fill_all();
    let report = assert_ok!(engine.step().await);
    assert!(matches!(report.outcome, CycleOutcome::Traded { .. }));
    assert_eq!(engine.run_state().trades_executed, 2);
}

#[tokio::test]
async fn no_opportunity_idles_without_orders() {
    let exchange = MockExchange::builder()
        .book("eth_mxn", (dec!(100), dec!(1)), (dec!(101), dec!(1)))
        .book("eth_btc", (dec!(0.05), dec!(1)), (dec!(0.0505), dec!(1)))
        .book("btc_mxn", (dec!(2000), dec!(1)), (dec!(2020), dec!(1)))
        .fee("eth_mxn", dec!(0.0065))
        .fee("eth_btc", dec!(0.001))
        .fee("btc_mxn", dec!(0.0065))
        .balance("mxn", dec!(1000))
        .build();
    let mut engine = engine(
        exchange.clone(),
        RecordingNotifier::new(),
        ManualClock::new(),
        EngineSettings::default(),
    );

    for _ in 0..3 {
        let report = assert_ok!(engine.step().await);
        assert_eq!(report.outcome, CycleOutcome::NoOpportunity);
        assert_eq!(report.wait, Duration::from_secs(5));
    }
    assert_eq!(engine.run_state().state, EngineState::Idle);
    assert_eq!(exchange.placement_attempts(), 0);
}

#[tokio::test]
async fn dry_run_trades_without_touching_the_account() {
    let exchange = reference_exchange().open_orders([5]).build();
    let mut engine = engine(
        DryRunExchange::new(exchange.clone()),
        RecordingNotifier::new(),
        ManualClock::new(),
        EngineSettings {
            trade_limit: 3,
            ..EngineSettings::default()
        },
    );

    let summary = assert_ok!(engine.run().await);

    assert_eq!(summary.trades_executed, 3);
    assert_eq!(engine.exchange().simulated_orders(), 9);
    assert!(exchange.placed_orders().is_empty());
    assert_eq!(exchange.cancel_all_calls(), 0);
}

#[tokio::test]
async fn status_is_published_after_each_cycle() {
    let status = AppState::new(true);
    let exchange = reference_exchange().build();
    let mut engine = engine(
        exchange,
        RecordingNotifier::new(),
        ManualClock::new(),
        EngineSettings::default(),
    )
    .with_status(status.clone());

    assert_ok!(engine.step().await);

    let published = status.engine.read().await.clone();
    assert_eq!(published.state, Some(EngineState::Reconciling));
    assert_eq!(published.trades_executed, 1);
    assert_eq!(published.trade_limit, 10);
    assert_eq!(published.last_order_ids.len(), 3);
}
