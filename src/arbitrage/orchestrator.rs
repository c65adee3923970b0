//! Polling state machine driving the engine.
//!
//! One [`Orchestrator::step`] is one cycle: reconcile open orders, evaluate
//! the triangle when the account is flat, place the three legs when a route
//! pays. [`Orchestrator::run`] repeats cycles until the trade limit is hit or
//! a placement fails.

use std::time::{Duration, Instant};

use serde::Serialize;
use strum::Display;
use tracing::{debug, error, info, instrument, warn};

use super::calculator::{RouteDecision, RouteDirection};
use super::detector::check_arbitrage;
use super::sizer::{size_legs, SizingParams};
use super::snapshot::{read_snapshot, TriangleLimits};
use crate::api::AppState;
use crate::clock::Clock;
use crate::error::{OrchestratorError, SizingError};
use crate::exchange::ExchangeClient;
use crate::market::{Triangle, LEGS};
use crate::metrics;
use crate::notify::Notifier;
use crate::trading::{cancel_all, place_intents, OpenOrder};

/// Engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EngineState {
    /// Waiting for the next cycle.
    Idle,
    /// Reading the market and deciding.
    Evaluating,
    /// Submitting legs.
    Placing,
    /// Waiting for placed orders to fill.
    Reconciling,
    /// Trade limit reached or run aborted.
    Stopped,
}

/// Tunables for the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Trades allowed per run.
    pub trade_limit: u32,
    /// Wait while orders are open or after a failed read.
    pub poll_interval: Duration,
    /// Minimum spacing of reconciliation status logs.
    pub status_log_interval: Duration,
    /// Wait after a cycle that did not trade.
    pub idle_delay: Duration,
    /// Wait after a trade was placed.
    pub trade_cooldown: Duration,
    /// Leg sizing.
    pub sizing: SizingParams,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            trade_limit: 10,
            poll_interval: Duration::from_secs(300),
            status_log_interval: Duration::from_secs(1800),
            idle_delay: Duration::from_secs(5),
            trade_cooldown: Duration::from_secs(60),
            sizing: SizingParams::default(),
        }
    }
}

/// State owned by the orchestrator for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Current state.
    pub state: EngineState,
    /// Trades placed this run.
    pub trades_executed: u32,
    /// Whether placed orders may still be open.
    pub orders_outstanding: bool,
    /// Last time a reconciliation status was logged at info level.
    pub last_status_log: Option<Instant>,
    /// Reconciliation status logs emitted at info level.
    pub status_logs: u64,
    /// Cycles run.
    pub cycles: u64,
    /// Profitable routes seen.
    pub opportunities: u64,
    /// Most recent route evaluation.
    pub last_decision: Option<RouteDecision>,
    /// Order ids of the most recent trade.
    pub last_order_ids: Vec<String>,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            state: EngineState::Idle,
            trades_executed: 0,
            orders_outstanding: false,
            last_status_log: None,
            status_logs: 0,
            cycles: 0,
            opportunities: 0,
            last_decision: None,
            last_order_ids: Vec::new(),
        }
    }
}

/// Published view of the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStatus {
    /// Current state, if the engine has started.
    pub state: Option<EngineState>,
    /// Trades placed this run.
    pub trades_executed: u32,
    /// Trades allowed per run.
    pub trade_limit: u32,
    /// Whether placed orders may still be open.
    pub orders_outstanding: bool,
    /// Cycles run.
    pub cycles: u64,
    /// Profitable routes seen.
    pub opportunities: u64,
    /// Most recent route evaluation.
    pub last_decision: Option<RouteDecision>,
    /// Order ids of the most recent trade.
    pub last_order_ids: Vec<String>,
}

impl RunState {
    /// Status view for publishing.
    pub fn status(&self, trade_limit: u32) -> EngineStatus {
        EngineStatus {
            state: Some(self.state),
            trades_executed: self.trades_executed,
            trade_limit,
            orders_outstanding: self.orders_outstanding,
            cycles: self.cycles,
            opportunities: self.opportunities,
            last_decision: self.last_decision,
            last_order_ids: self.last_order_ids.clone(),
        }
    }
}

/// What a cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Trade limit already reached.
    Stopped,
    /// A read failed.
    ReadFailed,
    /// More open orders than legs; everything was cancelled.
    CancelledInconsistent {
        /// Open orders seen.
        open_orders: usize,
    },
    /// Orders from a previous trade are still open.
    Reconciling {
        /// Open orders seen.
        open_orders: usize,
    },
    /// A book had no bid or ask.
    IncompleteBook,
    /// Neither route pays.
    NoOpportunity,
    /// A route paid but could not be sized.
    Rejected(SizingError),
    /// All three legs were placed.
    Traded {
        /// Route taken.
        direction: RouteDirection,
        /// Accepted order ids in pair order.
        order_ids: Vec<String>,
    },
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// What happened.
    pub outcome: CycleOutcome,
    /// How long to wait before the next cycle.
    pub wait: Duration,
}

impl StepReport {
    fn new(outcome: CycleOutcome, wait: Duration) -> Self {
        Self { outcome, wait }
    }
}

/// Totals at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Trades placed.
    pub trades_executed: u32,
    /// Cycles run.
    pub cycles: u64,
    /// Profitable routes seen.
    pub opportunities: u64,
}

/// Drives cycles against one exchange account.
pub struct Orchestrator<E, N, C> {
    exchange: E,
    notifier: N,
    clock: C,
    triangle: Triangle,
    limits: TriangleLimits,
    settings: EngineSettings,
    run: RunState,
    status: Option<AppState>,
}

impl<E, N, C> Orchestrator<E, N, C>
where
    E: ExchangeClient,
    N: Notifier,
    C: Clock,
{
    /// Create an orchestrator. Trade limits must already be loaded.
    pub fn new(
        exchange: E,
        notifier: N,
        clock: C,
        triangle: Triangle,
        limits: TriangleLimits,
        settings: EngineSettings,
    ) -> Self {
        Self {
            exchange,
            notifier,
            clock,
            triangle,
            limits,
            settings,
            run: RunState::default(),
            status: None,
        }
    }

    /// Publish the run state to the status API after every cycle.
    pub fn with_status(mut self, status: AppState) -> Self {
        self.status = Some(status);
        self
    }

    /// Current run state.
    pub fn run_state(&self) -> &RunState {
        &self.run
    }

    /// The exchange client.
    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    /// Run cycles until the trade limit is reached.
    ///
    /// A failed placement ends the run with an error.
    pub async fn run(&mut self) -> Result<RunSummary, OrchestratorError> {
        info!(
            triangle = %self.triangle.label(),
            trade_limit = self.settings.trade_limit,
            "Starting arbitrage engine"
        );

        loop {
            let report = self.step().await?;
            if self.run.state == EngineState::Stopped {
                break;
            }
            self.clock.sleep(report.wait).await;
        }

        let summary = RunSummary {
            trades_executed: self.run.trades_executed,
            cycles: self.run.cycles,
            opportunities: self.run.opportunities,
        };
        info!(
            trades = summary.trades_executed,
            cycles = summary.cycles,
            opportunities = summary.opportunities,
            "Arbitrage engine stopped"
        );
        Ok(summary)
    }

    /// Run a single cycle.
    pub async fn step(&mut self) -> Result<StepReport, OrchestratorError> {
        let report = self.cycle().await;
        self.publish().await;
        report
    }

    #[instrument(skip(self), fields(cycle = self.run.cycles + 1))]
    async fn cycle(&mut self) -> Result<StepReport, OrchestratorError> {
        if self.run.trades_executed >= self.settings.trade_limit {
            self.transition(EngineState::Stopped);
            return Ok(StepReport::new(CycleOutcome::Stopped, Duration::ZERO));
        }

        self.run.cycles += 1;
        metrics::record_cycle();

        let open_orders = match self.exchange.list_open_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                warn!(error = %e, "Failed to list open orders");
                metrics::record_read_failure("open_orders");
                self.transition(EngineState::Idle);
                return Ok(StepReport::new(
                    CycleOutcome::ReadFailed,
                    self.settings.poll_interval,
                ));
            }
        };

        let count = open_orders.len();
        if count > LEGS {
            return Ok(self.cancel_inconsistent(count).await);
        }
        if count > 0 {
            self.run.orders_outstanding = true;
            self.transition(EngineState::Reconciling);
            self.log_reconciliation(&open_orders);
            return Ok(StepReport::new(
                CycleOutcome::Reconciling { open_orders: count },
                self.settings.poll_interval,
            ));
        }

        if self.run.orders_outstanding {
            info!("All placed orders have settled");
            self.run.orders_outstanding = false;
        }

        self.evaluate_and_trade().await
    }

    async fn cancel_inconsistent(&mut self, open_orders: usize) -> StepReport {
        let inconsistency = OrchestratorError::InconsistentOrderState {
            open_orders,
            legs: LEGS,
        };
        warn!(error = %inconsistency, "Cancelling all open orders");
        metrics::record_inconsistent_cancel();

        if let Err(e) = cancel_all(&self.exchange).await {
            error!(error = %e, "Cancel-all failed");
        }

        self.run.orders_outstanding = false;
        self.transition(EngineState::Idle);
        StepReport::new(
            CycleOutcome::CancelledInconsistent { open_orders },
            self.settings.idle_delay,
        )
    }

    fn log_reconciliation(&mut self, open_orders: &[OpenOrder]) {
        let now = self.clock.now();
        let due = self
            .run
            .last_status_log
            .map_or(true, |last| {
                now.saturating_duration_since(last) >= self.settings.status_log_interval
            });
        let partially_filled = open_orders.iter().filter(|o| o.is_partially_filled()).count();

        if due {
            info!(
                open_orders = open_orders.len(),
                partially_filled,
                "Waiting for open orders to fill"
            );
            self.run.last_status_log = Some(now);
            self.run.status_logs += 1;
        } else {
            debug!(
                open_orders = open_orders.len(),
                partially_filled,
                "Orders still open"
            );
        }
    }

    async fn evaluate_and_trade(&mut self) -> Result<StepReport, OrchestratorError> {
        self.transition(EngineState::Evaluating);

        let assets = self.triangle.assets().to_vec();
        let reads = tokio::try_join!(
            read_snapshot(&self.exchange, &self.triangle),
            self.exchange.get_balances(&assets),
        );
        let (snapshot, balances) = match reads {
            Ok(reads) => reads,
            Err(e) if e.is_incomplete_book() => {
                debug!(reason = %e, "Incomplete order book, skipping cycle");
                self.transition(EngineState::Idle);
                return Ok(StepReport::new(
                    CycleOutcome::IncompleteBook,
                    self.settings.idle_delay,
                ));
            }
            Err(e) => {
                warn!(error = %e, "Market read failed");
                metrics::record_read_failure("market");
                self.transition(EngineState::Idle);
                return Ok(StepReport::new(
                    CycleOutcome::ReadFailed,
                    self.settings.poll_interval,
                ));
            }
        };

        let decision = check_arbitrage(&self.triangle, &snapshot);
        self.run.last_decision = Some(decision);

        let Some(direction) = decision.direction else {
            self.transition(EngineState::Idle);
            return Ok(StepReport::new(
                CycleOutcome::NoOpportunity,
                self.settings.idle_delay,
            ));
        };
        self.run.opportunities += 1;

        let intents = match size_legs(
            &self.triangle,
            direction,
            &snapshot.books,
            &balances,
            &self.limits,
            &self.settings.sizing,
        ) {
            Ok(intents) => intents,
            Err(reason) => {
                info!(route = %direction, reason = %reason, "Opportunity rejected by sizing");
                self.transition(EngineState::Idle);
                return Ok(StepReport::new(
                    CycleOutcome::Rejected(reason),
                    self.settings.idle_delay,
                ));
            }
        };

        self.transition(EngineState::Placing);
        let acks = match place_intents(&self.exchange, &intents).await {
            Ok(acks) => acks,
            Err(e) => {
                error!(error = %e, "Placement failed, aborting run");
                self.notify("Triangular arbitrage halted", &e.to_string())
                    .await;
                self.transition(EngineState::Stopped);
                return Err(e);
            }
        };

        let order_ids: Vec<String> = acks.into_iter().map(|a| a.order_id).collect();
        self.run.trades_executed += 1;
        self.run.orders_outstanding = true;
        self.run.last_order_ids = order_ids.clone();
        metrics::record_trade(direction.as_str());

        info!(
            route = %direction,
            factor = %decision.selected_factor().unwrap_or_default(),
            trades = self.run.trades_executed,
            limit = self.settings.trade_limit,
            order_ids = ?order_ids,
            "Triangle placed"
        );

        let body = intents
            .iter()
            .zip(&order_ids)
            .map(|(intent, id)| {
                format!(
                    "{} {} {} @ {} ({})",
                    intent.side, intent.amount, intent.pair, intent.price, id
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.notify(&format!("Triangular arbitrage placed ({})", direction), &body)
            .await;

        let wait = if self.run.trades_executed >= self.settings.trade_limit {
            info!(limit = self.settings.trade_limit, "Trade limit reached");
            self.transition(EngineState::Stopped);
            Duration::ZERO
        } else {
            self.transition(EngineState::Reconciling);
            self.settings.trade_cooldown
        };

        Ok(StepReport::new(
            CycleOutcome::Traded {
                direction,
                order_ids,
            },
            wait,
        ))
    }

    async fn notify(&self, subject: &str, body: &str) {
        if let Err(e) = self.notifier.notify(subject, body).await {
            warn!(error = %e, subject = %subject, "Notification failed");
        }
    }

    fn transition(&mut self, next: EngineState) {
        if self.run.state != next {
            debug!(from = %self.run.state, to = %next, "State transition");
            self.run.state = next;
        }
    }

    async fn publish(&self) {
        if let Some(status) = &self.status {
            status
                .publish(self.run.status(self.settings.trade_limit))
                .await;
        }
    }
}
