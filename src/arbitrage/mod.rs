//! Arbitrage module for detecting and executing triangular opportunities.
//!
//! This module handles:
//! - Concurrent market snapshots of the three pairs
//! - Route factor evaluation in both directions
//! - Leg sizing against balances and exchange limits
//! - The polling state machine that ties them together

pub mod calculator;
pub mod detector;
pub mod orchestrator;
pub mod sizer;
pub mod snapshot;

pub use calculator::{evaluate_routes, leg_sides, route_factor, RouteDecision, RouteDirection};
pub use detector::{check_arbitrage, diagnose, RouteDiagnosis};
pub use orchestrator::{
    CycleOutcome, EngineSettings, EngineState, EngineStatus, Orchestrator, RunState, RunSummary,
    StepReport,
};
pub use sizer::{round_amount, size_legs, SizingParams};
pub use snapshot::{read_limits, read_snapshot, MarketSnapshot, TriangleLimits};
