//! HTTP API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::arbitrage::EngineStatus;

/// Application state shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Whether the engine has loaded limits and started cycling.
    pub ready: Arc<AtomicBool>,
    /// Whether orders are simulated.
    pub dry_run: bool,
    /// Configured triangle label.
    pub triangle: Arc<RwLock<Option<String>>>,
    /// Latest published engine status.
    pub engine: Arc<RwLock<EngineStatus>>,
}

impl AppState {
    /// Create new app state.
    pub fn new(dry_run: bool) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            dry_run,
            triangle: Arc::new(RwLock::new(None)),
            engine: Arc::new(RwLock::new(EngineStatus::default())),
        }
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Record the configured triangle.
    pub async fn set_triangle(&self, label: String) {
        *self.triangle.write().await = Some(label);
    }

    /// Replace the published engine status.
    pub async fn publish(&self, status: EngineStatus) {
        *self.engine.write().await = status;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether service is ready.
    pub ready: bool,
    /// Configured triangle if known.
    pub triangle: Option<String>,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Whether orders are simulated.
    pub dry_run: bool,
    /// Configured triangle.
    pub triangle: Option<String>,
    /// Engine status.
    pub engine: EngineStatus,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let triangle = state.triangle.read().await.clone();

    let response = ReadyResponse {
        ready: is_ready,
        triangle,
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns the latest published engine status.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let triangle = state.triangle.read().await.clone();
    let engine = state.engine.read().await.clone();

    let status = match engine.state {
        Some(crate::arbitrage::EngineState::Stopped) => "stopped",
        Some(_) if state.is_ready() => "running",
        _ => "starting",
    };

    Json(StatusResponse {
        status,
        dry_run: state.dry_run,
        triangle,
        engine,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_state_ready_toggle() {
        let state = AppState::new(true);
        assert!(!state.is_ready());

        state.set_ready(true);
        assert!(state.is_ready());

        state.set_ready(false);
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn publish_replaces_status() {
        let state = AppState::default();
        state
            .publish(EngineStatus {
                trades_executed: 2,
                trade_limit: 10,
                ..EngineStatus::default()
            })
            .await;
        assert_eq!(state.engine.read().await.trades_executed, 2);
    }
}
