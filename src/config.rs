//! Application configuration loaded from environment variables.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::arbitrage::{EngineSettings, SizingParams};
use crate::market::Triangle;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Triangle ===
    /// First pair; shares the anchor asset with pair C.
    pub ticker_pair_a: String,
    /// Second pair.
    pub ticker_pair_b: String,
    /// Third pair; shares the anchor asset with pair A.
    pub ticker_pair_c: String,
    /// First asset.
    pub ticker_a: String,
    /// Second asset.
    pub ticker_b: String,
    /// Third asset.
    pub ticker_c: String,

    // === Engine Parameters ===
    /// Trades allowed before the run stops.
    #[serde(default = "default_trade_limit")]
    pub trade_limit: u32,

    /// Seconds between polls while orders are open.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Minimum seconds between reconciliation status logs.
    #[serde(default = "default_reconcile_log_interval")]
    pub reconcile_log_interval_secs: u64,

    /// Seconds to wait after a cycle that did not trade.
    #[serde(default = "default_idle_delay")]
    pub idle_delay_secs: u64,

    /// Seconds to wait after placing a trade.
    #[serde(default = "default_trade_cooldown")]
    pub trade_cooldown_secs: u64,

    /// Fraction of each balance a leg may commit (0.8 = 20% margin).
    #[serde(default = "default_haircut")]
    pub balance_haircut: Decimal,

    /// Decimal places order amounts are rounded to.
    #[serde(default = "default_precision")]
    pub rounding_precision: u32,

    // === Operation Modes ===
    /// Simulation mode (no real orders).
    #[serde(default = "default_true")]
    pub dry_run: bool,

    // === Exchange ===
    /// Bitso REST API base URL.
    #[serde(default = "default_api_url")]
    pub bitso_api_url: String,

    /// Bitso API key.
    pub bitso_api_key: String,

    /// Bitso API secret.
    pub bitso_api_secret: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_ms: u64,

    /// Who receives trade notifications and alerts.
    #[serde(default)]
    pub alert_recipient: Option<String>,

    // === Server Configuration ===
    /// HTTP server port for health/status endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Serve Prometheus metrics.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Prometheus exporter port.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_trade_limit() -> u32 {
    10
}

fn default_poll_interval() -> u64 {
    300 // 5 minutes
}

fn default_reconcile_log_interval() -> u64 {
    1800 // 30 minutes
}

fn default_idle_delay() -> u64 {
    5
}

fn default_trade_cooldown() -> u64 {
    60
}

fn default_haircut() -> Decimal {
    Decimal::new(8, 1) // 0.8
}

fn default_precision() -> u32 {
    8
}

fn default_true() -> bool {
    true
}

fn default_api_url() -> String {
    "https://api.bitso.com/api".to_string()
}

fn default_http_timeout() -> u64 {
    5000
}

fn default_port() -> u16 {
    8080
}

fn default_metrics_port() -> u16 {
    9090
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        self.triangle()?;

        if self.balance_haircut <= Decimal::ZERO || self.balance_haircut > Decimal::ONE {
            return Err("BALANCE_HAIRCUT must be in (0, 1]".to_string());
        }

        if self.trade_limit == 0 {
            return Err("TRADE_LIMIT must be at least 1".to_string());
        }

        if self.poll_interval_secs == 0
            || self.reconcile_log_interval_secs == 0
            || self.idle_delay_secs == 0
            || self.trade_cooldown_secs == 0
        {
            return Err("intervals and delays must be at least 1 second".to_string());
        }

        if self.rounding_precision > 18 {
            return Err("ROUNDING_PRECISION must be at most 18".to_string());
        }

        if self.bitso_api_key.trim().is_empty() || self.bitso_api_secret.trim().is_empty() {
            return Err("BITSO_API_KEY and BITSO_API_SECRET are required".to_string());
        }

        if self.http_timeout_ms == 0 {
            return Err("HTTP_TIMEOUT_MS must be positive".to_string());
        }

        Ok(())
    }

    /// The configured triangle.
    pub fn triangle(&self) -> Result<Triangle, String> {
        Triangle::new(
            [
                self.ticker_pair_a.as_str(),
                self.ticker_pair_b.as_str(),
                self.ticker_pair_c.as_str(),
            ],
            [
                self.ticker_a.as_str(),
                self.ticker_b.as_str(),
                self.ticker_c.as_str(),
            ],
        )
    }

    /// Sizing parameters.
    pub fn sizing_params(&self) -> SizingParams {
        SizingParams {
            haircut: self.balance_haircut,
            precision: self.rounding_precision,
        }
    }

    /// Loop tunables.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            trade_limit: self.trade_limit,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            status_log_interval: Duration::from_secs(self.reconcile_log_interval_secs),
            idle_delay: Duration::from_secs(self.idle_delay_secs),
            trade_cooldown: Duration::from_secs(self.trade_cooldown_secs),
            sizing: self.sizing_params(),
        }
    }

    /// Notification recipient, or a placeholder.
    pub fn recipient(&self) -> &str {
        self.alert_recipient.as_deref().unwrap_or("operator")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn vars(extra: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = [
            ("TICKER_PAIR_A", "eth_mxn"),
            ("TICKER_PAIR_B", "eth_btc"),
            ("TICKER_PAIR_C", "btc_mxn"),
            ("TICKER_A", "mxn"),
            ("TICKER_B", "eth"),
            ("TICKER_C", "btc"),
            ("BITSO_API_KEY", "key"),
            ("BITSO_API_SECRET", "secret"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            vars.retain(|(key, _)| key != k);
            vars.push((k.to_string(), v.to_string()));
        }
        vars
    }

    fn config(extra: &[(&str, &str)]) -> Config {
        envy::from_iter(vars(extra)).unwrap()
    }

    #[test]
    fn default_values_are_sensible() {
        let config = config(&[]);

        assert_eq!(config.trade_limit, 10);
        assert_eq!(config.balance_haircut, dec!(0.8));
        assert_eq!(config.rounding_precision, 8);
        assert!(config.dry_run);
        assert_eq!(config.bitso_api_url, "https://api.bitso.com/api");
        assert!(config.validate().is_ok());

        let settings = config.engine_settings();
        assert_eq!(settings.poll_interval, Duration::from_secs(300));
        assert_eq!(settings.status_log_interval, Duration::from_secs(1800));
        assert_eq!(settings.idle_delay, Duration::from_secs(5));
        assert_eq!(settings.trade_cooldown, Duration::from_secs(60));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config(&[
            ("TRADE_LIMIT", "3"),
            ("BALANCE_HAIRCUT", "0.5"),
            ("DRY_RUN", "false"),
            ("ALERT_RECIPIENT", "ops@example.com"),
        ]);

        assert_eq!(config.trade_limit, 3);
        assert_eq!(config.sizing_params().haircut, dec!(0.5));
        assert!(!config.dry_run);
        assert_eq!(config.recipient(), "ops@example.com");
    }

    #[test]
    fn missing_required_variable_fails() {
        let vars: Vec<(String, String)> = vars(&[])
            .into_iter()
            .filter(|(k, _)| k != "TICKER_PAIR_B")
            .collect();
        assert!(envy::from_iter::<_, Config>(vars).is_err());
    }

    #[test]
    fn validate_rejects_open_triangle() {
        let config = config(&[("TICKER_PAIR_C", "xrp_mxn")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_haircut() {
        assert!(config(&[("BALANCE_HAIRCUT", "0")]).validate().is_err());
        assert!(config(&[("BALANCE_HAIRCUT", "1.2")]).validate().is_err());
        assert!(config(&[("BALANCE_HAIRCUT", "1")]).validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_limits_and_intervals() {
        assert!(config(&[("TRADE_LIMIT", "0")]).validate().is_err());
        assert!(config(&[("IDLE_DELAY_SECS", "0")]).validate().is_err());
        assert!(config(&[("ROUNDING_PRECISION", "19")]).validate().is_err());
        assert!(config(&[("BITSO_API_SECRET", " ")]).validate().is_err());
    }
}
