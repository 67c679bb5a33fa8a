//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use fulfillment::CheckoutConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `text` or `json` (default: `text`)
/// - `DATABASE_URL` — PostgreSQL connection string; in-memory store when unset
/// - `PAYMENT_TIMEOUT_MS` — bound on the payment call (default: `5000`)
/// - `PAYMENT_SUCCESS_RATE` — approval rate of the mock processor (default: `0.9`)
/// - `LOW_STOCK_THRESHOLD` — default low-stock threshold (default: `10`)
/// - `SEED_DEMO_CATALOG` — seed demo books at startup (default: `false`)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub payment_timeout: Duration,
    pub payment_success_rate: f64,
    pub low_stock_threshold: u32,
    pub seed_demo_catalog: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse(lookup("PORT")).unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            payment_timeout: parse(lookup("PAYMENT_TIMEOUT_MS"))
                .map(Duration::from_millis)
                .unwrap_or(defaults.payment_timeout),
            payment_success_rate: parse(lookup("PAYMENT_SUCCESS_RATE"))
                .unwrap_or(defaults.payment_success_rate),
            low_stock_threshold: parse(lookup("LOW_STOCK_THRESHOLD"))
                .unwrap_or(defaults.low_stock_threshold),
            seed_demo_catalog: parse(lookup("SEED_DEMO_CATALOG"))
                .unwrap_or(defaults.seed_demo_catalog),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn checkout_config(&self) -> CheckoutConfig {
        CheckoutConfig {
            payment_timeout: self.payment_timeout,
        }
    }
}

fn parse<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            payment_timeout: Duration::from_millis(5000),
            payment_success_rate: 0.9,
            low_stock_threshold: 10,
            seed_demo_catalog: false,
        }
    }
}
