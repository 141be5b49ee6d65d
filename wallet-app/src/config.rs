//! Configuration loading from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use wallet_hex::{ExchangeConfig, LedgerConfig, Strategy};

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Remote rate service; the built-in table is used when unset.
    pub rate_service_url: Option<String>,
    pub log_format: LogFormat,
    pub otlp_endpoint: Option<String>,
    pub ledger: LedgerConfig,
    pub exchange: ExchangeConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = parse_or(&get, "PORT", 3000u16)?;

        let database_url = get("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let rate_service_url = get("RATE_SERVICE_URL").filter(|v| !v.trim().is_empty());
        let otlp_endpoint = get("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.trim().is_empty());

        let log_format = match get("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("pretty") | Some("text") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{other}'"),
        };

        let defaults = LedgerConfig::default();
        let strategy = match get("LEDGER_STRATEGY") {
            Some(raw) => raw.parse::<Strategy>().map_err(anyhow::Error::msg)?,
            None => defaults.strategy,
        };
        let ledger = LedgerConfig {
            strategy,
            store_timeout: millis_or(&get, "STORE_TIMEOUT_MS", defaults.store_timeout)?,
            max_conflict_retries: parse_or(
                &get,
                "MAX_CONFLICT_RETRIES",
                defaults.max_conflict_retries,
            )?,
            conflict_backoff: defaults.conflict_backoff,
        };

        let defaults = ExchangeConfig::default();
        let exchange = ExchangeConfig {
            rate_timeout: millis_or(&get, "RATE_TIMEOUT_MS", defaults.rate_timeout)?,
            rate_retries: parse_or(&get, "RATE_RETRIES", defaults.rate_retries)?,
            rate_backoff: defaults.rate_backoff,
        };

        Ok(Self {
            port,
            database_url,
            rate_service_url,
            log_format,
            otlp_endpoint,
            ledger,
            exchange,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: '{raw}'")),
        None => Ok(default),
    }
}

fn millis_or(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> anyhow::Result<Duration> {
    let ms = parse_or(get, key, default.as_millis() as u64)?;
    anyhow::ensure!(ms > 0, "{key} must be greater than zero");
    Ok(Duration::from_millis(ms))
}
