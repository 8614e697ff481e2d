use std::time::Duration;

use crate::application::services::SubscriptionSettings;
use crate::infrastructure::gateway::GatewayConfig;

/// Symbols subscribed by the runner when none are configured.
const DEFAULT_SYMBOLS: &[&str] = &["EURUSD"];

/// Complete runner configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Gateway connection settings.
    pub gateway: GatewayConfig,
    /// Defaults applied to every subscription.
    pub subscription: SubscriptionSettings,
    /// Symbols for the tick feed.
    pub symbols: Vec<String>,
    /// Prometheus metrics port (0 = disabled).
    pub metrics_port: u16,
}

impl StreamConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("GATEWAY_ENDPOINT")
            .ok_or_else(|| ConfigError::MissingEnvVar("GATEWAY_ENDPOINT".to_string()))?;
        if endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyValue("GATEWAY_ENDPOINT".to_string()));
        }

        let defaults = GatewayConfig::default();
        let gateway = GatewayConfig {
            endpoint: endpoint.trim().to_string(),
            session_id: lookup("GATEWAY_SESSION_ID").filter(|id| !id.trim().is_empty()),
            connect_timeout: parse_duration_secs(
                lookup("GATEWAY_CONNECT_TIMEOUT_SECS").as_deref(),
                defaults.connect_timeout,
            ),
            use_tls: parse_bool(lookup("GATEWAY_USE_TLS").as_deref(), defaults.use_tls),
            ..defaults
        };

        let defaults = SubscriptionSettings::default();
        let subscription = SubscriptionSettings {
            buffer_depth: parse_usize(
                lookup("TERMINAL_STREAM_BUFFER_DEPTH").as_deref(),
                defaults.buffer_depth,
            ),
            grace_period: parse_duration_millis(
                lookup("TERMINAL_STREAM_CANCEL_GRACE_MS").as_deref(),
                defaults.grace_period,
            ),
            feed_interval: parse_duration_millis(
                lookup("TERMINAL_STREAM_PROFIT_INTERVAL_MS").as_deref(),
                defaults.feed_interval,
            ),
            ..defaults
        };

        Ok(Self {
            gateway,
            subscription,
            symbols: parse_symbols(lookup("TERMINAL_STREAM_SYMBOLS").as_deref()),
            metrics_port: parse_u16(lookup("TERMINAL_STREAM_METRICS_PORT").as_deref(), 0),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_u16(value: Option<&str>, default: u16) -> u16 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_usize(value: Option<&str>, default: usize) -> usize {
    value
        .and_then(|v| v.trim().parse().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
}

fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

fn parse_duration_secs(value: Option<&str>, default: Duration) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&n| n > 0)
        .map_or(default, Duration::from_secs)
}

fn parse_duration_millis(value: Option<&str>, default: Duration) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&n| n > 0)
        .map_or(default, Duration::from_millis)
}

fn parse_symbols(value: Option<&str>) -> Vec<String> {
    let symbols: Vec<String> = value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase)
        .collect();

    if symbols.is_empty() {
        DEFAULT_SYMBOLS.iter().map(|s| (*s).to_string()).collect()
    } else {
        symbols
    }
}
