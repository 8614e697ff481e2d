//! Configuration for the gateway client.

use std::time::Duration;

/// Configuration for connecting to the trading-terminal gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Gateway endpoint (e.g., `http://localhost:5000`).
    pub endpoint: String,

    /// Terminal session id, sent as `id` request metadata.
    pub session_id: Option<String>,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// TCP keepalive interval.
    pub tcp_keepalive: Duration,

    /// HTTP/2 keepalive interval.
    pub http2_keepalive_interval: Duration,

    /// Keepalive timeout.
    pub keepalive_timeout: Duration,

    /// Whether to use TLS.
    pub use_tls: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000".to_string(),
            session_id: None,
            connect_timeout: Duration::from_secs(10),
            tcp_keepalive: Duration::from_secs(60),
            http2_keepalive_interval: Duration::from_secs(75),
            keepalive_timeout: Duration::from_secs(20),
            use_tls: false,
        }
    }
}

impl GatewayConfig {
    /// Create a new configuration with the given endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the terminal session id.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable TLS.
    #[must_use]
    pub const fn with_tls(mut self) -> Self {
        self.use_tls = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = GatewayConfig::new("https://gateway.example:443")
            .with_session_id("b6f1c2")
            .with_connect_timeout(Duration::from_secs(3))
            .with_tls();

        assert_eq!(config.endpoint, "https://gateway.example:443");
        assert_eq!(config.session_id.as_deref(), Some("b6f1c2"));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert!(config.use_tls);
        assert_eq!(config.keepalive_timeout, Duration::from_secs(20));
    }
}
