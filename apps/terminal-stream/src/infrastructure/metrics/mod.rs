//! Prometheus Metrics Module
//!
//! Records subscription activity through the `metrics` facade. Without an
//! installed recorder every call is a no-op, so the library never requires
//! one; the binary installs a Prometheus exporter when a port is configured.
//!
//! # Metrics
//!
//! - **Messages**: wire messages received and events delivered, per feed
//! - **Decode errors**: malformed messages skipped, per feed and reason
//! - **Failures**: subscriptions ended by a terminal error, per feed and kind
//! - **Subscriptions**: active subscription gauge, per feed

use std::net::SocketAddr;
use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::domain::error::StreamErrorKind;
use crate::domain::subscription::FeedKind;

const MESSAGES_RECEIVED: &str = "terminal_stream_messages_received_total";
const EVENTS_DELIVERED: &str = "terminal_stream_events_delivered_total";
const DECODE_ERRORS: &str = "terminal_stream_decode_errors_total";
const STREAM_FAILURES: &str = "terminal_stream_stream_failures_total";
const ACTIVE_SUBSCRIPTIONS: &str = "terminal_stream_active_subscriptions";

static EXPORTER_INSTALLED: OnceLock<SocketAddr> = OnceLock::new();

// =============================================================================
// Exporter
// =============================================================================

/// Install the Prometheus recorder and serve `/metrics` on `port`.
///
/// Calling this more than once is a no-op. Must run inside a Tokio runtime.
///
/// # Errors
///
/// Returns an error if the recorder or HTTP listener cannot be installed.
pub fn init_metrics(port: u16) -> Result<SocketAddr, BuildError> {
    if let Some(addr) = EXPORTER_INSTALLED.get() {
        return Ok(*addr);
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    register_metrics();
    Ok(*EXPORTER_INSTALLED.get_or_init(|| addr))
}

fn register_metrics() {
    describe_counter!(
        MESSAGES_RECEIVED,
        "Total wire messages received from the gateway"
    );
    describe_counter!(
        EVENTS_DELIVERED,
        "Total decoded events pushed onto data queues"
    );
    describe_counter!(
        DECODE_ERRORS,
        "Total malformed messages skipped without ending the subscription"
    );
    describe_counter!(
        STREAM_FAILURES,
        "Total subscriptions ended by a terminal error"
    );
    describe_gauge!(ACTIVE_SUBSCRIPTIONS, "Number of running subscriptions");
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a wire message received on a subscription.
pub fn record_message_received(feed: FeedKind) {
    counter!(MESSAGES_RECEIVED, "feed" => feed.as_str()).increment(1);
}

/// Record an event pushed onto a data queue.
pub fn record_event_delivered(feed: FeedKind) {
    counter!(EVENTS_DELIVERED, "feed" => feed.as_str()).increment(1);
}

/// Record a skipped malformed message.
pub fn record_decode_error(feed: FeedKind, reason: &'static str) {
    counter!(
        DECODE_ERRORS,
        "feed" => feed.as_str(),
        "reason" => reason
    )
    .increment(1);
}

/// Record a subscription ended by a terminal error.
pub fn record_stream_failure(feed: FeedKind, kind: StreamErrorKind) {
    counter!(
        STREAM_FAILURES,
        "feed" => feed.as_str(),
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record a subscription starting.
pub fn subscription_started(feed: FeedKind) {
    gauge!(ACTIVE_SUBSCRIPTIONS, "feed" => feed.as_str()).increment(1.0);
}

/// Record a subscription finishing.
pub fn subscription_finished(feed: FeedKind) {
    gauge!(ACTIVE_SUBSCRIPTIONS, "feed" => feed.as_str()).decrement(1.0);
}

// =============================================================================
// Tests
// =============================================================================
