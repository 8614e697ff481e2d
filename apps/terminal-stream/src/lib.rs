#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Terminal Stream - Trading Terminal Gateway Subscriptions
//!
//! Client-side streaming core for a remote trading-terminal gateway. Each
//! long-lived server-streaming feed becomes a typed subscription with two
//! independently consumable queues: decoded events, and at most one
//! terminal error.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Feed types and reconciliation rules
//!   - `streaming`: Ticks, profit deltas, ticket snapshots, trades, transactions
//!   - `subscription`: Feed kinds and immutable subscription descriptors
//!   - `reconcile`: Reference consumers rebuilding state from delta batches
//!   - `error`: The value delivered on error queues
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: The gateway transport interface
//!   - `services`: Subscription handles, queues, cancellation, retry policy
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `gateway`: gRPC client, wire schema and decoder
//!   - `config`: Environment configuration for the runner
//!   - `metrics`: Prometheus instrumentation
//!   - `telemetry`: Tracing subscriber and OTLP export
//!
//! # Data Flow
//!
//! ```text
//!                      ┌──────────────┐     ┌─────────┐     ┌────────────┐
//! Gateway stream ─────►│ RawMessage   │────►│ Decoder │────►│ data queue │──► consumer
//!                      │ Source       │     └─────────┘     └────────────┘
//!                      └──────┬───────┘          │ fatal
//! CancellationScope ─► pump ──┘                  ▼          ┌─────────────┐
//!                                          terminal error ─►│ error queue │──► consumer
//!                                                           └─────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Feed types with no transport dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::error::{StreamError, StreamErrorKind};
pub use domain::reconcile::{OrderBook, PositionBook, Reconcile, TicketSetView};
pub use domain::streaming::{
    AccountSnapshot, FeedEvent, OrderInfo, OrderState, OrderStateChange, OrderType,
    PositionProfit, ProfitDeltaBatch, Ticket, TickFlags, TickRecord, TicketSetSnapshot,
    TradeEventBatch, TransactionEvent, TransactionKind,
};
pub use domain::subscription::{DescriptorError, FeedKind, FeedParams, SubscriptionDescriptor};

// Ports
pub use application::ports::{GatewayTransport, RawMessageSource, TransportError, WireItem};

// Services
pub use application::services::{
    CancelCause, CancellationScope, DataReceiver, ErrorReceiver, Feed, FeedSubscriber,
    HandleState, OpenedTicketsFeed, PositionProfitFeed, RetryConfig, RetryPolicy,
    SubscribeError, Subscription, SubscriptionHandle, SubscriptionSettings, TickFeed,
    TradeEventFeed, TransactionFeed,
};

// Gateway adapter
pub use infrastructure::gateway::{DecodeError, GatewayClient, GatewayConfig, GatewayError};

// Configuration
pub use infrastructure::config::{ConfigError, StreamConfig};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
