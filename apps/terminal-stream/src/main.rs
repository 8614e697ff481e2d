//! Terminal Stream Runner
//!
//! Subscribes to every gateway feed and prints the decoded events as JSON
//! lines until Ctrl+C or SIGTERM. Feeds that end with a retryable error are
//! resubscribed with backoff.
//!
//! # Usage
//!
//! ```bash
//! GATEWAY_ENDPOINT=http://localhost:5000 cargo run --bin terminal-stream
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `GATEWAY_ENDPOINT`: Gateway gRPC endpoint
//!
//! ## Optional
//! - `GATEWAY_SESSION_ID`: Terminal session id sent with every call
//! - `GATEWAY_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `GATEWAY_USE_TLS`: Use TLS with native roots (default: false)
//! - `TERMINAL_STREAM_BUFFER_DEPTH`: Data queue depth (default: 1000)
//! - `TERMINAL_STREAM_CANCEL_GRACE_MS`: Teardown grace period (default: 2000)
//! - `TERMINAL_STREAM_PROFIT_INTERVAL_MS`: Profit/ticket timer period (default: 1000)
//! - `TERMINAL_STREAM_SYMBOLS`: Comma-separated tick symbols (default: EURUSD)
//! - `TERMINAL_STREAM_METRICS_PORT`: Prometheus metrics port (default: 0 = disabled)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use terminal_stream::infrastructure::config::StreamConfig;
use terminal_stream::infrastructure::gateway::GatewayClient;
use terminal_stream::infrastructure::{metrics, telemetry};
use terminal_stream::{
    CancellationScope, Feed, FeedSubscriber, OpenedTicketsFeed, OrderBook, PositionBook,
    PositionProfitFeed, Reconcile, RetryPolicy, SubscribeError, SubscriptionDescriptor, TickFeed,
    TicketSetView, TradeEventFeed, TransactionFeed,
};
use tokio::signal;
use tokio::task::JoinSet;

/// Time allowed for feeds to stop after shutdown is requested.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("rustls crypto provider already installed"))?;

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting terminal stream");

    let config = StreamConfig::from_env().context("failed to load configuration")?;
    log_config(&config);

    if config.metrics_port != 0 {
        let addr = metrics::init_metrics(config.metrics_port)
            .context("failed to start metrics exporter")?;
        tracing::info!(%addr, "Metrics exporter listening");
    }

    let client = GatewayClient::connect_lazy(&config.gateway)?;
    let subscriber = FeedSubscriber::new(Arc::new(client), config.subscription.clone());
    let root = CancellationScope::new();

    let mut feeds = JoinSet::new();

    let ticks = subscriber.configure(SubscriptionDescriptor::ticks(config.symbols.clone())?)?;
    feeds.spawn(run_feed::<TickFeed, _>(
        subscriber.clone(),
        ticks,
        root.child(),
        print_event,
    ));

    let mut positions = PositionBook::new();
    feeds.spawn(run_feed::<PositionProfitFeed, _>(
        subscriber.clone(),
        subscriber.configure(SubscriptionDescriptor::position_profits())?,
        root.child(),
        move |batch| {
            positions.apply(batch);
            print_event(batch);
            tracing::debug!(
                open_positions = positions.len(),
                total_profit = %positions.total_profit(),
                "Position book updated"
            );
        },
    ));

    let mut tickets = TicketSetView::new();
    feeds.spawn(run_feed::<OpenedTicketsFeed, _>(
        subscriber.clone(),
        subscriber.configure(SubscriptionDescriptor::opened_tickets())?,
        root.child(),
        move |snapshot| {
            tickets.apply(snapshot);
            print_event(snapshot);
        },
    ));

    let mut orders = OrderBook::new();
    feeds.spawn(run_feed::<TradeEventFeed, _>(
        subscriber.clone(),
        subscriber.configure(SubscriptionDescriptor::trade_events())?,
        root.child(),
        move |batch| {
            orders.apply(batch);
            print_event(batch);
            tracing::debug!(open_orders = orders.len(), "Order book updated");
        },
    ));

    feeds.spawn(run_feed::<TransactionFeed, _>(
        subscriber.clone(),
        subscriber.configure(SubscriptionDescriptor::transactions())?,
        root.child(),
        print_event,
    ));

    tokio::select! {
        () = await_shutdown() => {}
        () = join_feeds(&mut feeds) => {
            tracing::warn!("All feeds stopped");
        }
    }

    root.cancel();
    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );

    let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, join_feeds(&mut feeds)).await;
    if drained.is_err() {
        tracing::warn!("Feeds did not stop in time, aborting");
        feeds.abort_all();
    }

    tracing::info!("Terminal stream stopped");
    Ok(())
}

/// Keep one feed subscribed until its scope is cancelled or retries run out.
async fn run_feed<F, H>(
    subscriber: FeedSubscriber,
    descriptor: SubscriptionDescriptor,
    scope: CancellationScope,
    mut on_event: H,
) where
    F: Feed,
    H: FnMut(&F::Event) + Send + 'static,
{
    let feed = F::KIND;
    let mut retry = RetryPolicy::default();

    loop {
        let delay = match subscriber.subscribe::<F>(descriptor.clone(), &scope).await {
            Ok(subscription) => {
                let (mut data, mut errors, handle) = subscription.into_parts();
                tracing::info!(%feed, subscription_id = %handle.id(), "Feed subscribed");

                let mut delivered: u64 = 0;
                while let Some(event) = data.recv().await {
                    if delivered == 0 {
                        retry.reset();
                    }
                    delivered += 1;
                    on_event(&event);
                }
                handle.join().await;

                match errors.recv().await {
                    Some(error) => {
                        tracing::warn!(
                            %feed,
                            %error,
                            retryable = error.is_retryable(),
                            delivered,
                            "Feed ended with error"
                        );
                        retry.delay_after(&error)
                    }
                    None => {
                        tracing::info!(%feed, delivered, "Feed closed by gateway");
                        retry.next_delay()
                    }
                }
            }
            Err(SubscribeError::Open(error)) => {
                tracing::warn!(%feed, %error, "Failed to open feed");
                retry.delay_after(&error.to_stream_error())
            }
            Err(error) => {
                tracing::error!(%feed, %error, "Feed cannot be subscribed");
                None
            }
        };

        if scope.is_cancelled() {
            break;
        }
        let Some(delay) = delay else {
            tracing::error!(%feed, attempts = retry.attempts(), "Giving up on feed");
            break;
        };

        tracing::info!(%feed, ?delay, attempt = retry.attempts(), "Resubscribing after delay");
        tokio::select! {
            _ = scope.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    tracing::info!(%feed, "Feed stopped");
}

/// Print one event as a JSON line.
fn print_event<E: Serialize>(event: &E) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize event"),
    }
}

/// Wait for every feed task, logging tasks that panicked.
async fn join_feeds(feeds: &mut JoinSet<()>) {
    while let Some(result) = feeds.join_next().await {
        if let Err(e) = result
            && e.is_panic()
        {
            tracing::error!(error = %e, "Feed task panicked");
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &StreamConfig) {
    tracing::info!(
        endpoint = %config.gateway.endpoint,
        tls = config.gateway.use_tls,
        session = config.gateway.session_id.is_some(),
        symbols = ?config.symbols,
        metrics_port = config.metrics_port,
        "Configuration loaded"
    );
    tracing::debug!(
        buffer_depth = config.subscription.buffer_depth,
        grace_period = ?config.subscription.grace_period,
        feed_interval = ?config.subscription.feed_interval,
        "Subscription defaults"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
