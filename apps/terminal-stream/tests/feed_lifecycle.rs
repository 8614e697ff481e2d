//! Feed Lifecycle Integration Tests
//!
//! Drives subscriptions through the public subscriber API over a scripted
//! transport: delivery order, skipped messages, terminal errors,
//! cancellation, backpressure and teardown.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tokio::time::{Instant, timeout};

use support::{
    ScriptedTransport, channel_source, deal_transaction, empty_trade, gateway_error_tick,
    malformed_tick, profit_batch, subscriber, tick, ticket_snapshot, trade_batch,
};
use terminal_stream::application::services::TryRecvError;
use terminal_stream::{
    CancellationScope, Feed, HandleState, RawMessageSource, StreamErrorKind, Subscription,
    SubscriptionSettings, TransportError,
};

const T0: i64 = 1_700_000_000_000;

fn price(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap()
}

#[tokio::test]
async fn ticks_arrive_in_order_and_clean_close_has_no_error() {
    let (tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());

    tx.send(Ok(tick("EURUSD", 1.1, 1.1002, T0))).await.unwrap();
    tx.send(Ok(tick("GBPUSD", 1.27, 1.2703, T0 + 5))).await.unwrap();
    drop(tx);

    let scope = CancellationScope::new();
    let (mut data, mut errors, handle) = subscriber
        .subscribe_ticks(["EURUSD", "GBPUSD"], &scope)
        .await
        .unwrap()
        .into_parts();

    let first = data.recv().await.unwrap();
    assert_eq!(first.symbol, "EURUSD");
    assert_eq!(first.bid, price(1.1));
    assert_eq!(first.ask, price(1.1002));
    assert_eq!(first.time.timestamp_millis(), T0);

    let second = data.recv().await.unwrap();
    assert_eq!(second.symbol, "GBPUSD");
    assert_eq!(second.bid, price(1.27));

    assert!(data.recv().await.is_none());
    assert!(errors.recv().await.is_none());

    handle.join().await;
    assert_eq!(handle.state(), HandleState::Closed);
    assert_eq!(transport.opened(), 1);
}

#[tokio::test]
async fn malformed_message_is_skipped() {
    let (tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());

    tx.send(Ok(tick("EURUSD", 1.1, 1.1002, T0))).await.unwrap();
    tx.send(Ok(malformed_tick())).await.unwrap();
    tx.send(Ok(tick("EURUSD", 1.1001, 1.1003, T0 + 1))).await.unwrap();
    drop(tx);

    let (mut data, mut errors, _handle) = subscriber
        .subscribe_ticks(["EURUSD"], &CancellationScope::new())
        .await
        .unwrap()
        .into_parts();

    let mut bids = Vec::new();
    while let Some(tick) = data.recv().await {
        bids.push(tick.bid);
    }

    assert_eq!(bids, vec![price(1.1), price(1.1001)]);
    assert!(errors.recv().await.is_none());
}

#[tokio::test]
async fn cancel_before_any_message() {
    let (tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());
    let scope = CancellationScope::new();

    let (mut data, mut errors, handle) = subscriber
        .subscribe_ticks(["EURUSD"], &scope)
        .await
        .unwrap()
        .into_parts();

    scope.cancel();

    assert!(data.recv().await.is_none());
    let error = errors.recv().await.unwrap();
    assert_eq!(error.kind(), StreamErrorKind::Cancelled);
    assert!(!error.is_retryable());
    assert!(errors.recv().await.is_none());

    handle.join().await;
    assert_eq!(handle.state(), HandleState::Closed);
    drop(tx);
}

#[tokio::test(start_paused = true)]
async fn deadline_ends_subscription_with_retryable_error() {
    let (_tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());
    let started = Instant::now();
    let scope = CancellationScope::with_deadline(Duration::from_secs(5));

    let (mut data, mut errors, handle) = subscriber
        .subscribe_ticks(["EURUSD"], &scope)
        .await
        .unwrap()
        .into_parts();

    assert!(data.recv().await.is_none());
    assert!(started.elapsed() >= Duration::from_secs(5));

    let error = errors.recv().await.unwrap();
    assert_eq!(error.kind(), StreamErrorKind::DeadlineExceeded);
    assert!(error.is_retryable());

    handle.join().await;
    assert_eq!(handle.state(), HandleState::Closed);
}

#[tokio::test]
async fn transport_error_yields_exactly_one_error() {
    let (tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());

    tx.send(Ok(tick("EURUSD", 1.1, 1.1002, T0))).await.unwrap();
    tx.send(Err(TransportError::Aborted {
        message: "connection reset".to_string(),
    }))
    .await
    .unwrap();

    let (mut data, mut errors, handle) = subscriber
        .subscribe_ticks(["EURUSD"], &CancellationScope::new())
        .await
        .unwrap()
        .into_parts();

    assert!(data.recv().await.is_some());
    assert!(data.recv().await.is_none());

    let error = errors.recv().await.unwrap();
    assert_eq!(error.kind(), StreamErrorKind::TransportClosed);
    assert!(error.is_retryable());
    assert!(error.message().contains("connection reset"));
    assert!(errors.recv().await.is_none());

    handle.join().await;
    assert_eq!(handle.state(), HandleState::Failed);
    drop(tx);
}

#[tokio::test]
async fn gateway_error_in_envelope_is_fatal() {
    let (tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());

    tx.send(Ok(gateway_error_tick(4301, "symbol not found"))).await.unwrap();
    tx.send(Ok(tick("EURUSD", 1.1, 1.1002, T0))).await.unwrap();

    let (mut data, mut errors, handle) = subscriber
        .subscribe_ticks(["EURUSD"], &CancellationScope::new())
        .await
        .unwrap()
        .into_parts();

    assert!(data.recv().await.is_none());
    let error = errors.recv().await.unwrap();
    assert_eq!(error.kind(), StreamErrorKind::DecodeFailure);
    assert!(!error.is_retryable());

    handle.join().await;
    assert_eq!(handle.state(), HandleState::Failed);
    drop(tx);
}

#[tokio::test]
async fn reply_of_another_feed_is_fatal() {
    let (tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());

    tx.send(Ok(empty_trade())).await.unwrap();

    let (mut data, mut errors, _handle) = subscriber
        .subscribe_ticks(["EURUSD"], &CancellationScope::new())
        .await
        .unwrap()
        .into_parts();

    assert!(data.recv().await.is_none());
    assert_eq!(
        errors.recv().await.unwrap().kind(),
        StreamErrorKind::DecodeFailure
    );
    drop(tx);
}

#[tokio::test]
async fn closure_is_terminal() {
    let (tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());
    drop(tx);

    let (mut data, mut errors, handle) = subscriber
        .subscribe_ticks(["EURUSD"], &CancellationScope::new())
        .await
        .unwrap()
        .into_parts();

    handle.join().await;
    assert_eq!(handle.state(), HandleState::Closed);

    handle.stop();
    assert_eq!(handle.state(), HandleState::Closed);

    assert!(data.recv().await.is_none());
    assert!(data.recv().await.is_none());
    assert!(matches!(data.try_recv(), Err(TryRecvError::Disconnected)));
    assert!(errors.recv().await.is_none());
    assert!(matches!(errors.try_recv(), Err(TryRecvError::Disconnected)));
}

#[tokio::test]
async fn pending_transport_error_wins_over_cancellation() {
    let (tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());
    let scope = CancellationScope::new();

    let (mut data, mut errors, handle) = subscriber
        .subscribe_ticks(["EURUSD"], &scope)
        .await
        .unwrap()
        .into_parts();

    tx.try_send(Err(TransportError::Unavailable {
        message: "gateway restarting".to_string(),
    }))
    .unwrap();
    scope.cancel();

    assert!(data.recv().await.is_none());
    let error = errors.recv().await.unwrap();
    assert_eq!(error.kind(), StreamErrorKind::TransportClosed);
    assert!(errors.recv().await.is_none());

    handle.join().await;
    assert_eq!(handle.state(), HandleState::Failed);
}

#[tokio::test]
async fn pending_fatal_envelope_wins_over_cancellation() {
    let (tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());
    let scope = CancellationScope::new();

    let (mut data, mut errors, handle) = subscriber
        .subscribe_ticks(["EURUSD"], &scope)
        .await
        .unwrap()
        .into_parts();

    tx.try_send(Ok(gateway_error_tick(1, "terminal disconnected")))
        .unwrap();
    scope.cancel();

    assert!(data.recv().await.is_none());
    let error = errors.recv().await.unwrap();
    assert_eq!(error.kind(), StreamErrorKind::DecodeFailure);
    assert!(error.message().contains("terminal disconnected"));
    assert!(errors.recv().await.is_none());

    handle.join().await;
    assert_eq!(handle.state(), HandleState::Failed);
}

#[tokio::test]
async fn pending_valid_message_does_not_beat_cancellation() {
    let (tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());
    let scope = CancellationScope::new();

    let (mut data, mut errors, handle) = subscriber
        .subscribe_ticks(["EURUSD"], &scope)
        .await
        .unwrap()
        .into_parts();

    tx.try_send(Ok(tick("EURUSD", 1.1, 1.2, T0))).unwrap();
    scope.cancel();

    assert!(data.recv().await.is_none());
    assert_eq!(
        errors.recv().await.unwrap().kind(),
        StreamErrorKind::Cancelled
    );

    handle.join().await;
    assert_eq!(handle.state(), HandleState::Closed);
}

#[tokio::test]
async fn cancellation_flushes_buffered_events_before_closing() {
    let (tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());
    let scope = CancellationScope::new();

    let (mut data, mut errors, handle) = subscriber
        .subscribe_ticks(["EURUSD"], &scope)
        .await
        .unwrap()
        .into_parts();

    for i in 0..3_i32 {
        tx.send(Ok(tick("EURUSD", 1.1 + f64::from(i) / 100.0, 1.2, T0 + i64::from(i))))
            .await
            .unwrap();
    }
    timeout(Duration::from_secs(1), async {
        while data.len() < 3 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("pump did not buffer the ticks");

    scope.cancel();
    handle.join().await;
    assert_eq!(handle.state(), HandleState::Closed);

    let mut delivered = Vec::new();
    while let Some(event) = data.recv().await {
        delivered.push(event.time.timestamp_millis());
    }
    assert_eq!(delivered, vec![T0, T0 + 1, T0 + 2]);

    assert_eq!(
        errors.recv().await.unwrap().kind(),
        StreamErrorKind::Cancelled
    );
    assert!(errors.recv().await.is_none());
    drop(tx);
}

#[tokio::test]
async fn gateway_close_before_cancellation_emits_no_error() {
    let (tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());
    let scope = CancellationScope::new();

    let (mut data, mut errors, handle) = subscriber
        .subscribe_ticks(["EURUSD"], &scope)
        .await
        .unwrap()
        .into_parts();

    drop(tx);
    scope.cancel();

    assert!(data.recv().await.is_none());
    assert!(errors.recv().await.is_none());
    handle.join().await;
    assert_eq!(handle.state(), HandleState::Closed);
}

#[tokio::test]
async fn slow_consumer_applies_backpressure_without_loss() {
    let (tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(
        &transport,
        SubscriptionSettings {
            buffer_depth: 4,
            ..SubscriptionSettings::default()
        },
    );

    for i in 0..10_i32 {
        let bid = 1.0 + f64::from(i) / 100.0;
        tx.send(Ok(tick("EURUSD", bid, 2.0, T0 + i64::from(i))))
            .await
            .unwrap();
    }
    drop(tx);

    let (mut data, mut errors, _handle) = subscriber
        .subscribe_ticks(["EURUSD"], &CancellationScope::new())
        .await
        .unwrap()
        .into_parts();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(data.len(), 4);

    let mut times = Vec::new();
    while let Some(tick) = data.recv().await {
        times.push(tick.time.timestamp_millis() - T0);
    }
    assert_eq!(times, (0..10).collect::<Vec<_>>());
    assert!(errors.recv().await.is_none());
}

#[tokio::test]
async fn dropping_data_queue_stops_pump_silently() {
    let (tx, source) = channel_source();
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());

    let (data, mut errors, handle) = subscriber
        .subscribe_ticks(["EURUSD"], &CancellationScope::new())
        .await
        .unwrap()
        .into_parts();

    drop(data);
    timeout(Duration::from_secs(1), handle.join()).await.unwrap();

    assert_eq!(handle.state(), HandleState::Closed);
    assert!(errors.recv().await.is_none());
    drop(tx);
}

#[tokio::test]
async fn teardown_runs_before_queues_close() {
    let released = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&released);
    let (tx, rx) = tokio::sync::mpsc::channel(8);
    let source = RawMessageSource::from_receiver(rx).with_teardown(async move {
        flag.store(true, Ordering::SeqCst);
    });
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());

    let (mut data, mut errors, handle) = subscriber
        .subscribe_ticks(["EURUSD"], &CancellationScope::new())
        .await
        .unwrap()
        .into_parts();

    handle.stop();
    assert!(data.recv().await.is_none());
    assert!(released.load(Ordering::SeqCst));
    assert_eq!(errors.recv().await.unwrap().kind(), StreamErrorKind::Cancelled);
    drop(tx);
}

#[tokio::test(start_paused = true)]
async fn stuck_teardown_is_abandoned_after_grace_period() {
    let (tx, rx) = tokio::sync::mpsc::channel(8);
    let source = RawMessageSource::from_receiver(rx).with_teardown(std::future::pending::<()>());
    let transport = ScriptedTransport::new([source]);
    let subscriber = subscriber(
        &transport,
        SubscriptionSettings {
            grace_period: Duration::from_millis(200),
            ..SubscriptionSettings::default()
        },
    );

    let (mut data, mut errors, handle) = subscriber
        .subscribe_ticks(["EURUSD"], &CancellationScope::new())
        .await
        .unwrap()
        .into_parts();

    let started = Instant::now();
    handle.stop();
    handle.join().await;

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(handle.state(), HandleState::Closed);
    assert!(data.recv().await.is_none());
    assert_eq!(errors.recv().await.unwrap().kind(), StreamErrorKind::Cancelled);
    drop(tx);
}

#[tokio::test]
async fn subscriptions_are_independent() {
    let (tick_tx, tick_source) = channel_source();
    let (other_tx, other_source) = channel_source();
    let transport = ScriptedTransport::new([tick_source, other_source]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());
    let scope = CancellationScope::new();

    let first = subscriber.subscribe_ticks(["EURUSD"], &scope).await.unwrap();
    let mut second = subscriber.subscribe_ticks(["GBPUSD"], &scope).await.unwrap();

    first.handle.stop();
    first.handle.join().await;
    assert_eq!(first.handle.state(), HandleState::Closed);

    other_tx.send(Ok(tick("GBPUSD", 1.27, 1.2703, T0))).await.unwrap();
    let tick = second.data.recv().await.unwrap();
    assert_eq!(tick.symbol, "GBPUSD");
    assert_eq!(second.handle.state(), HandleState::Active);
    assert_ne!(first.handle.id(), second.handle.id());

    scope.cancel();
    second.handle.join().await;
    assert_eq!(second.handle.state(), HandleState::Closed);
    drop(tick_tx);
}

#[tokio::test]
async fn open_failure_is_reported_to_caller() {
    let transport = ScriptedTransport::new([]);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());

    let result = subscriber
        .subscribe_ticks(["EURUSD"], &CancellationScope::new())
        .await;

    assert!(matches!(
        result,
        Err(terminal_stream::SubscribeError::Open(TransportError::Unavailable { .. }))
    ));
}

/// Cancel `scope` and check both queues close for good with one `Cancelled`.
async fn assert_cancel_is_terminal<F: Feed>(
    subscription: Subscription<F>,
    scope: &CancellationScope,
) {
    let (mut data, mut errors, handle) = subscription.into_parts();

    scope.cancel();

    assert!(data.recv().await.is_none(), "{} delivered data", F::KIND);
    let error = errors.recv().await.unwrap();
    assert_eq!(error.kind(), StreamErrorKind::Cancelled, "{}", F::KIND);

    handle.join().await;
    assert_eq!(handle.state(), HandleState::Closed, "{}", F::KIND);

    assert!(data.recv().await.is_none());
    assert!(matches!(data.try_recv(), Err(TryRecvError::Disconnected)));
    assert!(errors.recv().await.is_none());
    assert!(matches!(errors.try_recv(), Err(TryRecvError::Disconnected)));
}

/// Read until the gateway closes; returns the number of events seen.
async fn drain_clean_close<F: Feed>(subscription: Subscription<F>) -> usize {
    let (mut data, mut errors, handle) = subscription.into_parts();

    let mut delivered = 0;
    while data.recv().await.is_some() {
        delivered += 1;
    }
    assert!(errors.recv().await.is_none(), "{} emitted an error", F::KIND);

    handle.join().await;
    assert_eq!(handle.state(), HandleState::Closed, "{}", F::KIND);
    assert!(matches!(data.try_recv(), Err(TryRecvError::Disconnected)));
    assert!(matches!(errors.try_recv(), Err(TryRecvError::Disconnected)));
    delivered
}

#[tokio::test]
async fn every_feed_closes_both_queues_when_cancelled_before_data() {
    let (senders, sources): (Vec<_>, Vec<_>) = (0..5).map(|_| channel_source()).unzip();
    let transport = ScriptedTransport::new(sources);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());

    let scope = CancellationScope::new();
    let ticks = subscriber.subscribe_ticks(["EURUSD"], &scope).await.unwrap();
    assert_cancel_is_terminal(ticks, &scope).await;

    let scope = CancellationScope::new();
    let profits = subscriber.subscribe_position_profits(&scope).await.unwrap();
    assert_cancel_is_terminal(profits, &scope).await;

    let scope = CancellationScope::new();
    let tickets = subscriber.subscribe_opened_tickets(&scope).await.unwrap();
    assert_cancel_is_terminal(tickets, &scope).await;

    let scope = CancellationScope::new();
    let trades = subscriber.subscribe_trade_events(&scope).await.unwrap();
    assert_cancel_is_terminal(trades, &scope).await;

    let scope = CancellationScope::new();
    let transactions = subscriber.subscribe_transactions(&scope).await.unwrap();
    assert_cancel_is_terminal(transactions, &scope).await;

    assert_eq!(transport.opened(), 5);
    drop(senders);
}

#[tokio::test]
async fn every_feed_delivers_then_closes_cleanly() {
    let (senders, sources): (Vec<_>, Vec<_>) = (0..5).map(|_| channel_source()).unzip();
    let messages = [
        tick("EURUSD", 1.1, 1.2, T0),
        profit_batch(&[(100, 5.0)], &[], &[]),
        ticket_snapshot(&[100], &[200]),
        trade_batch(&[300], &[], &[]),
        deal_transaction(400, 100),
    ];
    for (tx, message) in senders.into_iter().zip(messages) {
        tx.send(Ok(message)).await.unwrap();
    }

    let transport = ScriptedTransport::new(sources);
    let subscriber = subscriber(&transport, SubscriptionSettings::default());
    let scope = CancellationScope::new();

    let ticks = subscriber.subscribe_ticks(["EURUSD"], &scope).await.unwrap();
    assert_eq!(drain_clean_close(ticks).await, 1);

    let profits = subscriber.subscribe_position_profits(&scope).await.unwrap();
    assert_eq!(drain_clean_close(profits).await, 1);

    let tickets = subscriber.subscribe_opened_tickets(&scope).await.unwrap();
    assert_eq!(drain_clean_close(tickets).await, 1);

    let trades = subscriber.subscribe_trade_events(&scope).await.unwrap();
    assert_eq!(drain_clean_close(trades).await, 1);

    let transactions = subscriber.subscribe_transactions(&scope).await.unwrap();
    assert_eq!(drain_clean_close(transactions).await, 1);
}
