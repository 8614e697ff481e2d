//! Subscription Handle
//!
//! Owns one server-streaming call from open to teardown and pumps its
//! messages through the decoder into a dual queue.
//!
//! # State Machine
//!
//! ```text
//! Idle --open ok--> Active --cancel--> Draining --> Closed
//!   |                 |--gateway close / consumer gone----> Closed
//!   |                 '--transport error / fatal decode---> Failed
//!   '--open error--> Failed
//! ```
//!
//! A handle runs at most once. Resubscribing after it ended requires a new
//! handle.
//!
//! # Terminal Events
//!
//! The pump ends on the first terminal event. When cancellation fires it
//! polls the transport once without waiting: a transport error that is
//! already available is reported instead of the cancellation, and a stream
//! that already ended closes without an error.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::cancellation::{CancelCause, CancellationScope, DEFAULT_GRACE_PERIOD};
use super::dispatcher::{
    DataReceiver, DataSender, ErrorReceiver, ErrorSender, data_queue, error_queue,
};
use super::feeds::Feed;
use crate::application::ports::{GatewayTransport, RawMessageSource, TransportError};
use crate::domain::error::StreamError;
use crate::domain::subscription::{DescriptorError, FeedKind, SubscriptionDescriptor};
use crate::infrastructure::metrics;

// =============================================================================
// State
// =============================================================================

/// Lifecycle state of a subscription handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleState {
    /// Created, not yet subscribed.
    Idle,
    /// Stream open, pump running.
    Active,
    /// Cancellation observed, tearing down.
    Draining,
    /// Ended without failure.
    Closed,
    /// Ended by a transport or envelope failure.
    Failed,
}

impl HandleState {
    /// Check if the handle can never deliver again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Draining => "draining",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned when starting a subscription.
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    /// The handle was already subscribed once.
    #[error("subscription already started (state: {0})")]
    AlreadyStarted(HandleState),

    /// The descriptor belongs to another feed.
    #[error("descriptor is for {found} feed, handle expects {expected}")]
    KindMismatch {
        /// Feed the handle is typed for.
        expected: FeedKind,
        /// Feed named by the descriptor.
        found: FeedKind,
    },

    /// The descriptor could not be built.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// The transport failed to open the call.
    #[error("failed to open stream: {0}")]
    Open(#[from] TransportError),
}

// =============================================================================
// Handle
// =============================================================================

/// Live, cancellable instance of one feed subscription.
pub struct SubscriptionHandle<F: Feed> {
    id: Uuid,
    descriptor: SubscriptionDescriptor,
    transport: Arc<dyn GatewayTransport>,
    scope: CancellationScope,
    grace: Duration,
    started: AtomicBool,
    state: Arc<RwLock<HandleState>>,
    task: Mutex<Option<JoinHandle<()>>>,
    _feed: PhantomData<fn() -> F>,
}

impl<F: Feed> SubscriptionHandle<F> {
    /// Create an idle handle bound to a child of `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is for a different feed than `F`.
    pub fn new(
        transport: Arc<dyn GatewayTransport>,
        descriptor: SubscriptionDescriptor,
        scope: &CancellationScope,
    ) -> Result<Self, SubscribeError> {
        if descriptor.kind() != F::KIND {
            return Err(SubscribeError::KindMismatch {
                expected: F::KIND,
                found: descriptor.kind(),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            descriptor,
            transport,
            scope: scope.child(),
            grace: DEFAULT_GRACE_PERIOD,
            started: AtomicBool::new(false),
            state: Arc::new(RwLock::new(HandleState::Idle)),
            task: Mutex::new(None),
            _feed: PhantomData,
        })
    }

    /// Set how long a transport teardown may take after the pump stops.
    #[must_use]
    pub const fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Open the stream and start the pump.
    ///
    /// If the scope ends while the stream is being opened, the returned
    /// queues are already closed and the error queue holds the cancellation.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle was already subscribed or the
    /// transport fails to open the call; the handle is then `Failed`.
    pub async fn subscribe(
        &self,
    ) -> Result<(DataReceiver<F::Event>, ErrorReceiver), SubscribeError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(SubscribeError::AlreadyStarted(self.state()));
        }

        let kind = F::KIND;
        let (data_tx, data_rx) = data_queue(self.descriptor.buffer_depth());
        let (error_tx, error_rx) = error_queue();

        let opened = match self.scope.cause() {
            Some(cause) => Err(cause),
            None => tokio::select! {
                biased;
                cause = self.scope.cancelled() => Err(cause),
                result = self.transport.open_stream(&self.descriptor, &self.scope) => Ok(result),
            },
        };

        let source = match opened {
            Ok(Ok(source)) => source,
            Ok(Err(err)) => {
                tracing::warn!(
                    subscription_id = %self.id,
                    feed = %kind,
                    error = %err,
                    "Failed to open stream"
                );
                metrics::record_stream_failure(kind, err.to_stream_error().kind());
                self.set_state(HandleState::Failed);
                return Err(SubscribeError::Open(err));
            }
            Err(cause) => {
                tracing::info!(
                    subscription_id = %self.id,
                    feed = %kind,
                    ?cause,
                    "Subscription cancelled before stream opened"
                );
                self.set_state(HandleState::Closed);
                error_tx.send(cancel_error(cause));
                drop(data_tx);
                return Ok((data_rx, error_rx));
            }
        };

        self.set_state(HandleState::Active);
        metrics::subscription_started(kind);
        tracing::info!(
            subscription_id = %self.id,
            feed = %kind,
            buffer_depth = self.descriptor.buffer_depth(),
            "Subscription active"
        );

        let pump = Pump::<F> {
            id: self.id,
            source,
            data_tx,
            error_tx,
            scope: self.scope.clone(),
            grace: self.grace,
            state: Arc::clone(&self.state),
        };
        *self.task.lock() = Some(tokio::spawn(pump.run()));

        Ok((data_rx, error_rx))
    }

    /// Request cancellation. Idempotent; does not wait for the pump.
    pub fn stop(&self) {
        if !self.scope.is_cancelled() {
            tracing::debug!(subscription_id = %self.id, feed = %F::KIND, "Stopping subscription");
        }
        self.scope.cancel();
    }

    /// Wait for the pump to finish. Returns immediately if it never started
    /// or was already joined.
    pub async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(err) = task.await
        {
            tracing::error!(subscription_id = %self.id, error = %err, "Subscription pump panicked");
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> HandleState {
        *self.state.read()
    }

    /// Unique subscription id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Descriptor the handle was created from.
    #[must_use]
    pub const fn descriptor(&self) -> &SubscriptionDescriptor {
        &self.descriptor
    }

    /// The handle's own scope, a child of the caller's.
    #[must_use]
    pub const fn scope(&self) -> &CancellationScope {
        &self.scope
    }

    fn set_state(&self, state: HandleState) {
        *self.state.write() = state;
    }
}

impl<F: Feed> fmt::Debug for SubscriptionHandle<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("feed", &F::KIND)
            .field("state", &self.state())
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}

fn cancel_error(cause: CancelCause) -> StreamError {
    match cause {
        CancelCause::Stopped => StreamError::cancelled(),
        CancelCause::DeadlineExceeded => StreamError::deadline_exceeded(),
    }
}

// =============================================================================
// Pump
// =============================================================================

enum Exit {
    /// The gateway closed the stream.
    Completed,
    /// The consumer dropped its data receiver.
    ConsumerGone,
    /// The scope ended first.
    Cancelled(CancelCause),
    /// Transport error or fatal decode error.
    Failed(StreamError),
}

struct Pump<F: Feed> {
    id: Uuid,
    source: RawMessageSource,
    data_tx: DataSender<F::Event>,
    error_tx: ErrorSender,
    scope: CancellationScope,
    grace: Duration,
    state: Arc<RwLock<HandleState>>,
}

impl<F: Feed> Pump<F> {
    async fn run(mut self) {
        let exit = self.pump().await;
        let Self {
            id,
            mut source,
            data_tx,
            error_tx,
            grace,
            state,
            ..
        } = self;
        let kind = F::KIND;

        let (final_state, error) = match exit {
            Exit::Completed => {
                tracing::info!(subscription_id = %id, feed = %kind, "Stream closed by gateway");
                (HandleState::Closed, None)
            }
            Exit::ConsumerGone => {
                tracing::debug!(subscription_id = %id, feed = %kind, "Consumer dropped data queue");
                (HandleState::Closed, None)
            }
            Exit::Cancelled(cause) => {
                *state.write() = HandleState::Draining;
                tracing::info!(subscription_id = %id, feed = %kind, ?cause, "Subscription cancelled");
                (HandleState::Closed, Some(cancel_error(cause)))
            }
            Exit::Failed(error) => {
                tracing::warn!(subscription_id = %id, feed = %kind, error = %error, "Subscription failed");
                metrics::record_stream_failure(kind, error.kind());
                (HandleState::Failed, Some(error))
            }
        };

        if !source.close(grace).await {
            tracing::warn!(
                subscription_id = %id,
                feed = %kind,
                grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                "Transport teardown exceeded grace period, abandoning it"
            );
        }

        *state.write() = final_state;
        if let Some(error) = error {
            error_tx.send(error);
        } else {
            drop(error_tx);
        }
        drop(data_tx);
        metrics::subscription_finished(kind);
    }

    async fn pump(&mut self) -> Exit {
        let kind = F::KIND;

        loop {
            let item = tokio::select! {
                biased;
                cause = self.scope.cancelled() => return self.on_cancel(cause),
                () = self.data_tx.closed() => return Exit::ConsumerGone,
                item = self.source.next() => item,
            };

            let message = match item {
                None => return Exit::Completed,
                Some(Err(err)) => return Exit::Failed(err.to_stream_error()),
                Some(Ok(message)) => message,
            };
            metrics::record_message_received(kind);

            let event = match F::decode(&message) {
                Ok(event) => event,
                Err(err) if err.is_fatal() => {
                    return Exit::Failed(StreamError::decode(err.to_string()));
                }
                Err(err) => {
                    tracing::warn!(
                        subscription_id = %self.id,
                        feed = %kind,
                        reason = err.reason(),
                        error = %err,
                        "Skipping malformed message"
                    );
                    metrics::record_decode_error(kind, err.reason());
                    continue;
                }
            };

            tokio::select! {
                biased;
                cause = self.scope.cancelled() => return self.on_cancel(cause),
                sent = self.data_tx.send(event) => {
                    if sent.is_err() {
                        return Exit::ConsumerGone;
                    }
                }
            }
            metrics::record_event_delivered(kind);
        }
    }

    /// First terminal event wins: an error, fatal envelope or close already
    /// sitting in the transport takes precedence over the cancellation that
    /// woke us.
    fn on_cancel(&mut self, cause: CancelCause) -> Exit {
        match self.source.next().now_or_never() {
            Some(Some(Err(err))) => Exit::Failed(err.to_stream_error()),
            Some(Some(Ok(message))) => match F::decode(&message) {
                Err(err) if err.is_fatal() => Exit::Failed(StreamError::decode(err.to_string())),
                _ => Exit::Cancelled(cause),
            },
            Some(None) => Exit::Completed,
            None => Exit::Cancelled(cause),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
