//! Gateway Transport Port (Driven Port)
//!
//! Interface for opening one server-streaming call per subscription.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::application::services::CancellationScope;
use crate::domain::error::{StreamError, StreamErrorKind};
use crate::domain::subscription::SubscriptionDescriptor;
use crate::infrastructure::gateway::proto::WireMessage;

/// Transport failure while opening or reading a stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The gateway could not be reached.
    #[error("gateway unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// The gateway enforced the call deadline.
    #[error("deadline exceeded at gateway: {message}")]
    DeadlineExceeded {
        /// Error details.
        message: String,
    },

    /// The stream was aborted mid-flight.
    #[error("stream aborted: {message}")]
    Aborted {
        /// Error details.
        message: String,
    },

    /// The gateway cancelled the call.
    #[error("stream cancelled by gateway: {message}")]
    ServerCancelled {
        /// Error details.
        message: String,
    },

    /// The gateway violated the wire protocol.
    #[error("protocol violation: {message}")]
    Protocol {
        /// Error details.
        message: String,
    },

    /// Any other transport failure.
    #[error("transport error: {message}")]
    Other {
        /// Error details.
        message: String,
    },
}

impl TransportError {
    /// Check if a fresh subscription may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. }
                | Self::DeadlineExceeded { .. }
                | Self::Aborted { .. }
                | Self::ServerCancelled { .. }
        )
    }

    /// Convert into the value delivered on an error queue.
    ///
    /// A gateway-enforced deadline is reported the same way as a local one.
    #[must_use]
    pub fn to_stream_error(&self) -> StreamError {
        match self {
            Self::DeadlineExceeded { .. } => {
                StreamError::new(StreamErrorKind::DeadlineExceeded, self.to_string(), true)
            }
            _ => StreamError::transport(self.to_string(), self.is_retryable()),
        }
    }
}

/// Item yielded by a raw message source.
pub type WireItem = Result<WireMessage, TransportError>;

/// A lazy, possibly infinite sequence of wire messages for one call.
///
/// The sequence ends (`None`) on a clean server close and yields an `Err`
/// item when the transport fails. An optional teardown future releases the
/// underlying call and runs at most once, from [`RawMessageSource::close`].
pub struct RawMessageSource {
    stream: Option<BoxStream<'static, WireItem>>,
    teardown: Option<BoxFuture<'static, ()>>,
}

impl RawMessageSource {
    /// Wrap a stream of wire items.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = WireItem> + Send + 'static,
    {
        Self {
            stream: Some(stream.boxed()),
            teardown: None,
        }
    }

    /// Wrap the receiving end of a channel fed by an in-process transport.
    #[must_use]
    pub fn from_receiver(receiver: mpsc::Receiver<WireItem>) -> Self {
        Self::new(ReceiverStream::new(receiver))
    }

    /// Attach a teardown future run on [`close`](Self::close).
    #[must_use]
    pub fn with_teardown<F>(mut self, teardown: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.teardown = Some(teardown.boxed());
        self
    }

    /// Receive the next item, or `None` once the stream ended or was closed.
    pub async fn next(&mut self) -> Option<WireItem> {
        match self.stream.as_mut() {
            Some(stream) => stream.next().await,
            None => None,
        }
    }

    /// Check if [`close`](Self::close) has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Release the call, waiting at most `grace` for the teardown.
    ///
    /// Idempotent. Returns `false` if the teardown was abandoned after the
    /// grace period.
    pub async fn close(&mut self, grace: Duration) -> bool {
        self.stream = None;
        match self.teardown.take() {
            Some(teardown) => tokio::time::timeout(grace, teardown).await.is_ok(),
            None => true,
        }
    }
}

impl Stream for RawMessageSource {
    type Item = WireItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.stream.as_mut() {
            Some(stream) => stream.poll_next_unpin(cx),
            None => Poll::Ready(None),
        }
    }
}

impl fmt::Debug for RawMessageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawMessageSource")
            .field("closed", &self.is_closed())
            .field("has_teardown", &self.teardown.is_some())
            .finish()
    }
}

/// Port for opening server-streaming calls against the gateway.
///
/// Implementations share one underlying connection; each call to
/// [`open_stream`](Self::open_stream) opens an independent call over it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Open the streaming call described by `descriptor`.
    ///
    /// The scope is provided so adapters can bind the call's lifetime to it;
    /// the subscription handle enforces cancellation regardless.
    async fn open_stream(
        &self,
        descriptor: &SubscriptionDescriptor,
        scope: &CancellationScope,
    ) -> Result<RawMessageSource, TransportError>;
}
