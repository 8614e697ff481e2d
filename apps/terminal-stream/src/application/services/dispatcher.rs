//! Dual-Queue Dispatcher
//!
//! Every subscription owns one bounded data queue and one error queue.
//!
//! - The data queue preserves arrival order and applies backpressure: a send
//!   waits while the queue is full and never drops an event.
//! - The error queue holds at most one [`StreamError`]. Its sender is
//!   consumed by the single send, which also closes the queue.
//!
//! Both receivers are exhaustible: once closed they return `None` forever.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

pub use tokio::sync::mpsc::error::TryRecvError;

use crate::domain::error::StreamError;

/// Create a data queue holding up to `depth` pending events (at least one).
#[must_use]
pub fn data_queue<T>(depth: usize) -> (DataSender<T>, DataReceiver<T>) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    (DataSender { inner: tx }, DataReceiver { inner: rx })
}

/// Create a single-item error queue.
#[must_use]
pub fn error_queue() -> (ErrorSender, ErrorReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (ErrorSender { inner: tx }, ErrorReceiver { inner: rx })
}

// =============================================================================
// Data Queue
// =============================================================================

/// Producer side of a data queue, held by the pump.
#[derive(Debug)]
pub struct DataSender<T> {
    inner: mpsc::Sender<T>,
}

impl<T> DataSender<T> {
    /// Send one event, waiting for room.
    ///
    /// # Errors
    ///
    /// Returns the event back if the consumer dropped its receiver.
    pub async fn send(&self, event: T) -> Result<(), T> {
        self.inner.send(event).await.map_err(|e| e.0)
    }

    /// Wait until the consumer drops its receiver.
    pub async fn closed(&self) {
        self.inner.closed().await;
    }

    /// Check if the consumer dropped its receiver.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Free slots in the queue.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

/// Consumer side of a data queue.
#[derive(Debug)]
pub struct DataReceiver<T> {
    inner: mpsc::Receiver<T>,
}

impl<T> DataReceiver<T> {
    /// Receive the next event, or `None` once the queue is closed and empty.
    pub async fn recv(&mut self) -> Option<T> {
        self.inner.recv().await
    }

    /// Receive without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Empty`] if nothing is buffered yet and
    /// [`TryRecvError::Disconnected`] once the queue is closed and drained.
    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        self.inner.try_recv()
    }

    /// Number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if no events are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Check if the producer side is gone.
    ///
    /// Buffered events may still be received after this returns `true`.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl<T> Stream for DataReceiver<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.inner.poll_recv(cx)
    }
}

// =============================================================================
// Error Queue
// =============================================================================

/// Producer side of an error queue. Usable once.
#[derive(Debug)]
pub struct ErrorSender {
    inner: mpsc::Sender<StreamError>,
}

impl ErrorSender {
    /// Deliver the terminal error and close the queue.
    ///
    /// Returns `false` if the consumer already dropped its receiver.
    pub fn send(self, error: StreamError) -> bool {
        self.inner.try_send(error).is_ok()
    }
}

/// Consumer side of an error queue.
#[derive(Debug)]
pub struct ErrorReceiver {
    inner: mpsc::Receiver<StreamError>,
}

impl ErrorReceiver {
    /// Wait for the terminal error, or `None` if the subscription ended
    /// without one.
    pub async fn recv(&mut self) -> Option<StreamError> {
        self.inner.recv().await
    }

    /// Check for the terminal error without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Empty`] while the subscription is running and
    /// [`TryRecvError::Disconnected`] once it ended without (or after) an
    /// error.
    pub fn try_recv(&mut self) -> Result<StreamError, TryRecvError> {
        self.inner.try_recv()
    }
}

impl Stream for ErrorReceiver {
    type Item = StreamError;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamError>> {
        self.inner.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;

    #[tokio::test]
    async fn data_queue_is_fifo_and_drains_after_close() {
        let (tx, mut rx) = data_queue(4);
        for i in 0..3 {
            tx.send(i).await.unwrap();
        }
        drop(tx);

        assert_eq!(rx.len(), 3);
        let items: Vec<i32> = (&mut rx).collect().await;
        assert_eq!(items, vec![0, 1, 2]);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn full_queue_blocks_sender() {
        let (tx, mut rx) = data_queue(1);
        tx.send(1).await.unwrap();

        let mut blocked = task::spawn(tx.send(2));
        assert_pending!(blocked.poll());

        assert_eq!(rx.recv().await, Some(1));
        assert!(blocked.is_woken());
        assert_ready!(blocked.poll()).unwrap();
    }

    #[tokio::test]
    async fn zero_depth_is_clamped() {
        let (tx, _rx) = data_queue::<u8>(0);
        assert_eq!(tx.capacity(), 1);
    }

    #[tokio::test]
    async fn send_fails_when_consumer_gone() {
        let (tx, rx) = data_queue(2);
        drop(rx);
        assert!(tx.is_closed());
        assert_eq!(tx.send(7).await, Err(7));
    }

    #[tokio::test]
    async fn error_queue_carries_one_item_then_closes() {
        let (tx, mut rx) = error_queue();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        assert!(tx.send(StreamError::cancelled()));
        assert_eq!(rx.recv().await, Some(StreamError::cancelled()));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropped_error_sender_closes_empty() {
        let (tx, mut rx) = error_queue();
        drop(tx);
        assert!(rx.recv().await.is_none());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }
}
