//! Cancellation Scopes
//!
//! A [`CancellationScope`] bounds how long a subscription may run. It fires
//! on an explicit [`cancel`](CancellationScope::cancel) or when its deadline
//! passes, whichever comes first. Scopes form a tree: cancelling a parent
//! cancels every child, and a child never outlives its parent's deadline.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default time allowed for a transport teardown after cancellation.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Why a scope ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelCause {
    /// `cancel()` was called on the scope or an ancestor.
    Stopped,
    /// The deadline passed.
    DeadlineExceeded,
}

/// Caller-supplied lifetime boundary for one or more subscriptions.
///
/// Cheap to clone; clones share the same cancellation state.
#[derive(Debug, Clone, Default)]
pub struct CancellationScope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancellationScope {
    /// Create a scope that only ends on `cancel()`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope that ends after `timeout`.
    #[must_use]
    pub fn with_deadline(timeout: Duration) -> Self {
        Self::with_deadline_at(Instant::now() + timeout)
    }

    /// Create a scope that ends at `deadline`.
    #[must_use]
    pub fn with_deadline_at(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Derive a child scope that inherits this scope's cancellation and
    /// deadline but can be cancelled on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derive a child scope with an additional timeout.
    ///
    /// The child's deadline is the earlier of the parent's and `timeout`.
    #[must_use]
    pub fn child_with_deadline(&self, timeout: Duration) -> Self {
        let requested = Instant::now() + timeout;
        Self {
            token: self.token.child_token(),
            deadline: Some(self.deadline.map_or(requested, |d| d.min(requested))),
        }
    }

    /// Cancel the scope and all of its children. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if the scope has ended for any reason.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cause().is_some()
    }

    /// Why the scope ended, or `None` while it is still live.
    #[must_use]
    pub fn cause(&self) -> Option<CancelCause> {
        if self.token.is_cancelled() {
            Some(CancelCause::Stopped)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(CancelCause::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Underlying token, for adapters that bind their own work to the scope.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Wait until the scope ends.
    ///
    /// Cancel-safe. An explicit cancel observed at the same instant as the
    /// deadline reports [`CancelCause::Stopped`].
    pub async fn cancelled(&self) -> CancelCause {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => CancelCause::Stopped,
                    () = tokio::time::sleep_until(deadline) => CancelCause::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                CancelCause::Stopped
            }
        }
    }
}
