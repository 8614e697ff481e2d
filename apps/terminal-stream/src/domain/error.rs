//! Terminal stream errors.
//!
//! A [`StreamError`] is the single item a subscription's error queue may
//! carry. It is a value, not a `Result` error: consumers read it, decide
//! whether to resubscribe, and never see a second one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a terminal subscription failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamErrorKind {
    /// The transport dropped or aborted the stream.
    TransportClosed,
    /// The message envelope could not be interpreted.
    DecodeFailure,
    /// The subscription's deadline expired.
    DeadlineExceeded,
    /// The subscription was stopped by its caller.
    Cancelled,
}

impl StreamErrorKind {
    /// Stable name used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransportClosed => "transport_closed",
            Self::DecodeFailure => "decode_failure",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Terminal failure delivered on a subscription's error queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamError {
    kind: StreamErrorKind,
    message: String,
    retryable: bool,
}

impl StreamError {
    /// Create a new stream error.
    #[must_use]
    pub fn new(kind: StreamErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    /// Transport failure.
    #[must_use]
    pub fn transport(message: impl Into<String>, retryable: bool) -> Self {
        Self::new(StreamErrorKind::TransportClosed, message, retryable)
    }

    /// Envelope that could not be decoded.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::DecodeFailure, message, false)
    }

    /// Caller-initiated stop.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(StreamErrorKind::Cancelled, "subscription cancelled", false)
    }

    /// Deadline expiry. Retryable with a fresh scope.
    #[must_use]
    pub fn deadline_exceeded() -> Self {
        Self::new(
            StreamErrorKind::DeadlineExceeded,
            "subscription deadline exceeded",
            true,
        )
    }

    /// Error category.
    #[must_use]
    pub const fn kind(&self) -> StreamErrorKind {
        self.kind
    }

    /// Human-readable detail.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether a new subscription may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for StreamError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind() {
        let err = StreamError::transport("connection reset", true);
        assert_eq!(err.to_string(), "transport_closed: connection reset");
        assert!(err.is_retryable());
    }

    #[test]
    fn cancellation_is_not_retryable() {
        assert!(!StreamError::cancelled().is_retryable());
        assert!(StreamError::deadline_exceeded().is_retryable());
        assert_eq!(
            StreamError::deadline_exceeded().kind(),
            StreamErrorKind::DeadlineExceeded
        );
    }
}
