//! Subscription Descriptors
//!
//! Domain types describing what a subscription consumes: the feed kind, the
//! feed's target parameters and the depth of its data queue.
//!
//! # Design
//!
//! A [`SubscriptionDescriptor`] is immutable once built. Every
//! `SubscriptionHandle` is created from exactly one descriptor and never
//! changes it; a different symbol list or interval means a new handle.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Default number of pending events a data queue holds before the pump blocks.
pub const DEFAULT_BUFFER_DEPTH: usize = 1000;

/// Default timer period for the position profit and opened-ticket feeds.
pub const DEFAULT_FEED_INTERVAL: Duration = Duration::from_millis(1000);

// =============================================================================
// Feed Kind
// =============================================================================

/// Category of server-pushed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Price ticks for a symbol list.
    Tick,
    /// Position profit deltas.
    PositionProfit,
    /// Opened position and pending order tickets.
    OpenedTicketSet,
    /// Trade lifecycle batches.
    TradeEvent,
    /// Fine-grained trade transactions.
    Transaction,
}

impl FeedKind {
    /// Get all feed kinds.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Tick,
            Self::PositionProfit,
            Self::OpenedTicketSet,
            Self::TradeEvent,
            Self::Transaction,
        ]
    }

    /// Stable name used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tick => "tick",
            Self::PositionProfit => "position_profit",
            Self::OpenedTicketSet => "opened_tickets",
            Self::TradeEvent => "trade_event",
            Self::Transaction => "transaction",
        }
    }

    /// Check if the feed delivers new/updated/deleted change-sets.
    #[must_use]
    pub const fn is_delta(self) -> bool {
        matches!(self, Self::PositionProfit | Self::TradeEvent)
    }

    /// Check if every message fully replaces the previous one.
    #[must_use]
    pub const fn is_snapshot(self) -> bool {
        matches!(self, Self::OpenedTicketSet)
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Feed Parameters
// =============================================================================

/// Target parameters of a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedParams {
    /// Symbols for the tick feed (ignored by other feeds).
    pub symbols: Vec<String>,
    /// Server-side timer period for the profit and ticket feeds.
    pub interval: Duration,
    /// Ask the gateway to skip batches without changes.
    pub ignore_empty: bool,
}

impl Default for FeedParams {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            interval: DEFAULT_FEED_INTERVAL,
            ignore_empty: true,
        }
    }
}

// =============================================================================
// Subscription Descriptor
// =============================================================================

/// Errors raised while building a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// Tick subscriptions need at least one symbol.
    #[error("tick subscription requires at least one symbol")]
    NoSymbols,

    /// A symbol name was blank.
    #[error("symbol name cannot be empty")]
    EmptySymbol,

    /// The timer period was zero.
    #[error("feed interval must be greater than zero")]
    ZeroInterval,
}

/// Immutable description of one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionDescriptor {
    kind: FeedKind,
    params: FeedParams,
    buffer_depth: usize,
}

impl SubscriptionDescriptor {
    /// Describe a tick subscription for the given symbols.
    ///
    /// Duplicate symbols are collapsed, keeping first-seen order.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or contains a blank name.
    pub fn ticks<I, S>(symbols: I) -> Result<Self, DescriptorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for symbol in symbols {
            let symbol = symbol.into().trim().to_string();
            if symbol.is_empty() {
                return Err(DescriptorError::EmptySymbol);
            }
            if !unique.contains(&symbol) {
                unique.push(symbol);
            }
        }

        if unique.is_empty() {
            return Err(DescriptorError::NoSymbols);
        }

        Ok(Self::with_params(
            FeedKind::Tick,
            FeedParams {
                symbols: unique,
                ..FeedParams::default()
            },
        ))
    }

    /// Describe a position profit subscription.
    #[must_use]
    pub fn position_profits() -> Self {
        Self::with_params(FeedKind::PositionProfit, FeedParams::default())
    }

    /// Describe an opened-ticket snapshot subscription.
    #[must_use]
    pub fn opened_tickets() -> Self {
        Self::with_params(FeedKind::OpenedTicketSet, FeedParams::default())
    }

    /// Describe a trade event subscription.
    #[must_use]
    pub fn trade_events() -> Self {
        Self::with_params(FeedKind::TradeEvent, FeedParams::default())
    }

    /// Describe a trade transaction subscription.
    #[must_use]
    pub fn transactions() -> Self {
        Self::with_params(FeedKind::Transaction, FeedParams::default())
    }

    fn with_params(kind: FeedKind, params: FeedParams) -> Self {
        Self {
            kind,
            params,
            buffer_depth: DEFAULT_BUFFER_DEPTH,
        }
    }

    /// Set the data queue depth (clamped to at least one).
    #[must_use]
    pub fn with_buffer_depth(mut self, depth: usize) -> Self {
        self.buffer_depth = depth.max(1);
        self
    }

    /// Set the server-side timer period.
    ///
    /// # Errors
    ///
    /// Returns an error if the interval is zero.
    pub fn with_interval(mut self, interval: Duration) -> Result<Self, DescriptorError> {
        if interval.is_zero() {
            return Err(DescriptorError::ZeroInterval);
        }
        self.params.interval = interval;
        Ok(self)
    }

    /// Choose whether the gateway may skip empty batches.
    #[must_use]
    pub const fn with_ignore_empty(mut self, ignore_empty: bool) -> Self {
        self.params.ignore_empty = ignore_empty;
        self
    }

    /// Feed kind.
    #[must_use]
    pub const fn kind(&self) -> FeedKind {
        self.kind
    }

    /// Feed parameters.
    #[must_use]
    pub const fn params(&self) -> &FeedParams {
        &self.params
    }

    /// Data queue depth.
    #[must_use]
    pub const fn buffer_depth(&self) -> usize {
        self.buffer_depth
    }
}

// =============================================================================
// Tests
// =============================================================================
