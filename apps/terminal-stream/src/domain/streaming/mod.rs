//! Streaming Event Types
//!
//! Core domain types for the gateway's server-pushed feeds: ticks, position
//! profit deltas, opened-ticket snapshots, trade event batches and trade
//! transactions. These types are wire-agnostic and represent the canonical
//! internal representation delivered on a subscription's data queue.
//!
//! # Feed Shapes
//!
//! | Feed | Event | Shape |
//! |------|-------|-------|
//! | Tick | [`TickRecord`] | flat sequence |
//! | Position profit | [`ProfitDeltaBatch`] | delta (new / updated / deleted) |
//! | Opened tickets | [`TicketSetSnapshot`] | full replacement snapshot |
//! | Trade events | [`TradeEventBatch`] | delta (new / disappeared / state-changed) |
//! | Transactions | [`TransactionEvent`] | flat, strictly ordered |

mod orders;
mod positions;
mod tick;
mod transactions;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use orders::{OrderInfo, OrderState, OrderStateChange, OrderType, TradeEventBatch};
pub use positions::{AccountSnapshot, PositionProfit, ProfitDeltaBatch, TicketSetSnapshot};
pub use tick::{TickFlags, TickRecord};
pub use transactions::{TransactionEvent, TransactionKind};

// =============================================================================
// Ticket
// =============================================================================

/// Stable 64-bit identity of an order or position.
///
/// Tickets are the join key across delta batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(i64);

impl Ticket {
    /// Create a ticket from its raw value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw ticket value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for Ticket {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Feed Event
// =============================================================================

/// One decoded domain event, tagged by the feed it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "feed", content = "event", rename_all = "snake_case")]
pub enum FeedEvent {
    /// Market tick.
    Tick(TickRecord),
    /// Position profit delta batch.
    PositionProfit(ProfitDeltaBatch),
    /// Opened ticket snapshot.
    OpenedTickets(TicketSetSnapshot),
    /// Trade event batch.
    Trade(TradeEventBatch),
    /// Trade transaction.
    Transaction(TransactionEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_display_and_value() {
        let ticket = Ticket::new(100);
        assert_eq!(ticket.value(), 100);
        assert_eq!(ticket.to_string(), "#100");
        assert_eq!(Ticket::from(100), ticket);
    }

    #[test]
    fn ticket_serializes_transparently() {
        let json = serde_json::to_string(&Ticket::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
