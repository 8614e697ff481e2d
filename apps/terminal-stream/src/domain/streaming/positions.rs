//! Position profit deltas and opened-ticket snapshots.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Ticket;

/// Floating profit of one open position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionProfit {
    /// Position ticket.
    pub ticket: Ticket,
    /// Position symbol.
    pub symbol: String,
    /// Current floating profit in account currency.
    pub profit: Decimal,
}

/// Account figures attached to some delta batches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Account login.
    pub login: i64,
    /// Balance.
    pub balance: Decimal,
    /// Equity.
    pub equity: Decimal,
    /// Used margin.
    pub margin: Decimal,
    /// Free margin.
    pub free_margin: Decimal,
    /// Total floating profit.
    pub profit: Decimal,
}

/// Incremental change-set of position profits.
///
/// Entries in `deleted` are authoritative removals; `new` and `updated` are
/// authoritative upserts. Groups are passed through exactly as the gateway
/// declared them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfitDeltaBatch {
    /// Positions opened since the previous batch.
    pub new: Vec<PositionProfit>,
    /// Positions whose profit changed.
    pub updated: Vec<PositionProfit>,
    /// Positions closed since the previous batch.
    pub deleted: Vec<PositionProfit>,
    /// Account figures, when the gateway sends them.
    pub account: Option<AccountSnapshot>,
}

impl ProfitDeltaBatch {
    /// Check if the batch carries no position changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Full snapshot of currently opened tickets.
///
/// Each snapshot replaces the previous one entirely; never merge across
/// snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TicketSetSnapshot {
    /// Open position tickets.
    pub positions: BTreeSet<Ticket>,
    /// Pending order tickets.
    pub pending_orders: BTreeSet<Ticket>,
}

impl TicketSetSnapshot {
    /// Total number of tickets in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len() + self.pending_orders.len()
    }

    /// Check if the snapshot holds no tickets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.pending_orders.is_empty()
    }
}
