//! Delta Reconciliation
//!
//! The core never caches feed state. This module pins down the rules a
//! consumer applies to rebuild it, and ships reference consumers that follow
//! them:
//!
//! - [`PositionBook`] for [`ProfitDeltaBatch`]: `new` and `updated` upsert,
//!   `deleted` removes.
//! - [`OrderBook`] for [`TradeEventBatch`]: `new_orders` and
//!   `state_changed_orders` upsert, `disappeared_orders` removes.
//! - [`TicketSetView`] for [`TicketSetSnapshot`]: every snapshot replaces the
//!   view wholesale.
//!
//! Batches are applied in receipt order. The wire does not order groups
//! within one batch, so upserts are applied before removals: a ticket named
//! in a removal group is absent after the batch, whatever other groups say.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::domain::streaming::{
    AccountSnapshot, OrderInfo, PositionProfit, ProfitDeltaBatch, Ticket, TicketSetSnapshot,
    TradeEventBatch,
};

/// A consumer-side reconstruction fed by one event type.
pub trait Reconcile<E> {
    /// Apply one event, in receipt order.
    fn apply(&mut self, event: &E);
}

// =============================================================================
// Position Book
// =============================================================================

/// Open positions rebuilt from position profit deltas.
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    positions: BTreeMap<Ticket, PositionProfit>,
    account: Option<AccountSnapshot>,
}

impl PositionBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if no positions are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Look up one position.
    #[must_use]
    pub fn get(&self, ticket: Ticket) -> Option<&PositionProfit> {
        self.positions.get(&ticket)
    }

    /// Open tickets in ascending order.
    pub fn tickets(&self) -> impl Iterator<Item = Ticket> + '_ {
        self.positions.keys().copied()
    }

    /// Sum of floating profit across open positions.
    #[must_use]
    pub fn total_profit(&self) -> Decimal {
        self.positions.values().map(|p| p.profit).sum()
    }

    /// Most recent account figures seen.
    #[must_use]
    pub const fn account(&self) -> Option<&AccountSnapshot> {
        self.account.as_ref()
    }
}

impl Reconcile<ProfitDeltaBatch> for PositionBook {
    fn apply(&mut self, batch: &ProfitDeltaBatch) {
        for position in batch.new.iter().chain(&batch.updated) {
            self.positions.insert(position.ticket, position.clone());
        }
        for position in &batch.deleted {
            self.positions.remove(&position.ticket);
        }
        if let Some(account) = &batch.account {
            self.account = Some(account.clone());
        }
    }
}

// =============================================================================
// Order Book
// =============================================================================

/// Active orders rebuilt from trade event batches.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    orders: BTreeMap<Ticket, OrderInfo>,
    account: Option<AccountSnapshot>,
}

impl OrderBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Check if no orders are active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Look up one order.
    #[must_use]
    pub fn get(&self, ticket: Ticket) -> Option<&OrderInfo> {
        self.orders.get(&ticket)
    }

    /// Active tickets in ascending order.
    pub fn tickets(&self) -> impl Iterator<Item = Ticket> + '_ {
        self.orders.keys().copied()
    }

    /// Most recent account figures seen.
    #[must_use]
    pub const fn account(&self) -> Option<&AccountSnapshot> {
        self.account.as_ref()
    }
}

impl Reconcile<TradeEventBatch> for OrderBook {
    fn apply(&mut self, batch: &TradeEventBatch) {
        for order in &batch.new_orders {
            self.orders.insert(order.ticket, order.clone());
        }
        for change in &batch.state_changed_orders {
            self.orders.insert(change.ticket(), change.current.clone());
        }
        for order in &batch.disappeared_orders {
            self.orders.remove(&order.ticket);
        }
        if let Some(account) = &batch.account {
            self.account = Some(account.clone());
        }
    }
}

// =============================================================================
// Ticket Set View
// =============================================================================

/// Latest opened-ticket snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketSetView {
    current: TicketSetSnapshot,
}

impl TicketSetView {
    /// Create an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot currently in effect.
    #[must_use]
    pub const fn current(&self) -> &TicketSetSnapshot {
        &self.current
    }
}

impl Reconcile<TicketSetSnapshot> for TicketSetView {
    fn apply(&mut self, snapshot: &TicketSetSnapshot) {
        self.current = snapshot.clone();
    }
}

// =============================================================================
// Tests
// =============================================================================
