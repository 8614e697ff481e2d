//! Fine-grained trade transactions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderState, OrderType, Ticket};

/// Kind of trade transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// New order added.
    OrderAdd,
    /// Order modified.
    OrderUpdate,
    /// Order removed from the active list.
    OrderDelete,
    /// Order added to history.
    HistoryAdd,
    /// History order changed.
    HistoryUpdate,
    /// History order deleted.
    HistoryDelete,
    /// Deal executed.
    DealAdd,
    /// Deal changed.
    DealUpdate,
    /// Deal deleted.
    DealDelete,
    /// Position changed without a deal (e.g. SL/TP modification).
    Position,
    /// Trade request processed by the server.
    Request,
}

/// One lifecycle event of the transactions feed.
///
/// The most granular feed; events are strictly ordered and never batched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Deal ticket, if the transaction concerns a deal.
    pub deal: Option<Ticket>,
    /// Order ticket, if the transaction concerns an order.
    pub order: Option<Ticket>,
    /// Position ticket, if any.
    pub position: Option<Ticket>,
    /// Opposite position ticket for close-by operations.
    pub position_by: Option<Ticket>,
    /// Symbol (empty for requests without one).
    pub symbol: String,
    /// Order type, when known.
    pub order_type: Option<OrderType>,
    /// Order state, when known.
    pub order_state: Option<OrderState>,
    /// Price.
    pub price: Decimal,
    /// Volume in lots.
    pub volume: Decimal,
    /// Server request id, for `Request` transactions.
    pub request_id: Option<u32>,
}
