//! Order snapshots and trade event batches.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AccountSnapshot, Ticket};

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Market buy.
    Buy,
    /// Market sell.
    Sell,
    /// Buy limit.
    BuyLimit,
    /// Sell limit.
    SellLimit,
    /// Buy stop.
    BuyStop,
    /// Sell stop.
    SellStop,
    /// Buy stop limit.
    BuyStopLimit,
    /// Sell stop limit.
    SellStopLimit,
    /// Close by opposite position.
    CloseBy,
}

impl OrderType {
    /// Check if the order is a pending (non-market) order.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        !matches!(self, Self::Buy | Self::Sell | Self::CloseBy)
    }
}

/// Order lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Checked, not yet accepted.
    Started,
    /// Accepted.
    Placed,
    /// Canceled by the client.
    Canceled,
    /// Partially executed.
    Partial,
    /// Fully executed.
    Filled,
    /// Rejected.
    Rejected,
    /// Expired.
    Expired,
    /// Being registered.
    RequestAdd,
    /// Being modified.
    RequestModify,
    /// Being deleted.
    RequestCancel,
}

impl OrderState {
    /// Check if the state ends the order's life.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Canceled | Self::Filled | Self::Rejected | Self::Expired
        )
    }
}

/// Snapshot of one order as reported in a trade event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInfo {
    /// Order ticket.
    pub ticket: Ticket,
    /// Order symbol.
    pub symbol: String,
    /// Order type.
    pub order_type: OrderType,
    /// Order state.
    pub state: OrderState,
    /// Initial volume.
    pub volume_initial: Decimal,
    /// Unfilled volume.
    pub volume_current: Decimal,
    /// Order price.
    pub price_open: Decimal,
    /// Stop loss level (zero when unset).
    pub stop_loss: Decimal,
    /// Take profit level (zero when unset).
    pub take_profit: Decimal,
}

/// Transition of an order between two states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStateChange {
    /// Order before the change.
    pub previous: OrderInfo,
    /// Order after the change.
    pub current: OrderInfo,
}

impl OrderStateChange {
    /// Ticket of the changed order.
    #[must_use]
    pub const fn ticket(&self) -> Ticket {
        self.current.ticket
    }
}

/// Incremental change-set of trade activity.
///
/// `disappeared_orders` means filled, canceled or expired: terminal for that
/// ticket until the gateway reuses it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TradeEventBatch {
    /// Orders placed since the previous batch.
    pub new_orders: Vec<OrderInfo>,
    /// Orders that left the active set.
    pub disappeared_orders: Vec<OrderInfo>,
    /// Orders that changed state.
    pub state_changed_orders: Vec<OrderStateChange>,
    /// Account figures, when the gateway sends them.
    pub account: Option<AccountSnapshot>,
}

impl TradeEventBatch {
    /// Check if the batch carries no order changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new_orders.is_empty()
            && self.disappeared_orders.is_empty()
            && self.state_changed_orders.is_empty()
    }
}
