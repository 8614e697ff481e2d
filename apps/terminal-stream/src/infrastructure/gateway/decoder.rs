//! Wire Decoder
//!
//! Pure functions mapping one [`WireMessage`] to one [`FeedEvent`].
//!
//! # Error Classification
//!
//! A [`DecodeError`] is either about the envelope or about the payload:
//!
//! - **Fatal** ([`DecodeError::is_fatal`]): the reply belongs to another
//!   feed, or the envelope carries a gateway error. The subscription cannot
//!   trust anything that follows.
//! - **Recoverable**: the payload is malformed (missing data, empty symbol,
//!   non-finite number, invalid ticket, unknown enum value). The message is
//!   skipped and the stream continues.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use super::proto::{
    self, AccountInfo, OnPositionProfitReply, OnPositionsAndPendingOrdersTicketsReply,
    OnSymbolTickReply, OnTradeReply, OnTradeTransactionReply, PositionProfitInfo, TradeOrderInfo,
    TradeOrderStateChange, WireMessage,
};
use crate::domain::streaming::{
    AccountSnapshot, FeedEvent, OrderInfo, OrderState, OrderStateChange, OrderType,
    PositionProfit, ProfitDeltaBatch, Ticket, TickFlags, TickRecord, TicketSetSnapshot,
    TradeEventBatch, TransactionEvent, TransactionKind,
};
use crate::domain::subscription::FeedKind;

// =============================================================================
// Errors
// =============================================================================

/// Failure to turn a wire message into a domain event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The reply belongs to a different feed.
    #[error("expected {expected} reply, received {found}")]
    KindMismatch {
        /// Kind the subscription was opened for.
        expected: FeedKind,
        /// Kind of the received reply.
        found: FeedKind,
    },

    /// The gateway reported an error in the envelope.
    #[error("gateway error {code}: {message}")]
    Gateway {
        /// Gateway error code.
        code: i32,
        /// Gateway error text.
        message: String,
    },

    /// The envelope carries neither data nor error.
    #[error("reply carries no data")]
    MissingData,

    /// A required nested message is absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A symbol name is empty.
    #[error("empty symbol in {0}")]
    EmptySymbol(&'static str),

    /// A price, profit or volume is NaN or infinite.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    /// A timestamp cannot be represented.
    #[error("timestamp out of range: {0}")]
    InvalidTimestamp(i64),

    /// A ticket is zero or negative.
    #[error("invalid ticket {value} in {field}")]
    InvalidTicket {
        /// Field holding the ticket.
        field: &'static str,
        /// Raw value.
        value: i64,
    },

    /// An enumeration value is not known.
    #[error("unknown {field} value {value}")]
    UnknownEnum {
        /// Enumeration field.
        field: &'static str,
        /// Raw value.
        value: i32,
    },
}

impl DecodeError {
    /// Check if the error condemns the whole subscription.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::KindMismatch { .. } | Self::Gateway { .. })
    }

    /// Stable name used in logs and metric labels.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::KindMismatch { .. } => "kind_mismatch",
            Self::Gateway { .. } => "gateway_error",
            Self::MissingData => "missing_data",
            Self::MissingField(_) => "missing_field",
            Self::EmptySymbol(_) => "empty_symbol",
            Self::NonFinite(_) => "non_finite",
            Self::InvalidTimestamp(_) => "invalid_timestamp",
            Self::InvalidTicket { .. } => "invalid_ticket",
            Self::UnknownEnum { .. } => "unknown_enum",
        }
    }
}

// =============================================================================
// Entry Point
// =============================================================================

/// Decode one message received on a subscription of the given kind.
///
/// # Errors
///
/// Returns a fatal error if the envelope does not belong to `kind` or carries
/// a gateway error, and a recoverable error if the payload is malformed.
pub fn decode(kind: FeedKind, message: &WireMessage) -> Result<FeedEvent, DecodeError> {
    if message.kind() != kind {
        return Err(DecodeError::KindMismatch {
            expected: kind,
            found: message.kind(),
        });
    }

    match message {
        WireMessage::SymbolTick(reply) => decode_tick(reply).map(FeedEvent::Tick),
        WireMessage::PositionProfit(reply) => {
            decode_position_profit(reply).map(FeedEvent::PositionProfit)
        }
        WireMessage::OpenedTickets(reply) => {
            decode_opened_tickets(reply).map(FeedEvent::OpenedTickets)
        }
        WireMessage::Trade(reply) => decode_trade_event(reply).map(FeedEvent::Trade),
        WireMessage::TradeTransaction(reply) => {
            decode_transaction(reply).map(FeedEvent::Transaction)
        }
    }
}

// =============================================================================
// Per-Feed Decoders
// =============================================================================

/// Decode a tick reply.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_tick(reply: &OnSymbolTickReply) -> Result<TickRecord, DecodeError> {
    let data = open_envelope(reply.data.as_ref(), reply.error.as_ref())?;
    let tick = data.tick.as_ref().ok_or(DecodeError::MissingField("tick"))?;

    Ok(TickRecord {
        symbol: symbol(&data.symbol, "tick")?,
        bid: decimal(tick.bid, "tick.bid")?,
        ask: decimal(tick.ask, "tick.ask")?,
        last: decimal(tick.last, "tick.last")?,
        volume: tick.volume,
        volume_real: decimal(tick.volume_real, "tick.volume_real")?,
        time: tick_time(tick)?,
        flags: TickFlags::from_bits(tick.flags),
    })
}

/// Decode a position profit reply.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_position_profit(
    reply: &OnPositionProfitReply,
) -> Result<ProfitDeltaBatch, DecodeError> {
    let data = open_envelope(reply.data.as_ref(), reply.error.as_ref())?;

    Ok(ProfitDeltaBatch {
        new: positions(&data.new_positions)?,
        updated: positions(&data.updated_positions)?,
        deleted: positions(&data.deleted_positions)?,
        account: data.account_info.as_ref().map(account).transpose()?,
    })
}

/// Decode an opened-ticket snapshot reply.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_opened_tickets(
    reply: &OnPositionsAndPendingOrdersTicketsReply,
) -> Result<TicketSetSnapshot, DecodeError> {
    let data = open_envelope(reply.data.as_ref(), reply.error.as_ref())?;

    Ok(TicketSetSnapshot {
        positions: ticket_set(&data.position_tickets, "position_tickets")?,
        pending_orders: ticket_set(&data.pending_order_tickets, "pending_order_tickets")?,
    })
}

/// Decode a trade event reply.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_trade_event(reply: &OnTradeReply) -> Result<TradeEventBatch, DecodeError> {
    let data = open_envelope(reply.data.as_ref(), reply.error.as_ref())?;

    Ok(TradeEventBatch {
        new_orders: orders(&data.new_orders)?,
        disappeared_orders: orders(&data.disappeared_orders)?,
        state_changed_orders: data
            .state_changed_orders
            .iter()
            .map(state_change)
            .collect::<Result<_, _>>()?,
        account: data.account_info.as_ref().map(account).transpose()?,
    })
}

/// Decode a trade transaction reply.
///
/// Zero-valued ticket fields mean the transaction does not concern that
/// entity. Order type and state are only meaningful for order and history
/// transactions.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_transaction(
    reply: &OnTradeTransactionReply,
) -> Result<TransactionEvent, DecodeError> {
    let data = open_envelope(reply.data.as_ref(), reply.error.as_ref())?;
    let tx = data
        .trade_transaction
        .as_ref()
        .ok_or(DecodeError::MissingField("trade_transaction"))?;

    let kind = transaction_kind(tx.transaction_type)?;
    let concerns_order = matches!(
        kind,
        TransactionKind::OrderAdd
            | TransactionKind::OrderUpdate
            | TransactionKind::OrderDelete
            | TransactionKind::HistoryAdd
            | TransactionKind::HistoryUpdate
            | TransactionKind::HistoryDelete
    );

    let (order_type, order_state) = if concerns_order {
        (
            Some(order_type(tx.order_type)?),
            Some(order_state(tx.order_state)?),
        )
    } else {
        (None, None)
    };

    Ok(TransactionEvent {
        kind,
        deal: optional_ticket(tx.deal, "trade_transaction.deal")?,
        order: optional_ticket(tx.order, "trade_transaction.order")?,
        position: optional_ticket(tx.position, "trade_transaction.position")?,
        position_by: optional_ticket(tx.position_by, "trade_transaction.position_by")?,
        symbol: tx.symbol.trim().to_string(),
        order_type,
        order_state,
        price: decimal(tx.price, "trade_transaction.price")?,
        volume: decimal(tx.volume, "trade_transaction.volume")?,
        request_id: (kind == TransactionKind::Request).then_some(data.request_id),
    })
}

// =============================================================================
// Field Conversions
// =============================================================================

fn open_envelope<'a, T>(
    data: Option<&'a T>,
    error: Option<&proto::Error>,
) -> Result<&'a T, DecodeError> {
    if let Some(error) = error {
        return Err(DecodeError::Gateway {
            code: error.code,
            message: error.message.clone(),
        });
    }
    data.ok_or(DecodeError::MissingData)
}

fn decimal(value: f64, field: &'static str) -> Result<Decimal, DecodeError> {
    if !value.is_finite() {
        return Err(DecodeError::NonFinite(field));
    }
    Decimal::from_f64(value).ok_or(DecodeError::NonFinite(field))
}

fn symbol(raw: &str, field: &'static str) -> Result<String, DecodeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::EmptySymbol(field));
    }
    Ok(trimmed.to_string())
}

fn ticket(value: i64, field: &'static str) -> Result<Ticket, DecodeError> {
    if value <= 0 {
        return Err(DecodeError::InvalidTicket { field, value });
    }
    Ok(Ticket::new(value))
}

fn optional_ticket(value: i64, field: &'static str) -> Result<Option<Ticket>, DecodeError> {
    match value {
        0 => Ok(None),
        v => ticket(v, field).map(Some),
    }
}

fn ticket_set(values: &[i64], field: &'static str) -> Result<BTreeSet<Ticket>, DecodeError> {
    values.iter().map(|&v| ticket(v, field)).collect()
}

fn tick_time(tick: &proto::MqlTick) -> Result<DateTime<Utc>, DecodeError> {
    if tick.time_msc != 0 {
        return DateTime::<Utc>::from_timestamp_millis(tick.time_msc)
            .filter(|_| tick.time_msc > 0)
            .ok_or(DecodeError::InvalidTimestamp(tick.time_msc));
    }

    let time = tick.time.as_ref().ok_or(DecodeError::MissingField("tick.time"))?;
    u32::try_from(time.nanos)
        .ok()
        .and_then(|nanos| DateTime::<Utc>::from_timestamp(time.seconds, nanos))
        .ok_or(DecodeError::InvalidTimestamp(time.seconds))
}

fn account(info: &AccountInfo) -> Result<AccountSnapshot, DecodeError> {
    Ok(AccountSnapshot {
        login: info.login,
        balance: decimal(info.balance, "account_info.balance")?,
        equity: decimal(info.equity, "account_info.equity")?,
        margin: decimal(info.margin, "account_info.margin")?,
        free_margin: decimal(info.margin_free, "account_info.margin_free")?,
        profit: decimal(info.profit, "account_info.profit")?,
    })
}

fn positions(infos: &[PositionProfitInfo]) -> Result<Vec<PositionProfit>, DecodeError> {
    infos
        .iter()
        .map(|info| {
            Ok(PositionProfit {
                ticket: ticket(info.ticket, "position.ticket")?,
                symbol: symbol(&info.symbol, "position")?,
                profit: decimal(info.profit, "position.profit")?,
            })
        })
        .collect()
}

fn orders(infos: &[TradeOrderInfo]) -> Result<Vec<OrderInfo>, DecodeError> {
    infos.iter().map(order).collect()
}

fn order(info: &TradeOrderInfo) -> Result<OrderInfo, DecodeError> {
    Ok(OrderInfo {
        ticket: ticket(info.ticket, "order.ticket")?,
        symbol: symbol(&info.symbol, "order")?,
        order_type: order_type(info.order_type)?,
        state: order_state(info.state)?,
        volume_initial: decimal(info.volume_initial, "order.volume_initial")?,
        volume_current: decimal(info.volume_current, "order.volume_current")?,
        price_open: decimal(info.price_open, "order.price_open")?,
        stop_loss: decimal(info.stop_loss, "order.stop_loss")?,
        take_profit: decimal(info.take_profit, "order.take_profit")?,
    })
}

fn state_change(change: &TradeOrderStateChange) -> Result<OrderStateChange, DecodeError> {
    let previous = change
        .previous
        .as_ref()
        .ok_or(DecodeError::MissingField("state_changed_orders.previous"))?;
    let current = change
        .current
        .as_ref()
        .ok_or(DecodeError::MissingField("state_changed_orders.current"))?;

    Ok(OrderStateChange {
        previous: order(previous)?,
        current: order(current)?,
    })
}

fn order_type(value: i32) -> Result<OrderType, DecodeError> {
    let wire = proto::OrderType::try_from(value).map_err(|_| DecodeError::UnknownEnum {
        field: "order_type",
        value,
    })?;

    Ok(match wire {
        proto::OrderType::Buy => OrderType::Buy,
        proto::OrderType::Sell => OrderType::Sell,
        proto::OrderType::BuyLimit => OrderType::BuyLimit,
        proto::OrderType::SellLimit => OrderType::SellLimit,
        proto::OrderType::BuyStop => OrderType::BuyStop,
        proto::OrderType::SellStop => OrderType::SellStop,
        proto::OrderType::BuyStopLimit => OrderType::BuyStopLimit,
        proto::OrderType::SellStopLimit => OrderType::SellStopLimit,
        proto::OrderType::CloseBy => OrderType::CloseBy,
    })
}

fn order_state(value: i32) -> Result<OrderState, DecodeError> {
    let wire = proto::OrderState::try_from(value).map_err(|_| DecodeError::UnknownEnum {
        field: "order_state",
        value,
    })?;

    Ok(match wire {
        proto::OrderState::Started => OrderState::Started,
        proto::OrderState::Placed => OrderState::Placed,
        proto::OrderState::Canceled => OrderState::Canceled,
        proto::OrderState::Partial => OrderState::Partial,
        proto::OrderState::Filled => OrderState::Filled,
        proto::OrderState::Rejected => OrderState::Rejected,
        proto::OrderState::Expired => OrderState::Expired,
        proto::OrderState::RequestAdd => OrderState::RequestAdd,
        proto::OrderState::RequestModify => OrderState::RequestModify,
        proto::OrderState::RequestCancel => OrderState::RequestCancel,
    })
}

fn transaction_kind(value: i32) -> Result<TransactionKind, DecodeError> {
    let wire = proto::TradeTransactionType::try_from(value).map_err(|_| {
        DecodeError::UnknownEnum {
            field: "transaction_type",
            value,
        }
    })?;

    Ok(match wire {
        proto::TradeTransactionType::OrderAdd => TransactionKind::OrderAdd,
        proto::TradeTransactionType::OrderUpdate => TransactionKind::OrderUpdate,
        proto::TradeTransactionType::OrderDelete => TransactionKind::OrderDelete,
        proto::TradeTransactionType::HistoryAdd => TransactionKind::HistoryAdd,
        proto::TradeTransactionType::HistoryUpdate => TransactionKind::HistoryUpdate,
        proto::TradeTransactionType::HistoryDelete => TransactionKind::HistoryDelete,
        proto::TradeTransactionType::DealAdd => TransactionKind::DealAdd,
        proto::TradeTransactionType::DealUpdate => TransactionKind::DealUpdate,
        proto::TradeTransactionType::DealDelete => TransactionKind::DealDelete,
        proto::TradeTransactionType::Position => TransactionKind::Position,
        proto::TradeTransactionType::Request => TransactionKind::Request,
    })
}

// =============================================================================
// Tests
// =============================================================================
