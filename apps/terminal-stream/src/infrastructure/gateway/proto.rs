//! Gateway Wire Schema
//!
//! Protobuf messages for the gateway's `terminal.v1.SubscriptionService`
//! server-streaming RPCs, declared by hand with `prost` derives.
//!
//! Every reply is an envelope carrying either `data` or a gateway `error`.
//! [`WireMessage`] is the tagged union of the five reply types and is what a
//! [`RawMessageSource`](crate::application::ports::RawMessageSource) yields.

#![allow(missing_docs)]

use crate::domain::subscription::FeedKind;

// =============================================================================
// Service Paths
// =============================================================================

/// Fully-qualified gRPC service name.
pub const SERVICE_NAME: &str = "terminal.v1.SubscriptionService";

/// Tick stream for a symbol list.
pub const ON_SYMBOL_TICK: &str = "/terminal.v1.SubscriptionService/OnSymbolTick";

/// Position profit delta stream.
pub const ON_POSITION_PROFIT: &str = "/terminal.v1.SubscriptionService/OnPositionProfit";

/// Opened ticket snapshot stream.
pub const ON_POSITIONS_AND_PENDING_ORDERS_TICKETS: &str =
    "/terminal.v1.SubscriptionService/OnPositionsAndPendingOrdersTickets";

/// Trade event batch stream.
pub const ON_TRADE: &str = "/terminal.v1.SubscriptionService/OnTrade";

/// Trade transaction stream.
pub const ON_TRADE_TRANSACTION: &str = "/terminal.v1.SubscriptionService/OnTradeTransaction";

// =============================================================================
// Requests
// =============================================================================

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnSymbolTickRequest {
    #[prost(string, repeated, tag = "1")]
    pub symbol_names: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnPositionProfitRequest {
    #[prost(int32, tag = "1")]
    pub timer_period_milliseconds: i32,
    #[prost(bool, tag = "2")]
    pub ignore_empty_data: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnPositionsAndPendingOrdersTicketsRequest {
    #[prost(int32, tag = "1")]
    pub timer_period_milliseconds: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnTradeRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnTradeTransactionRequest {}

// =============================================================================
// Shared
// =============================================================================

/// Error reported by the gateway inside a reply envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Error {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccountInfo {
    #[prost(int64, tag = "1")]
    pub login: i64,
    #[prost(double, tag = "2")]
    pub balance: f64,
    #[prost(double, tag = "3")]
    pub equity: f64,
    #[prost(double, tag = "4")]
    pub margin: f64,
    #[prost(double, tag = "5")]
    pub margin_free: f64,
    #[prost(double, tag = "6")]
    pub profit: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OrderType {
    Buy = 0,
    Sell = 1,
    BuyLimit = 2,
    SellLimit = 3,
    BuyStop = 4,
    SellStop = 5,
    BuyStopLimit = 6,
    SellStopLimit = 7,
    CloseBy = 8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OrderState {
    Started = 0,
    Placed = 1,
    Canceled = 2,
    Partial = 3,
    Filled = 4,
    Rejected = 5,
    Expired = 6,
    RequestAdd = 7,
    RequestModify = 8,
    RequestCancel = 9,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TradeTransactionType {
    OrderAdd = 0,
    OrderUpdate = 1,
    OrderDelete = 2,
    HistoryAdd = 3,
    HistoryUpdate = 4,
    HistoryDelete = 5,
    DealAdd = 6,
    DealUpdate = 7,
    DealDelete = 8,
    Position = 9,
    Request = 10,
}

// =============================================================================
// OnSymbolTick
// =============================================================================

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MqlTick {
    /// Second-resolution server time, used when `time_msc` is unset.
    #[prost(message, optional, tag = "1")]
    pub time: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(double, tag = "2")]
    pub bid: f64,
    #[prost(double, tag = "3")]
    pub ask: f64,
    #[prost(double, tag = "4")]
    pub last: f64,
    #[prost(uint64, tag = "5")]
    pub volume: u64,
    /// Milliseconds since the Unix epoch.
    #[prost(int64, tag = "6")]
    pub time_msc: i64,
    #[prost(uint32, tag = "7")]
    pub flags: u32,
    #[prost(double, tag = "8")]
    pub volume_real: f64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SymbolTickData {
    #[prost(string, tag = "1")]
    pub symbol: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub tick: ::core::option::Option<MqlTick>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnSymbolTickReply {
    #[prost(message, optional, tag = "1")]
    pub data: ::core::option::Option<SymbolTickData>,
    #[prost(message, optional, tag = "2")]
    pub error: ::core::option::Option<Error>,
}

// =============================================================================
// OnPositionProfit
// =============================================================================

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PositionProfitInfo {
    #[prost(int64, tag = "1")]
    pub ticket: i64,
    #[prost(string, tag = "2")]
    pub symbol: ::prost::alloc::string::String,
    #[prost(double, tag = "3")]
    pub profit: f64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PositionProfitData {
    #[prost(message, repeated, tag = "1")]
    pub new_positions: ::prost::alloc::vec::Vec<PositionProfitInfo>,
    #[prost(message, repeated, tag = "2")]
    pub updated_positions: ::prost::alloc::vec::Vec<PositionProfitInfo>,
    #[prost(message, repeated, tag = "3")]
    pub deleted_positions: ::prost::alloc::vec::Vec<PositionProfitInfo>,
    #[prost(message, optional, tag = "4")]
    pub account_info: ::core::option::Option<AccountInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnPositionProfitReply {
    #[prost(message, optional, tag = "1")]
    pub data: ::core::option::Option<PositionProfitData>,
    #[prost(message, optional, tag = "2")]
    pub error: ::core::option::Option<Error>,
}

// =============================================================================
// OnPositionsAndPendingOrdersTickets
// =============================================================================

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PositionsAndPendingOrdersTicketsData {
    #[prost(int64, repeated, tag = "1")]
    pub position_tickets: ::prost::alloc::vec::Vec<i64>,
    #[prost(int64, repeated, tag = "2")]
    pub pending_order_tickets: ::prost::alloc::vec::Vec<i64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnPositionsAndPendingOrdersTicketsReply {
    #[prost(message, optional, tag = "1")]
    pub data: ::core::option::Option<PositionsAndPendingOrdersTicketsData>,
    #[prost(message, optional, tag = "2")]
    pub error: ::core::option::Option<Error>,
}

// =============================================================================
// OnTrade
// =============================================================================

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TradeOrderInfo {
    #[prost(int64, tag = "1")]
    pub ticket: i64,
    #[prost(string, tag = "2")]
    pub symbol: ::prost::alloc::string::String,
    #[prost(enumeration = "OrderType", tag = "3")]
    pub order_type: i32,
    #[prost(enumeration = "OrderState", tag = "4")]
    pub state: i32,
    #[prost(double, tag = "5")]
    pub volume_initial: f64,
    #[prost(double, tag = "6")]
    pub volume_current: f64,
    #[prost(double, tag = "7")]
    pub price_open: f64,
    #[prost(double, tag = "8")]
    pub stop_loss: f64,
    #[prost(double, tag = "9")]
    pub take_profit: f64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TradeOrderStateChange {
    #[prost(message, optional, tag = "1")]
    pub previous: ::core::option::Option<TradeOrderInfo>,
    #[prost(message, optional, tag = "2")]
    pub current: ::core::option::Option<TradeOrderInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnTradeData {
    #[prost(message, repeated, tag = "1")]
    pub new_orders: ::prost::alloc::vec::Vec<TradeOrderInfo>,
    #[prost(message, repeated, tag = "2")]
    pub disappeared_orders: ::prost::alloc::vec::Vec<TradeOrderInfo>,
    #[prost(message, repeated, tag = "3")]
    pub state_changed_orders: ::prost::alloc::vec::Vec<TradeOrderStateChange>,
    #[prost(message, optional, tag = "4")]
    pub account_info: ::core::option::Option<AccountInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnTradeReply {
    #[prost(message, optional, tag = "1")]
    pub data: ::core::option::Option<OnTradeData>,
    #[prost(message, optional, tag = "2")]
    pub error: ::core::option::Option<Error>,
}

// =============================================================================
// OnTradeTransaction
// =============================================================================

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TradeTransaction {
    #[prost(int64, tag = "1")]
    pub deal: i64,
    #[prost(int64, tag = "2")]
    pub order: i64,
    #[prost(string, tag = "3")]
    pub symbol: ::prost::alloc::string::String,
    #[prost(enumeration = "TradeTransactionType", tag = "4")]
    pub transaction_type: i32,
    #[prost(enumeration = "OrderType", tag = "5")]
    pub order_type: i32,
    #[prost(enumeration = "OrderState", tag = "6")]
    pub order_state: i32,
    #[prost(double, tag = "7")]
    pub price: f64,
    #[prost(double, tag = "8")]
    pub volume: f64,
    #[prost(int64, tag = "9")]
    pub position: i64,
    #[prost(int64, tag = "10")]
    pub position_by: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnTradeTransactionData {
    #[prost(message, optional, tag = "1")]
    pub trade_transaction: ::core::option::Option<TradeTransaction>,
    #[prost(uint32, tag = "2")]
    pub request_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnTradeTransactionReply {
    #[prost(message, optional, tag = "1")]
    pub data: ::core::option::Option<OnTradeTransactionData>,
    #[prost(message, optional, tag = "2")]
    pub error: ::core::option::Option<Error>,
}

// =============================================================================
// Wire Message
// =============================================================================

/// One already-deserialized reply from any of the five streaming RPCs.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    SymbolTick(OnSymbolTickReply),
    PositionProfit(OnPositionProfitReply),
    OpenedTickets(OnPositionsAndPendingOrdersTicketsReply),
    Trade(OnTradeReply),
    TradeTransaction(OnTradeTransactionReply),
}

impl WireMessage {
    /// Feed kind this reply belongs to.
    #[must_use]
    pub const fn kind(&self) -> FeedKind {
        match self {
            Self::SymbolTick(_) => FeedKind::Tick,
            Self::PositionProfit(_) => FeedKind::PositionProfit,
            Self::OpenedTickets(_) => FeedKind::OpenedTicketSet,
            Self::Trade(_) => FeedKind::TradeEvent,
            Self::TradeTransaction(_) => FeedKind::Transaction,
        }
    }

    /// Gateway error carried by the envelope, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::SymbolTick(reply) => reply.error.as_ref(),
            Self::PositionProfit(reply) => reply.error.as_ref(),
            Self::OpenedTickets(reply) => reply.error.as_ref(),
            Self::Trade(reply) => reply.error.as_ref(),
            Self::TradeTransaction(reply) => reply.error.as_ref(),
        }
    }
}

impl From<OnSymbolTickReply> for WireMessage {
    fn from(reply: OnSymbolTickReply) -> Self {
        Self::SymbolTick(reply)
    }
}

impl From<OnPositionProfitReply> for WireMessage {
    fn from(reply: OnPositionProfitReply) -> Self {
        Self::PositionProfit(reply)
    }
}

impl From<OnPositionsAndPendingOrdersTicketsReply> for WireMessage {
    fn from(reply: OnPositionsAndPendingOrdersTicketsReply) -> Self {
        Self::OpenedTickets(reply)
    }
}

impl From<OnTradeReply> for WireMessage {
    fn from(reply: OnTradeReply) -> Self {
        Self::Trade(reply)
    }
}

impl From<OnTradeTransactionReply> for WireMessage {
    fn from(reply: OnTradeTransactionReply) -> Self {
        Self::TradeTransaction(reply)
    }
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;

    #[test]
    fn reply_survives_wire_encoding() {
        let reply = OnPositionsAndPendingOrdersTicketsReply {
            data: Some(PositionsAndPendingOrdersTicketsData {
                position_tickets: vec![100, 101],
                pending_order_tickets: vec![200],
            }),
            error: None,
        };

        let bytes = reply.encode_to_vec();
        let decoded = OnPositionsAndPendingOrdersTicketsReply::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, reply);
    }

    #[test]
    fn wire_message_reports_kind_and_error() {
        let message = WireMessage::from(OnTradeReply {
            data: None,
            error: Some(Error {
                code: 10_004,
                message: "requote".to_string(),
            }),
        });

        assert_eq!(message.kind(), FeedKind::TradeEvent);
        assert_eq!(message.error().map(|e| e.code), Some(10_004));
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        assert!(OrderType::try_from(42).is_err());
        assert_eq!(OrderState::try_from(4), Ok(OrderState::Filled));
    }
}
