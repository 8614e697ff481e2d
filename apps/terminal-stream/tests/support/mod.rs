//! Shared fixtures for integration tests: a scripted transport and wire
//! message builders.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use terminal_stream::infrastructure::gateway::proto::{
    self, MqlTick, OnPositionProfitReply, OnPositionsAndPendingOrdersTicketsReply,
    OnSymbolTickReply, OnTradeData, OnTradeReply, OnTradeTransactionData,
    OnTradeTransactionReply, PositionProfitData, PositionProfitInfo,
    PositionsAndPendingOrdersTicketsData, SymbolTickData, TradeOrderInfo, TradeOrderStateChange,
    TradeTransaction, WireMessage,
};
use terminal_stream::{
    CancellationScope, FeedSubscriber, GatewayTransport, RawMessageSource, SubscriptionDescriptor,
    SubscriptionSettings, TransportError, WireItem,
};

/// Transport handing out pre-built sources in order, one per open.
pub struct ScriptedTransport {
    sources: Mutex<VecDeque<RawMessageSource>>,
    opened: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(sources: impl IntoIterator<Item = RawMessageSource>) -> Arc<Self> {
        Arc::new(Self {
            sources: Mutex::new(sources.into_iter().collect()),
            opened: AtomicUsize::new(0),
        })
    }

    /// Number of `open_stream` calls so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GatewayTransport for ScriptedTransport {
    async fn open_stream(
        &self,
        _descriptor: &SubscriptionDescriptor,
        _scope: &CancellationScope,
    ) -> Result<RawMessageSource, TransportError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.sources
            .lock()
            .pop_front()
            .ok_or_else(|| TransportError::Unavailable {
                message: "no scripted stream left".to_string(),
            })
    }
}

/// A source fed through a channel the test controls.
pub fn channel_source() -> (mpsc::Sender<WireItem>, RawMessageSource) {
    let (tx, rx) = mpsc::channel(64);
    (tx, RawMessageSource::from_receiver(rx))
}

/// Subscriber over `transport` with the given settings.
pub fn subscriber(
    transport: &Arc<ScriptedTransport>,
    settings: SubscriptionSettings,
) -> FeedSubscriber {
    FeedSubscriber::new(Arc::clone(transport) as Arc<dyn GatewayTransport>, settings)
}

pub fn tick(symbol: &str, bid: f64, ask: f64, time_msc: i64) -> WireMessage {
    OnSymbolTickReply {
        data: Some(SymbolTickData {
            symbol: symbol.to_string(),
            tick: Some(MqlTick {
                time: None,
                bid,
                ask,
                last: 0.0,
                volume: 1,
                time_msc,
                flags: 0x06,
                volume_real: 1.0,
            }),
        }),
        error: None,
    }
    .into()
}

/// A tick reply with a blank symbol, which decoding skips.
pub fn malformed_tick() -> WireMessage {
    tick("  ", 1.0, 1.0, 1_700_000_000_000)
}

/// A tick reply whose envelope carries a gateway error.
pub fn gateway_error_tick(code: i32, message: &str) -> WireMessage {
    OnSymbolTickReply {
        data: None,
        error: Some(proto::Error {
            code,
            message: message.to_string(),
        }),
    }
    .into()
}

/// An empty trade reply, used to send the wrong feed on a stream.
pub fn empty_trade() -> WireMessage {
    OnTradeReply {
        data: None,
        error: None,
    }
    .into()
}

fn profit_infos(entries: &[(i64, f64)]) -> Vec<PositionProfitInfo> {
    entries
        .iter()
        .map(|&(ticket, profit)| PositionProfitInfo {
            ticket,
            symbol: "EURUSD".to_string(),
            profit,
        })
        .collect()
}

pub fn profit_batch(
    new: &[(i64, f64)],
    updated: &[(i64, f64)],
    deleted: &[(i64, f64)],
) -> WireMessage {
    OnPositionProfitReply {
        data: Some(PositionProfitData {
            new_positions: profit_infos(new),
            updated_positions: profit_infos(updated),
            deleted_positions: profit_infos(deleted),
            account_info: None,
        }),
        error: None,
    }
    .into()
}

pub fn ticket_snapshot(positions: &[i64], pending: &[i64]) -> WireMessage {
    OnPositionsAndPendingOrdersTicketsReply {
        data: Some(PositionsAndPendingOrdersTicketsData {
            position_tickets: positions.to_vec(),
            pending_order_tickets: pending.to_vec(),
        }),
        error: None,
    }
    .into()
}

/// A pending buy-limit order on GBPUSD in the given wire state.
pub fn trade_order(ticket: i64, state: proto::OrderState) -> TradeOrderInfo {
    TradeOrderInfo {
        ticket,
        symbol: "GBPUSD".to_string(),
        order_type: proto::OrderType::BuyLimit as i32,
        state: state as i32,
        volume_initial: 1.0,
        volume_current: 1.0,
        price_open: 1.25,
        stop_loss: 0.0,
        take_profit: 0.0,
    }
}

/// A trade reply: `new` orders placed, `changed` orders moved from placed to
/// partially filled, `disappeared` orders filled.
pub fn trade_batch(new: &[i64], changed: &[i64], disappeared: &[i64]) -> WireMessage {
    OnTradeReply {
        data: Some(OnTradeData {
            new_orders: new
                .iter()
                .map(|&t| trade_order(t, proto::OrderState::Placed))
                .collect(),
            disappeared_orders: disappeared
                .iter()
                .map(|&t| trade_order(t, proto::OrderState::Filled))
                .collect(),
            state_changed_orders: changed
                .iter()
                .map(|&t| TradeOrderStateChange {
                    previous: Some(trade_order(t, proto::OrderState::Placed)),
                    current: Some(trade_order(t, proto::OrderState::Partial)),
                })
                .collect(),
            account_info: None,
        }),
        error: None,
    }
    .into()
}

/// A deal-add transaction for `deal` opening `position`.
pub fn deal_transaction(deal: i64, position: i64) -> WireMessage {
    OnTradeTransactionReply {
        data: Some(OnTradeTransactionData {
            trade_transaction: Some(TradeTransaction {
                deal,
                order: 0,
                symbol: "EURUSD".to_string(),
                transaction_type: proto::TradeTransactionType::DealAdd as i32,
                order_type: 0,
                order_state: 0,
                price: 1.1,
                volume: 0.1,
                position,
                position_by: 0,
            }),
            request_id: 0,
        }),
        error: None,
    }
    .into()
}
