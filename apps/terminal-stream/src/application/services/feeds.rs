//! Feed Markers
//!
//! Zero-sized types binding a [`FeedKind`] to the event type its data queue
//! carries. A `SubscriptionHandle<TickFeed>` can only ever deliver
//! [`TickRecord`]s.

use std::fmt;

use crate::domain::streaming::{
    FeedEvent, ProfitDeltaBatch, TickRecord, TicketSetSnapshot, TradeEventBatch, TransactionEvent,
};
use crate::domain::subscription::FeedKind;
use crate::infrastructure::gateway::decoder::{self, DecodeError};
use crate::infrastructure::gateway::proto::WireMessage;

/// A feed kind with a typed event.
pub trait Feed: Send + Sync + 'static {
    /// Event delivered on the data queue.
    type Event: fmt::Debug + Send + 'static;

    /// Wire feed kind.
    const KIND: FeedKind;

    /// Narrow a decoded event to this feed's type.
    fn from_event(event: FeedEvent) -> Option<Self::Event>;

    /// Decode one wire message for this feed.
    ///
    /// # Errors
    ///
    /// Returns the decoder's error; a reply of another kind is fatal.
    fn decode(message: &WireMessage) -> Result<Self::Event, DecodeError> {
        let event = decoder::decode(Self::KIND, message)?;
        Self::from_event(event).ok_or(DecodeError::KindMismatch {
            expected: Self::KIND,
            found: message.kind(),
        })
    }
}

/// Price ticks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickFeed;

impl Feed for TickFeed {
    type Event = TickRecord;
    const KIND: FeedKind = FeedKind::Tick;

    fn from_event(event: FeedEvent) -> Option<Self::Event> {
        match event {
            FeedEvent::Tick(tick) => Some(tick),
            _ => None,
        }
    }
}

/// Position profit deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionProfitFeed;

impl Feed for PositionProfitFeed {
    type Event = ProfitDeltaBatch;
    const KIND: FeedKind = FeedKind::PositionProfit;

    fn from_event(event: FeedEvent) -> Option<Self::Event> {
        match event {
            FeedEvent::PositionProfit(batch) => Some(batch),
            _ => None,
        }
    }
}

/// Opened ticket snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenedTicketsFeed;

impl Feed for OpenedTicketsFeed {
    type Event = TicketSetSnapshot;
    const KIND: FeedKind = FeedKind::OpenedTicketSet;

    fn from_event(event: FeedEvent) -> Option<Self::Event> {
        match event {
            FeedEvent::OpenedTickets(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Trade event batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct TradeEventFeed;

impl Feed for TradeEventFeed {
    type Event = TradeEventBatch;
    const KIND: FeedKind = FeedKind::TradeEvent;

    fn from_event(event: FeedEvent) -> Option<Self::Event> {
        match event {
            FeedEvent::Trade(batch) => Some(batch),
            _ => None,
        }
    }
}

/// Trade transactions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionFeed;

impl Feed for TransactionFeed {
    type Event = TransactionEvent;
    const KIND: FeedKind = FeedKind::Transaction;

    fn from_event(event: FeedEvent) -> Option<Self::Event> {
        match event {
            FeedEvent::Transaction(event) => Some(event),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::gateway::proto::{
        OnPositionsAndPendingOrdersTicketsReply, PositionsAndPendingOrdersTicketsData,
    };

    #[test]
    fn typed_decode_narrows_event() {
        let message = WireMessage::from(OnPositionsAndPendingOrdersTicketsReply {
            data: Some(PositionsAndPendingOrdersTicketsData {
                position_tickets: vec![1],
                pending_order_tickets: vec![],
            }),
            error: None,
        });

        let snapshot = OpenedTicketsFeed::decode(&message).unwrap();
        assert_eq!(snapshot.len(), 1);

        let err = TickFeed::decode(&message).unwrap_err();
        assert!(err.is_fatal());
    }
}
