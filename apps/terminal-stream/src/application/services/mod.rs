//! Application Services
//!
//! Services that run subscriptions on top of the gateway transport port.
//!
//! - `SubscriptionHandle`: Lifecycle of one subscription and its pump task
//! - `FeedSubscriber`: Typed entry point that opens handles with defaults
//! - `CancellationScope`: Stop signal and optional deadline shared with children
//! - `RetryPolicy`: Backoff between caller-driven resubscriptions

mod cancellation;
mod dispatcher;
mod feeds;
mod handle;
mod retry;
mod subscriber;

pub use cancellation::{CancelCause, CancellationScope, DEFAULT_GRACE_PERIOD};
pub use dispatcher::{
    DataReceiver, DataSender, ErrorReceiver, ErrorSender, TryRecvError, data_queue, error_queue,
};
pub use feeds::{
    Feed, OpenedTicketsFeed, PositionProfitFeed, TickFeed, TradeEventFeed, TransactionFeed,
};
pub use handle::{HandleState, SubscribeError, SubscriptionHandle};
pub use retry::{RetryConfig, RetryPolicy};
pub use subscriber::{FeedSubscriber, Subscription, SubscriptionSettings};
