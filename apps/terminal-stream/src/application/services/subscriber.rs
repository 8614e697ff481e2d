//! Feed Subscriber
//!
//! Entry point for application code. A [`FeedSubscriber`] holds the shared
//! gateway transport and default settings, and opens one independent
//! [`SubscriptionHandle`] per call. It keeps no registry: running several
//! feeds at once is a matter of holding several [`Subscription`]s.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::cancellation::{CancellationScope, DEFAULT_GRACE_PERIOD};
use super::dispatcher::{DataReceiver, ErrorReceiver};
use super::feeds::{
    Feed, OpenedTicketsFeed, PositionProfitFeed, TickFeed, TradeEventFeed, TransactionFeed,
};
use super::handle::{SubscribeError, SubscriptionHandle};
use crate::application::ports::GatewayTransport;
use crate::domain::subscription::{
    DEFAULT_BUFFER_DEPTH, DEFAULT_FEED_INTERVAL, DescriptorError, SubscriptionDescriptor,
};

/// Defaults applied by the typed `subscribe_*` methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSettings {
    /// Data queue depth.
    pub buffer_depth: usize,
    /// Time allowed for transport teardown after the pump stops.
    pub grace_period: Duration,
    /// Timer period for the profit and ticket feeds.
    pub feed_interval: Duration,
    /// Ask the gateway to skip batches without changes.
    pub ignore_empty: bool,
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            buffer_depth: DEFAULT_BUFFER_DEPTH,
            grace_period: DEFAULT_GRACE_PERIOD,
            feed_interval: DEFAULT_FEED_INTERVAL,
            ignore_empty: true,
        }
    }
}

/// A running subscription: its two queues and the handle controlling it.
#[derive(Debug)]
pub struct Subscription<F: Feed> {
    /// Decoded events in arrival order.
    pub data: DataReceiver<F::Event>,
    /// At most one terminal error.
    pub errors: ErrorReceiver,
    /// Lifecycle control.
    pub handle: SubscriptionHandle<F>,
}

impl<F: Feed> Subscription<F> {
    /// Split into queues and handle.
    #[must_use]
    pub fn into_parts(self) -> (DataReceiver<F::Event>, ErrorReceiver, SubscriptionHandle<F>) {
        (self.data, self.errors, self.handle)
    }
}

/// Opens typed subscriptions over a shared gateway transport.
#[derive(Clone)]
pub struct FeedSubscriber {
    transport: Arc<dyn GatewayTransport>,
    settings: SubscriptionSettings,
}

impl FeedSubscriber {
    /// Create a subscriber over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn GatewayTransport>, settings: SubscriptionSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Settings applied by the typed methods.
    #[must_use]
    pub const fn settings(&self) -> &SubscriptionSettings {
        &self.settings
    }

    /// Subscribe with an explicit descriptor, used as given.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is for another feed or the stream
    /// cannot be opened.
    pub async fn subscribe<F: Feed>(
        &self,
        descriptor: SubscriptionDescriptor,
        scope: &CancellationScope,
    ) -> Result<Subscription<F>, SubscribeError> {
        let handle = SubscriptionHandle::<F>::new(Arc::clone(&self.transport), descriptor, scope)?
            .with_grace_period(self.settings.grace_period);
        let (data, errors) = handle.subscribe().await?;

        Ok(Subscription {
            data,
            errors,
            handle,
        })
    }

    /// Subscribe to ticks for `symbols`.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol list is empty or the stream cannot be
    /// opened.
    pub async fn subscribe_ticks<I, S>(
        &self,
        symbols: I,
        scope: &CancellationScope,
    ) -> Result<Subscription<TickFeed>, SubscribeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let descriptor = self.configure(SubscriptionDescriptor::ticks(symbols)?)?;
        self.subscribe(descriptor, scope).await
    }

    /// Subscribe to position profit deltas.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be opened.
    pub async fn subscribe_position_profits(
        &self,
        scope: &CancellationScope,
    ) -> Result<Subscription<PositionProfitFeed>, SubscribeError> {
        let descriptor = self.configure(SubscriptionDescriptor::position_profits())?;
        self.subscribe(descriptor, scope).await
    }

    /// Subscribe to opened-ticket snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be opened.
    pub async fn subscribe_opened_tickets(
        &self,
        scope: &CancellationScope,
    ) -> Result<Subscription<OpenedTicketsFeed>, SubscribeError> {
        let descriptor = self.configure(SubscriptionDescriptor::opened_tickets())?;
        self.subscribe(descriptor, scope).await
    }

    /// Subscribe to trade event batches.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be opened.
    pub async fn subscribe_trade_events(
        &self,
        scope: &CancellationScope,
    ) -> Result<Subscription<TradeEventFeed>, SubscribeError> {
        let descriptor = self.configure(SubscriptionDescriptor::trade_events())?;
        self.subscribe(descriptor, scope).await
    }

    /// Subscribe to trade transactions.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be opened.
    pub async fn subscribe_transactions(
        &self,
        scope: &CancellationScope,
    ) -> Result<Subscription<TransactionFeed>, SubscribeError> {
        let descriptor = self.configure(SubscriptionDescriptor::transactions())?;
        self.subscribe(descriptor, scope).await
    }

    /// Apply these settings to a descriptor built elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured feed interval is zero.
    pub fn configure(
        &self,
        descriptor: SubscriptionDescriptor,
    ) -> Result<SubscriptionDescriptor, DescriptorError> {
        Ok(descriptor
            .with_buffer_depth(self.settings.buffer_depth)
            .with_interval(self.settings.feed_interval)?
            .with_ignore_empty(self.settings.ignore_empty))
    }
}

impl fmt::Debug for FeedSubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedSubscriber")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
