//! Gateway Client (Driven Adapter)
//!
//! Connects to the trading-terminal gateway's subscription service and
//! turns its server-streaming replies into wire messages for the
//! application layer.
//!
//! # Usage
//!
//! ```ignore
//! use terminal_stream::infrastructure::gateway::{GatewayClient, GatewayConfig};
//!
//! let config = GatewayConfig::new("http://localhost:5000").with_session_id(session);
//! let client = GatewayClient::connect(&config).await?;
//!
//! let subscriber = FeedSubscriber::new(Arc::new(client), SubscriptionSettings::default());
//! let mut ticks = subscriber.subscribe_ticks(["EURUSD"], &scope).await?;
//! while let Some(tick) = ticks.data.recv().await {
//!     println!("{}: bid={} ask={}", tick.symbol, tick.bid, tick.ask);
//! }
//! ```

mod client;
mod config;
mod error;

pub mod decoder;
pub mod proto;

pub use client::{GatewayClient, map_status};
pub use config::GatewayConfig;
pub use decoder::DecodeError;
pub use error::GatewayError;
