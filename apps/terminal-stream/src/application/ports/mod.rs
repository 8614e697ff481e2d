//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `GatewayTransport`: opens one server-streaming call per subscription

mod gateway_transport_port;

#[cfg(test)]
pub use gateway_transport_port::MockGatewayTransport;
pub use gateway_transport_port::{GatewayTransport, RawMessageSource, TransportError, WireItem};
