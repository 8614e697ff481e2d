//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the subscription services and the port interface
//! through which they reach the gateway.

/// Port interfaces for external systems (gateway transport).
pub mod ports;

/// Application services for subscription lifecycle and delivery.
pub mod services;
