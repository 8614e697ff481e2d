//! Domain Layer - Core feed types and reconciliation rules.
//!
//! This layer contains the wire-agnostic types delivered to consumers and
//! the rules for rebuilding state from them. Nothing here performs I/O.

/// Terminal stream errors.
pub mod error;

/// Delta reconciliation and reference consumers.
pub mod reconcile;

/// Feed event types (ticks, profit deltas, ticket snapshots, trades).
pub mod streaming;

/// Subscription descriptors.
pub mod subscription;
