//! Configuration Module
//!
//! Configuration loading for the terminal stream runner.

mod settings;

pub use settings::{ConfigError, StreamConfig};
