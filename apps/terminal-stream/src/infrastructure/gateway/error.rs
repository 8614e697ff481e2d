//! Error types for the gateway client.

use thiserror::Error;

/// Errors that can occur while setting up the gateway client.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Transport error during channel setup.
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message describing the configuration issue.
        message: String,
    },
}
