//! Error types for the bridge
//!
//! Only [`BridgeError::Connect`] is fatal. Every other error is caught by the
//! component that owns the failing call, logged, and replaced with a short
//! user-facing message.

use thiserror::Error;

/// Main error type for bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The radio link could not be established within the retry budget
    #[error("Failed to connect to {host} after {attempts} attempts: {reason}")]
    Connect {
        host: String,
        attempts: u32,
        reason: String,
    },

    /// A send was attempted while the link is not connected
    #[error("Radio link is not connected")]
    NotConnected,

    /// The radio transport rejected an operation
    #[error("Radio transport error: {0}")]
    Transport(String),

    /// The chat backend rejected a request
    #[error("Chat backend error: {0}")]
    Chat(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl BridgeError {
    /// Whether the process has to stop because of this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::Connect { .. })
    }
}

/// Failures of the weather, translation and assistant providers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider needs a credential that was not configured
    #[error("{key} is not configured")]
    NotConfigured { key: &'static str },

    /// The provider answered but knows nothing about the query
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request failed: {0}")]
    Request(String),

    /// The provider answered with something we could not interpret
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Request(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
