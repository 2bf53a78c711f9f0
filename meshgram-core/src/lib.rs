//! Core library for the mesh/chat bridge
//!
//! This crate relays short text between a Meshtastic radio mesh and a chat
//! service: throttled radio sends, byte-budget framing, and the command
//! router that answers `/test`, `/weather` and friends from the radio side.

pub mod bridge;
pub mod chat;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod frame;
pub mod nodes;
pub mod poller;
pub mod provider;
pub mod shutdown;
pub mod throttle;
pub mod transport;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeStats};
pub use config::BridgeConfig;
pub use error::{BridgeError, ProviderError, Result};
pub use event::{InboundRadioEvent, OutboundMessage, Outbox};
pub use frame::FrameCodec;
pub use poller::{ChatPoller, PollSettings};
pub use shutdown::Shutdown;
pub use throttle::Throttle;
pub use transport::{LinkState, RetryPolicy, TransportLink};

#[cfg(test)]
mod test_utils;
