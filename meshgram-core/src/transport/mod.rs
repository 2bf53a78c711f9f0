//! Radio link lifecycle
//!
//! [`TransportLink`] drives a [`RadioConnector`] through
//! `Disconnected -> Connecting -> Connected -> Disconnected`, retrying the
//! initial connection a bounded number of times.

mod device;

pub use device::{MeshtasticConnector, MeshtasticLink};

use async_trait::async_trait;
use std::time::Duration;
use strum::Display;
use tracing::{debug, error, info, warn};

use crate::error::{BridgeError, Result};
use crate::event::EventSink;
use crate::nodes::NodeDirectory;

/// An open connection to a radio
#[async_trait]
pub trait RadioLink: Send {
    /// Broadcast already-framed text on the primary channel
    async fn send_text(&mut self, text: &str) -> Result<()>;

    /// Release the connection. Called at most once.
    async fn close(&mut self) -> Result<()>;

    /// Node directory populated from packets heard on this link
    fn nodes(&self) -> NodeDirectory;
}

/// Opens [`RadioLink`]s. Inbound text is delivered through the sink.
#[async_trait]
pub trait RadioConnector: Send + Sync {
    type Link: RadioLink;

    async fn connect(&self, host: &str, sink: EventSink) -> Result<Self::Link>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

pub struct TransportLink<C: RadioConnector> {
    connector: C,
    retry: RetryPolicy,
    state: LinkState,
    link: Option<C::Link>,
}

impl<C: RadioConnector> TransportLink<C> {
    pub fn new(connector: C, retry: RetryPolicy) -> Self {
        Self {
            connector,
            retry,
            state: LinkState::Disconnected,
            link: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// Node directory of the open link, or an empty one when disconnected
    pub fn nodes(&self) -> NodeDirectory {
        self.link.as_ref().map(|l| l.nodes()).unwrap_or_default()
    }

    /// Connect, retrying up to the policy's bound.
    ///
    /// Running out of attempts yields [`BridgeError::Connect`], which is fatal.
    pub async fn connect(&mut self, host: &str, sink: EventSink) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let attempts = self.retry.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            self.state = LinkState::Connecting;
            info!("Connecting to mesh node at {host} (attempt {attempt}/{attempts})");

            match self.connector.connect(host, sink.clone()).await {
                Ok(link) => {
                    self.link = Some(link);
                    self.state = LinkState::Connected;
                    info!("Mesh connected");
                    return Ok(());
                }
                Err(e) => {
                    self.state = LinkState::Disconnected;
                    warn!("Attempt {attempt}: {e}");
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }

        error!("Could not connect to {host}, giving up");
        Err(BridgeError::Connect {
            host: host.to_string(),
            attempts,
            reason: last_error,
        })
    }

    /// Send framed text. A failure leaves the link connected.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        match (&self.state, self.link.as_mut()) {
            (LinkState::Connected, Some(link)) => link.send_text(text).await,
            _ => Err(BridgeError::NotConnected),
        }
    }

    /// Idempotent; always leaves the link `Disconnected`
    pub async fn disconnect(&mut self) {
        self.state = LinkState::Disconnected;
        if let Some(mut link) = self.link.take() {
            match link.close().await {
                Ok(()) => info!("Mesh disconnected"),
                Err(e) => warn!("Error while closing mesh link: {e}"),
            }
        } else {
            debug!("Mesh link already closed");
        }
    }
}
