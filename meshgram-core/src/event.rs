//! Values flowing through the bridge and the queues that carry them
//!
//! Two queues exist. The [`EventSink`] half is handed to the radio transport,
//! whose delivery context may be any thread; it only enqueues. The
//! [`Outbox`] is how command handlers and the chat poller submit text for
//! the radio. Both are drained by the bridge loop, the single owner of the
//! outbound path.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// A text packet heard on the mesh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundRadioEvent {
    /// Sender in `!xxxxxxxx` form
    pub sender_id: String,
    pub text: String,
    pub snr: f32,
    pub rssi: i32,
    /// Hops the packet may still take
    pub hop_limit: u32,
    /// Hop limit the sender started with
    pub hop_start: u32,
    pub received_at: DateTime<Utc>,
}

impl InboundRadioEvent {
    pub fn new(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            text: text.into(),
            snr: 0.0,
            rssi: 0,
            hop_limit: 0,
            hop_start: 0,
            received_at: Utc::now(),
        }
    }

    pub fn with_signal(mut self, snr: f32, rssi: i32) -> Self {
        self.snr = snr;
        self.rssi = rssi;
        self
    }

    pub fn with_hops(mut self, hop_start: u32, hop_limit: u32) -> Self {
        self.hop_start = hop_start;
        self.hop_limit = hop_limit;
        self
    }

    /// Hops already travelled, or 0 when the radio did not report both values
    pub fn hop_count(&self) -> u32 {
        if self.hop_start > 0 && self.hop_limit > 0 {
            self.hop_start.saturating_sub(self.hop_limit)
        } else {
            0
        }
    }
}

/// Text bound for the radio.
///
/// Chat-bound text never takes this path: ordinary radio text is relayed
/// to every chat by [`relay_to_chat`](crate::bridge::relay_to_chat).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub text: String,
    /// Extra wait before this message enters the throttle
    pub delay: Option<Duration>,
}

impl OutboundMessage {
    pub fn radio(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            delay: None,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Creates the transport-to-bridge handoff channel
pub fn event_channel() -> (EventSink, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, EventReceiver { rx })
}

/// Inbound-event callback handed to the radio transport.
///
/// `deliver` never blocks, so it is safe to call from the transport's own
/// delivery context.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<InboundRadioEvent>,
}

impl EventSink {
    /// Returns false once the bridge has stopped listening
    pub fn deliver(&self, event: InboundRadioEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping radio event from {}: bridge stopped", e.0.sender_id);
                false
            }
        }
    }
}

#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<InboundRadioEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Option<InboundRadioEvent> {
        self.rx.recv().await
    }
}

/// Handle for submitting messages to the bridge's outbound path
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Outbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn submit(&self, message: OutboundMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    /// Queue text for the radio
    pub fn radio(&self, text: impl Into<String>) -> bool {
        self.submit(OutboundMessage::radio(text))
    }
}
