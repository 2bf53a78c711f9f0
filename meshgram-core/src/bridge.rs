//! The bridge loop
//!
//! [`Bridge::run`] is the only place radio sends happen. It connects the
//! transport, then multiplexes three sources on one task: inbound radio
//! events from the transport's [`EventSink`](crate::event::EventSink),
//! outbound messages from the [`Outbox`], and the shutdown signal. The
//! throttle and the link are fields of the bridge, so sends can never race.
//!
//! A radio message waiting for its slot is loop state, not an await: the
//! loop keeps serving radio events until the slot's deadline fires.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::chat::ChatBackend;
use crate::command::{self, CommandRouter, Parsed, replies};
use crate::error::Result;
use crate::event::{InboundRadioEvent, OutboundMessage, Outbox, event_channel};
use crate::frame::FrameCodec;
use crate::nodes::NodeNames;
use crate::shutdown::Shutdown;
use crate::throttle::Throttle;
use crate::transport::{RadioConnector, TransportLink};

/// Pause between chat destinations when relaying one radio message
pub const RELAY_PAUSE: Duration = Duration::from_millis(100);

/// Counters reported when the bridge stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    pub radio_sent: u64,
    pub radio_failed: u64,
    pub chat_relayed: u64,
    pub chat_failed: u64,
    pub commands: u64,
}

#[derive(Debug, Default)]
struct Counters {
    radio_sent: AtomicU64,
    radio_failed: AtomicU64,
    chat_relayed: AtomicU64,
    chat_failed: AtomicU64,
    commands: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> BridgeStats {
        BridgeStats {
            radio_sent: self.radio_sent.load(Ordering::Relaxed),
            radio_failed: self.radio_failed.load(Ordering::Relaxed),
            chat_relayed: self.chat_relayed.load(Ordering::Relaxed),
            chat_failed: self.chat_failed.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
        }
    }
}

/// Result of relaying one radio message to the configured chats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayOutcome {
    pub delivered: usize,
    pub failed: usize,
}

/// Send `text` to every chat independently; one failure never skips the rest
pub async fn relay_to_chat(
    chat: &dyn ChatBackend,
    chat_ids: &[i64],
    text: &str,
    pause: Duration,
) -> RelayOutcome {
    let mut outcome = RelayOutcome::default();
    for &chat_id in chat_ids {
        match chat.send_message(chat_id, text).await {
            Ok(()) => {
                info!("✅ Chat {chat_id}");
                outcome.delivered += 1;
            }
            Err(e) => {
                error!("❌ Chat {chat_id}: {e}");
                outcome.failed += 1;
            }
        }
        tokio::time::sleep(pause).await;
    }
    outcome
}

/// Truncated radio text held until its slot opens
#[derive(Debug)]
struct PendingSend {
    frame: String,
    ready_at: Instant,
}

pub struct Bridge<C: RadioConnector> {
    link: TransportLink<C>,
    host: String,
    throttle: Throttle,
    codec: FrameCodec,
    router: Arc<CommandRouter>,
    chat: Arc<dyn ChatBackend>,
    chat_ids: Arc<Vec<i64>>,
    name_overrides: HashMap<String, String>,
    outbox: Outbox,
    outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    tasks: JoinSet<()>,
    counters: Arc<Counters>,
    relay_pause: Duration,
}

impl<C: RadioConnector> Bridge<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        link: TransportLink<C>,
        host: impl Into<String>,
        throttle: Throttle,
        codec: FrameCodec,
        router: CommandRouter,
        chat: Arc<dyn ChatBackend>,
        chat_ids: Vec<i64>,
        name_overrides: HashMap<String, String>,
    ) -> Self {
        let (outbox, outbound) = Outbox::channel();
        Self {
            link,
            host: host.into(),
            throttle,
            codec,
            router: Arc::new(router),
            chat,
            chat_ids: Arc::new(chat_ids),
            name_overrides,
            outbox,
            outbound,
            tasks: JoinSet::new(),
            counters: Arc::new(Counters::default()),
            relay_pause: RELAY_PAUSE,
        }
    }

    pub fn with_relay_pause(mut self, pause: Duration) -> Self {
        self.relay_pause = pause;
        self
    }

    /// Handle for queueing radio-bound text, e.g. from the chat poller
    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// Connect, serve until shutdown, then disconnect.
    ///
    /// Only a failed connection is returned as an error. The link is
    /// disconnected on every exit path.
    pub async fn run(mut self, shutdown: Shutdown) -> Result<BridgeStats> {
        let (sink, mut events) = event_channel();

        let connected = tokio::select! {
            result = self.link.connect(&self.host, sink) => Some(result),
            _ = shutdown.wait() => None,
        };
        match connected {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                self.link.disconnect().await;
                return Err(e);
            }
            None => {
                info!("Shutdown requested while connecting");
                self.link.disconnect().await;
                return Ok(self.counters.snapshot());
            }
        }

        let names = NodeNames::new(std::mem::take(&mut self.name_overrides), self.link.nodes());
        info!("🚀 Bridge running");

        let mut events_open = true;
        let mut pending: Option<PendingSend> = None;
        loop {
            let ready_at = pending.as_ref().map_or_else(Instant::now, |p| p.ready_at);
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_radio_event(event, &names).await,
                    None => {
                        warn!("Radio event stream closed");
                        events_open = false;
                    }
                },
                _ = tokio::time::sleep_until(ready_at), if pending.is_some() => {
                    if let Some(send) = pending.take() {
                        self.transmit(send).await;
                    }
                }
                Some(message) = self.outbound.recv(), if pending.is_none() => {
                    pending = Some(self.stage(message));
                }
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Bridge task failed: {e}");
                    }
                }
            }
        }

        if pending.is_some() {
            debug!("Shutting down, dropping queued message");
        }
        info!("Stopping bridge");
        self.tasks.shutdown().await;
        self.link.disconnect().await;

        let stats = self.counters.snapshot();
        info!(
            "Radio sent {} (failed {}), chat relayed {} (failed {}), commands {}",
            stats.radio_sent, stats.radio_failed, stats.chat_relayed, stats.chat_failed, stats.commands
        );
        Ok(stats)
    }

    async fn handle_radio_event(&mut self, event: InboundRadioEvent, names: &NodeNames) {
        let sender_name = names.resolve(&event.sender_id).await;
        info!(
            "📨 {sender_name} ({id}): {preview}",
            id = event.sender_id,
            preview = command::preview(&event.text)
        );

        match command::parse(&event.text) {
            Parsed::Command(invocation) => {
                Counters::bump(&self.counters.commands);
                if invocation.command.uses_provider() {
                    let router = Arc::clone(&self.router);
                    let outbox = self.outbox.clone();
                    self.tasks.spawn(async move {
                        router
                            .dispatch(&invocation, &sender_name, &event, &outbox)
                            .await;
                    });
                } else {
                    self.router
                        .dispatch(&invocation, &sender_name, &event, &self.outbox)
                        .await;
                }
            }
            Parsed::Ordinary(text) => {
                let chat = Arc::clone(&self.chat);
                let chat_ids = Arc::clone(&self.chat_ids);
                let counters = Arc::clone(&self.counters);
                let pause = self.relay_pause;
                let message = replies::chat_relay(&sender_name, &text);
                self.tasks.spawn(async move {
                    let outcome = relay_to_chat(chat.as_ref(), &chat_ids, &message, pause).await;
                    counters
                        .chat_relayed
                        .fetch_add(outcome.delivered as u64, Ordering::Relaxed);
                    counters
                        .chat_failed
                        .fetch_add(outcome.failed as u64, Ordering::Relaxed);
                });
            }
        }
    }

    /// Truncate the message and work out when it may go on the air.
    ///
    /// The extra delay of a staged reply and the throttle interval overlap:
    /// the slot opens when both have passed.
    fn stage(&self, message: OutboundMessage) -> PendingSend {
        let now = Instant::now();
        let ready_at = (now + message.delay.unwrap_or_default()).max(self.throttle.ready_at());
        if ready_at > now {
            debug!("Radio send held for {:?}", ready_at - now);
        }
        PendingSend {
            frame: self.codec.truncate(&message.text),
            ready_at,
        }
    }

    async fn transmit(&mut self, send: PendingSend) {
        let text = send.frame.as_str();
        let link = &mut self.link;
        if self.throttle.schedule_send(move || link.send(text)).await {
            info!("📤 Mesh: {}", command::preview(text));
            Counters::bump(&self.counters.radio_sent);
        } else {
            Counters::bump(&self.counters.radio_failed);
        }
    }
}
