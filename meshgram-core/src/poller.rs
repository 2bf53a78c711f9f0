//! Chat to radio direction
//!
//! The poller long-polls the chat backend and queues text from configured
//! chats on the bridge's [`Outbox`]. Poll failures never stop it.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::chat::{ChatBackend, ChatUpdate};
use crate::command;
use crate::error::Result;
use crate::event::Outbox;
use crate::shutdown::Shutdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Long-poll timeout passed to the backend
    pub timeout: Duration,
    /// Pause after every cycle
    pub interval: Duration,
    /// Consecutive failures tolerated before backing off
    pub error_threshold: u32,
    pub error_backoff: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            interval: Duration::from_millis(500),
            error_threshold: 10,
            error_backoff: Duration::from_secs(30),
        }
    }
}

pub struct ChatPoller {
    chat: Arc<dyn ChatBackend>,
    chat_ids: Vec<i64>,
    outbox: Outbox,
    settings: PollSettings,
    cursor: i64,
    consecutive_errors: u32,
}

impl ChatPoller {
    pub fn new(
        chat: Arc<dyn ChatBackend>,
        chat_ids: Vec<i64>,
        outbox: Outbox,
        settings: PollSettings,
    ) -> Self {
        Self {
            chat,
            chat_ids,
            outbox,
            settings,
            cursor: 0,
            consecutive_errors: 0,
        }
    }

    /// Next update id to request
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// One poll cycle. Returns how many messages were queued for the radio.
    ///
    /// The cursor advances past every update seen, qualifying or not.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let updates = self
            .chat
            .get_updates(self.cursor, self.settings.timeout)
            .await?;

        let mut queued = 0;
        for update in updates {
            self.cursor = self.cursor.max(update.update_id + 1);
            if let Some(text) = self.qualifying_text(update) {
                info!("📨 Chat -> Mesh: {}", command::preview(&text));
                if self.outbox.radio(text) {
                    queued += 1;
                }
            }
        }
        Ok(queued)
    }

    fn qualifying_text(&self, update: ChatUpdate) -> Option<String> {
        let chat_id = update.chat_id?;
        let text = update.text.filter(|t| !t.trim().is_empty())?;
        if !self.chat_ids.contains(&chat_id) {
            debug!("Ignoring message from unconfigured chat {chat_id}");
            return None;
        }
        Some(text)
    }

    /// Record the outcome of a cycle and return how long to wait before the next
    pub fn next_delay(&mut self, outcome: &Result<usize>) -> Duration {
        match outcome {
            Ok(_) => {
                self.consecutive_errors = 0;
                self.settings.interval
            }
            Err(e) => {
                self.consecutive_errors += 1;
                error!("⚠️ Chat poll error: {e}");
                if self.consecutive_errors > self.settings.error_threshold {
                    self.settings.error_backoff + self.settings.interval
                } else {
                    self.settings.interval
                }
            }
        }
    }

    pub async fn run(mut self, shutdown: Shutdown) {
        info!("👂 Listening to chats: {:?}", self.chat_ids);

        while !shutdown.is_triggered() {
            let outcome = tokio::select! {
                outcome = self.poll_once() => outcome,
                _ = shutdown.wait() => break,
            };
            let delay = self.next_delay(&outcome);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.wait() => break,
            }
        }

        info!("Chat poller stopped");
    }
}
