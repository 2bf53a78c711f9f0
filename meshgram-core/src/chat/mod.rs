//! Chat service side of the bridge

mod telegram;

pub use telegram::TelegramBot;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// One update returned by a poll
#[derive(Debug, Clone, PartialEq)]
pub struct ChatUpdate {
    pub update_id: i64,
    /// `None` for updates that are not chat messages
    pub chat_id: Option<i64>,
    pub text: Option<String>,
}

impl ChatUpdate {
    pub fn message(update_id: i64, chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            update_id,
            chat_id: Some(chat_id),
            text: Some(text.into()),
        }
    }
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Long-poll for updates with `update_id >= cursor`
    async fn get_updates(&self, cursor: i64, timeout: Duration) -> Result<Vec<ChatUpdate>>;

    /// Deliver an HTML-formatted message to one chat
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;
}

/// Escape text for the chat service's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
