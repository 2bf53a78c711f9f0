use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{ChatBackend, ChatUpdate};
use crate::error::{BridgeError, Result};

const API_BASE: &str = "https://api.telegram.org";

/// Per-request timeout for everything except long polls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Telegram Bot API client
#[derive(Clone)]
pub struct TelegramBot {
    client: reqwest::Client,
    token: String,
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot").finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

impl TelegramBot {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{API_BASE}/bot{token}/{method}", token = self.token)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<T> {
        // The token is part of the URL, so request errors are reported without it
        let response = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| BridgeError::Chat(format!("{method}: {}", e.without_url())))?;

        let reply: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| BridgeError::Chat(format!("{method}: {}", e.without_url())))?;

        match reply {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(BridgeError::Chat(format!(
                "{method}: {}",
                description.unwrap_or_else(|| "request rejected".to_string())
            ))),
        }
    }
}

#[async_trait]
impl ChatBackend for TelegramBot {
    async fn get_updates(&self, cursor: i64, timeout: Duration) -> Result<Vec<ChatUpdate>> {
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                json!({
                    "offset": cursor,
                    "timeout": timeout.as_secs(),
                    "allowed_updates": ["message"],
                }),
                timeout + REQUEST_TIMEOUT,
            )
            .await?;

        debug!("getUpdates returned {} updates", updates.len());

        Ok(updates
            .into_iter()
            .map(|u| ChatUpdate {
                update_id: u.update_id,
                chat_id: u.message.as_ref().map(|m| m.chat.id),
                text: u.message.and_then(|m| m.text),
            })
            .collect())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                json!({
                    "chat_id": chat_id,
                    "text": text,
                    "parse_mode": "HTML",
                }),
                REQUEST_TIMEOUT,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_without_message_parses() -> anyhow::Result<()> {
        let raw = r#"{"ok":true,"result":[
            {"update_id":7,"message":{"chat":{"id":42},"text":"hi"}},
            {"update_id":8,"edited_message":{}}
        ]}"#;
        let reply: ApiResponse<Vec<Update>> = serde_json::from_str(raw)?;
        let updates = reply.result.unwrap_or_default();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].message.as_ref().map(|m| m.chat.id), Some(42));
        assert!(updates[1].message.is_none());
        Ok(())
    }
}
