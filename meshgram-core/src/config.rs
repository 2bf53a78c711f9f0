//! Bridge configuration
//!
//! Loaded from an optional JSON file, then overridden field by field by the
//! binary's command line. Durations are humantime strings such as `"5s"`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{BridgeError, Result};
use crate::transport::RetryPolicy;

pub const DEFAULT_CITY: &str = "Барнаул";

const REDACTED: &str = "<redacted>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub bot_token: String,
    pub chat_ids: Vec<i64>,
    /// `host` or `host:port`
    pub mesh_host: String,

    #[serde(with = "duration_str")]
    pub poll_interval: Duration,
    #[serde(with = "duration_str")]
    pub poll_timeout: Duration,
    pub max_payload_bytes: usize,
    #[serde(with = "duration_str")]
    pub send_interval: Duration,
    pub connect_attempts: u32,
    #[serde(with = "duration_str")]
    pub connect_delay: Duration,
    /// Consecutive poll failures tolerated before backing off
    pub error_threshold: u32,
    #[serde(with = "duration_str")]
    pub error_backoff: Duration,
    /// Wait before the second message of two-stage commands.
    /// Falls back to `send_interval`.
    #[serde(with = "opt_duration_str", skip_serializing_if = "Option::is_none")]
    pub stage_delay: Option<Duration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    pub default_city: String,
    /// `!xxxxxxxx` -> display name
    pub node_names: HashMap<String, String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_ids: Vec::new(),
            mesh_host: String::new(),
            poll_interval: Duration::from_millis(500),
            poll_timeout: Duration::from_secs(30),
            max_payload_bytes: 200,
            send_interval: Duration::from_secs(5),
            connect_attempts: 5,
            connect_delay: Duration::from_secs(5),
            error_threshold: 10,
            error_backoff: Duration::from_secs(30),
            stage_delay: None,
            weather_api_key: None,
            github_token: None,
            default_city: DEFAULT_CITY.to_string(),
            node_names: HashMap::new(),
        }
    }
}

impl BridgeConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
            .map_err(|e| BridgeError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_json(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            return Err(BridgeError::Config("bot token is required".into()));
        }
        if self.chat_ids.is_empty() {
            return Err(BridgeError::Config(
                "at least one chat id is required".into(),
            ));
        }
        if self.mesh_host.trim().is_empty() {
            return Err(BridgeError::Config("mesh host is required".into()));
        }
        if self.max_payload_bytes < 3 {
            return Err(BridgeError::Config(format!(
                "max payload bytes must be at least 3, got {}",
                self.max_payload_bytes
            )));
        }
        if self.send_interval.is_zero() {
            return Err(BridgeError::Config("send interval must be non-zero".into()));
        }
        if self.connect_attempts == 0 {
            return Err(BridgeError::Config(
                "at least one connect attempt is required".into(),
            ));
        }
        Ok(())
    }

    pub fn stage_delay(&self) -> Duration {
        self.stage_delay.unwrap_or(self.send_interval)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.connect_attempts,
            delay: self.connect_delay,
        }
    }

    /// Copy with credentials replaced, for display
    pub fn redacted(&self) -> Self {
        let hide = |secret: &Option<String>| secret.as_ref().map(|_| REDACTED.to_string());
        Self {
            bot_token: if self.bot_token.is_empty() {
                String::new()
            } else {
                REDACTED.to_string()
            },
            weather_api_key: hide(&self.weather_api_key),
            github_token: hide(&self.github_token),
            ..self.clone()
        }
    }
}

mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

mod opt_duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.collect_str(&humantime::format_duration(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| humantime::parse_duration(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}
