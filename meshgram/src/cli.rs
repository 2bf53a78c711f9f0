use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meshgram_core::BridgeConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "meshgram")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file; flags and environment override its values
    #[arg(short = 'c', long, global = true, env = "MESHGRAM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Telegram bot token
    #[arg(long, global = true, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Chat to bridge (repeat or comma-separate for several)
    #[arg(
        long = "chat-id",
        global = true,
        env = "TELEGRAM_CHAT_IDS",
        value_delimiter = ',',
        allow_negative_numbers = true
    )]
    pub chat_ids: Vec<i64>,

    /// Meshtastic node address (e.g., 192.168.1.100 or 192.168.1.100:4403)
    #[arg(short = 'm', long, global = true, env = "MESH_HOST")]
    pub mesh_host: Option<String>,

    /// Minimum gap between radio transmissions (e.g., 5s)
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    pub send_interval: Option<Duration>,

    /// Extra wait before the result of /weather and /ai
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    pub stage_delay: Option<Duration>,

    /// Pause between chat polls
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Long-poll timeout for chat updates
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    pub poll_timeout: Option<Duration>,

    /// Radio payload budget in bytes
    #[arg(long, global = true)]
    pub max_payload_bytes: Option<usize>,

    /// Connection attempts before giving up
    #[arg(long, global = true)]
    pub connect_attempts: Option<u32>,

    /// Wait between connection attempts
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    pub connect_delay: Option<Duration>,

    /// Consecutive poll failures before the poller backs off
    #[arg(long, global = true)]
    pub error_threshold: Option<u32>,

    /// Extra pause once the poll failure threshold is passed
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    pub error_backoff: Option<Duration>,

    /// WeatherAPI key for /weather
    #[arg(long, global = true, env = "WEATHERAPI_KEY", hide_env_values = true)]
    pub weather_api_key: Option<String>,

    /// GitHub token for /ai
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// City used by /weather without an argument
    #[arg(long, global = true)]
    pub default_city: Option<String>,

    /// Display name override, as ID=NAME (e.g., !a1b2c3d4=Base)
    #[arg(long = "node-name", global = true, value_parser = parse_node_name)]
    pub node_names: Vec<(String, String)>,

    /// Output in JSON format
    #[arg(short = 'j', long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Enable verbose logging (debug for the bridge only)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the bridge (default)
    Run,

    /// Print the effective configuration with secrets hidden
    Config,
}

fn parse_node_name(raw: &str) -> Result<(String, String), String> {
    let (id, name) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=NAME, got '{raw}'"))?;
    let (id, name) = (id.trim(), name.trim());
    if id.is_empty() || name.is_empty() {
        return Err(format!("expected ID=NAME, got '{raw}'"));
    }
    Ok((id.to_string(), name.to_string()))
}

impl Cli {
    /// File values first, then every flag or variable that was given
    pub fn load_config(&self) -> Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::from_json_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => BridgeConfig::default(),
        };

        if let Some(token) = &self.bot_token {
            config.bot_token = token.clone();
        }
        if !self.chat_ids.is_empty() {
            config.chat_ids = self.chat_ids.clone();
        }
        if let Some(host) = &self.mesh_host {
            config.mesh_host = host.clone();
        }
        if let Some(interval) = self.send_interval {
            config.send_interval = interval;
        }
        if let Some(delay) = self.stage_delay {
            config.stage_delay = Some(delay);
        }
        if let Some(interval) = self.poll_interval {
            config.poll_interval = interval;
        }
        if let Some(timeout) = self.poll_timeout {
            config.poll_timeout = timeout;
        }
        if let Some(bytes) = self.max_payload_bytes {
            config.max_payload_bytes = bytes;
        }
        if let Some(attempts) = self.connect_attempts {
            config.connect_attempts = attempts;
        }
        if let Some(delay) = self.connect_delay {
            config.connect_delay = delay;
        }
        if let Some(threshold) = self.error_threshold {
            config.error_threshold = threshold;
        }
        if let Some(backoff) = self.error_backoff {
            config.error_backoff = backoff;
        }
        if self.weather_api_key.is_some() {
            config.weather_api_key = self.weather_api_key.clone();
        }
        if self.github_token.is_some() {
            config.github_token = self.github_token.clone();
        }
        if let Some(city) = &self.default_city {
            config.default_city = city.clone();
        }
        config.node_names.extend(self.node_names.iter().cloned());

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() -> Result<()> {
        let cli = Cli::try_parse_from([
            "meshgram",
            "--bot-token",
            "123:abc",
            "--chat-id",
            "-1001,42",
            "--mesh-host",
            "10.0.0.5",
            "--send-interval",
            "3s",
            "--node-name",
            "!0000abcd=Base",
            "config",
        ])?;
        let config = cli.load_config()?;

        assert_eq!(cli.command, Some(Commands::Config));
        assert_eq!(config.chat_ids, vec![-1001, 42]);
        assert_eq!(config.send_interval, Duration::from_secs(3));
        assert_eq!(config.stage_delay(), Duration::from_secs(3));
        assert_eq!(
            config.node_names.get("!0000abcd").map(String::as_str),
            Some("Base")
        );
        config.validate()?;
        Ok(())
    }

    #[test]
    fn test_poll_error_flags_override_defaults() -> Result<()> {
        let cli = Cli::try_parse_from([
            "meshgram",
            "--error-threshold",
            "3",
            "--error-backoff",
            "1m",
            "-v",
        ])?;
        let config = cli.load_config()?;

        assert!(cli.verbose);
        assert_eq!(cli.command, None);
        assert_eq!(config.error_threshold, 3);
        assert_eq!(config.error_backoff, Duration::from_secs(60));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        Ok(())
    }

    #[test]
    fn test_node_name_needs_both_parts() {
        assert!(parse_node_name("!0000abcd").is_err());
        assert!(parse_node_name("=Base").is_err());
        assert_eq!(
            parse_node_name(" !0000abcd = Base "),
            Ok(("!0000abcd".to_string(), "Base".to_string()))
        );
    }
}
