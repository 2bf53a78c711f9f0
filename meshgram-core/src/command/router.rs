use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::replies;
use super::{Command, CommandInvocation};
use crate::error::ProviderError;
use crate::event::{InboundRadioEvent, OutboundMessage, Outbox};
use crate::frame::FrameCodec;
use crate::provider::{Assistant, Direction, Translator, WeatherProvider};

/// Content providers the router calls into
#[derive(Clone)]
pub struct Providers {
    pub weather: Arc<dyn WeatherProvider>,
    pub translator: Arc<dyn Translator>,
    pub assistant: Arc<dyn Assistant>,
}

/// Turns command invocations into radio replies.
///
/// Replies go through the [`Outbox`], never straight to the radio, so every
/// transmission passes the bridge's throttle.
pub struct CommandRouter {
    providers: Providers,
    codec: FrameCodec,
    default_city: String,
    /// Extra wait before the second message of `/weather` and `/ai`
    stage_delay: Duration,
}

impl CommandRouter {
    pub fn new(
        providers: Providers,
        codec: FrameCodec,
        default_city: impl Into<String>,
        stage_delay: Duration,
    ) -> Self {
        Self {
            providers,
            codec,
            default_city: default_city.into(),
            stage_delay,
        }
    }

    pub async fn dispatch(
        &self,
        invocation: &CommandInvocation,
        sender_name: &str,
        event: &InboundRadioEvent,
        outbox: &Outbox,
    ) {
        let args = invocation.args.as_str();
        debug!("{} from {sender_name}", invocation.command.prefix());

        let queued = match invocation.command {
            Command::Test => outbox.radio(replies::signal_test(sender_name, event)),
            Command::Happy => outbox.radio(replies::joke()),
            Command::Time => outbox.radio(replies::time(&chrono::Local::now())),
            Command::Calc => outbox.radio(replies::calculate(args)),
            Command::Translate => outbox.radio(self.translate(args).await),
            Command::Weather => self.weather(args, sender_name, outbox).await,
            Command::Ai => self.ask(args, sender_name, outbox).await,
            Command::Help => outbox.radio(replies::HELP),
        };

        if !queued {
            debug!("Bridge stopped before the reply to {sender_name} was queued");
        }
    }

    async fn translate(&self, text: &str) -> String {
        if text.is_empty() {
            return replies::TRANSLATE_USAGE.to_string();
        }

        let direction = Direction::detect(text);
        match self.providers.translator.translate(text, direction).await {
            Ok(translated) => replies::translation(direction, &translated),
            Err(e) => {
                warn!("Translate error: {e}");
                replies::TRANSLATE_FAILED.to_string()
            }
        }
    }

    async fn weather(&self, args: &str, sender_name: &str, outbox: &Outbox) -> bool {
        let city = if args.is_empty() {
            self.default_city.as_str()
        } else {
            args
        };
        info!("Weather request from {sender_name}: {city}");

        outbox.radio(replies::weather_searching(city));

        let reply = match self.providers.weather.current(city).await {
            Ok(report) => replies::weather(&report),
            Err(e) => {
                warn!("Weather error: {e}");
                replies::weather_error(city, &e)
            }
        };

        outbox.submit(OutboundMessage::radio(reply).after(self.stage_delay))
    }

    async fn ask(&self, prompt: &str, sender_name: &str, outbox: &Outbox) -> bool {
        if prompt.is_empty() {
            return outbox.radio(replies::AI_USAGE);
        }
        info!(
            "AI request from {sender_name}: {preview}",
            preview = preview(prompt)
        );

        outbox.radio(replies::AI_THINKING);

        let answer = match self.providers.assistant.complete(prompt).await {
            Ok(answer) => self.codec.truncate(&replies::sanitize_answer(&answer)),
            Err(ProviderError::NotConfigured { key }) => replies::not_configured(key),
            Err(e) => {
                warn!("AI error: {e}");
                replies::AI_FAILED.to_string()
            }
        };

        outbox.submit(OutboundMessage::radio(format!("🤖 {answer}")).after(self.stage_delay))
    }
}

/// First 30 characters, for log lines
pub(crate) fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(30).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
