//! Scripted fakes for the radio, the chat service and the providers

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::chat::{ChatBackend, ChatUpdate};
use crate::command::{CommandRouter, Providers};
use crate::error::{BridgeError, ProviderError, Result};
use crate::event::EventSink;
use crate::frame::FrameCodec;
use crate::nodes::NodeDirectory;
use crate::provider::{Assistant, Direction, ProviderResult, Translator, WeatherProvider, WeatherReport};
use crate::transport::{RadioConnector, RadioLink};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct RadioState {
    attempts: u32,
    sent: Vec<(Instant, String)>,
    failing_sends: u32,
    closed: u32,
    sink: Option<EventSink>,
}

/// What the fake radio saw, shared between the test and the fake
#[derive(Debug, Clone, Default)]
pub struct RadioLog {
    inner: Arc<Mutex<RadioState>>,
}

impl RadioLog {
    pub fn attempts(&self) -> u32 {
        lock(&self.inner).attempts
    }

    pub fn sent(&self) -> Vec<(Instant, String)> {
        lock(&self.inner).sent.clone()
    }

    pub fn texts(&self) -> Vec<String> {
        lock(&self.inner).sent.iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn closed(&self) -> u32 {
        lock(&self.inner).closed
    }

    pub fn sink(&self) -> Option<EventSink> {
        lock(&self.inner).sink.clone()
    }

    /// Make the next `n` sends fail
    pub fn fail_sends(&self, n: u32) {
        lock(&self.inner).failing_sends = n;
    }

    /// Wait until the bridge has connected and handed over its sink
    pub async fn wait_for_sink(&self) -> EventSink {
        loop {
            if let Some(sink) = self.sink() {
                return sink;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Refuses the first `failures` connection attempts
pub struct ScriptedConnector {
    failures: u32,
    log: RadioLog,
    nodes: NodeDirectory,
}

impl ScriptedConnector {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            log: RadioLog::default(),
            nodes: NodeDirectory::new(),
        }
    }

    pub fn log(&self) -> RadioLog {
        self.log.clone()
    }
}

#[async_trait]
impl RadioConnector for ScriptedConnector {
    type Link = RecordingLink;

    async fn connect(&self, host: &str, sink: EventSink) -> Result<RecordingLink> {
        let mut state = lock(&self.log.inner);
        state.attempts += 1;
        if state.attempts <= self.failures {
            return Err(BridgeError::Transport(format!("{host} refused connection")));
        }
        state.sink = Some(sink);
        Ok(RecordingLink {
            log: self.log.clone(),
            nodes: self.nodes.clone(),
        })
    }
}

pub struct RecordingLink {
    log: RadioLog,
    nodes: NodeDirectory,
}

#[async_trait]
impl RadioLink for RecordingLink {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        let mut state = lock(&self.log.inner);
        state.sent.push((Instant::now(), text.to_string()));
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(BridgeError::Transport("no ack from radio".into()));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        lock(&self.log.inner).closed += 1;
        Ok(())
    }

    fn nodes(&self) -> NodeDirectory {
        self.nodes.clone()
    }
}

/// Chat fake: records sends, fails for one chat id, replays scripted polls.
///
/// A `None` poll entry is a failed poll. An exhausted script polls empty.
#[derive(Default)]
pub struct RecordingChat {
    failing_chat: Option<i64>,
    sent: Mutex<Vec<(i64, String)>>,
    polls: Mutex<VecDeque<Option<Vec<ChatUpdate>>>>,
    cursors: Mutex<Vec<i64>>,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, chat_id: i64) -> Self {
        self.failing_chat = Some(chat_id);
        self
    }

    pub fn with_polls(self, polls: Vec<Option<Vec<ChatUpdate>>>) -> Self {
        *lock(&self.polls) = polls.into();
        self
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        lock(&self.sent).clone()
    }

    pub fn cursors(&self) -> Vec<i64> {
        lock(&self.cursors).clone()
    }
}

#[async_trait]
impl ChatBackend for RecordingChat {
    async fn get_updates(&self, cursor: i64, _timeout: Duration) -> Result<Vec<ChatUpdate>> {
        lock(&self.cursors).push(cursor);
        match lock(&self.polls).pop_front() {
            Some(Some(updates)) => Ok(updates),
            Some(None) => Err(BridgeError::Chat("bad gateway".into())),
            None => Ok(Vec::new()),
        }
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        if self.failing_chat == Some(chat_id) {
            return Err(BridgeError::Chat(format!("chat {chat_id} not found")));
        }
        lock(&self.sent).push((chat_id, text.to_string()));
        Ok(())
    }
}

pub struct FixedWeather(pub ProviderResult<WeatherReport>);

#[async_trait]
impl WeatherProvider for FixedWeather {
    async fn current(&self, _city: &str) -> ProviderResult<WeatherReport> {
        self.0.clone()
    }
}

pub struct FixedTranslator(pub ProviderResult<String>);

#[async_trait]
impl Translator for FixedTranslator {
    async fn translate(&self, _text: &str, _direction: Direction) -> ProviderResult<String> {
        self.0.clone()
    }
}

pub struct FixedAssistant {
    answer: ProviderResult<String>,
    calls: AtomicUsize,
}

impl FixedAssistant {
    pub fn new(answer: ProviderResult<String>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Assistant for FixedAssistant {
    async fn complete(&self, _prompt: &str) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

pub fn sample_report() -> WeatherReport {
    WeatherReport {
        location: "Барнаул".to_string(),
        country: "Россия".to_string(),
        temp_c: 5.4,
        feels_like_c: 2.6,
        condition: "Пасмурно".to_string(),
        wind_kph: 18.0,
        humidity: 80,
    }
}

/// Providers that all succeed
pub fn fixed_providers() -> Providers {
    Providers {
        weather: Arc::new(FixedWeather(Ok(sample_report()))),
        translator: Arc::new(FixedTranslator(Ok("Hello".to_string()))),
        assistant: Arc::new(FixedAssistant::new(Ok("Всё хорошо".to_string()))),
    }
}

pub fn not_configured_providers() -> Providers {
    Providers {
        weather: Arc::new(FixedWeather(Err(ProviderError::NotConfigured {
            key: "WEATHERAPI_KEY",
        }))),
        translator: Arc::new(FixedTranslator(Err(ProviderError::Request(
            "timed out".into(),
        )))),
        assistant: Arc::new(FixedAssistant::new(Err(ProviderError::NotConfigured {
            key: "GITHUB_TOKEN",
        }))),
    }
}

pub fn router(providers: Providers, stage_delay: Duration) -> CommandRouter {
    CommandRouter::new(providers, FrameCodec::new(200), "Барнаул", stage_delay)
}

pub fn overrides(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(id, name)| (id.to_string(), name.to_string()))
        .collect()
}
