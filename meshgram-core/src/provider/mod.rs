//! Content providers used by the command router
//!
//! Each provider is a single request/response call. Failures come back as
//! [`ProviderError`] and are turned into fixed user-facing text by the
//! router; nothing is retried or cached.

mod assistant;
mod translate;
mod weather;

pub use assistant::GithubModels;
pub use translate::GoogleTranslate;
pub use weather::WeatherApi;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ProviderError;

/// Timeout applied to every provider request
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Current conditions for a city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub location: String,
    pub country: String,
    pub temp_c: f64,
    pub feels_like_c: f64,
    pub condition: String,
    pub wind_kph: f64,
    pub humidity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    RussianToEnglish,
    EnglishToRussian,
}

impl Direction {
    /// Cyrillic anywhere in the text means it is Russian
    pub fn detect(text: &str) -> Self {
        if text.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c)) {
            Direction::RussianToEnglish
        } else {
            Direction::EnglishToRussian
        }
    }

    /// Source and target language codes
    pub fn languages(self) -> (&'static str, &'static str) {
        match self {
            Direction::RussianToEnglish => ("ru", "en"),
            Direction::EnglishToRussian => ("en", "ru"),
        }
    }

    pub fn flags(self) -> &'static str {
        match self {
            Direction::RussianToEnglish => "🇷🇺 → 🇬🇧",
            Direction::EnglishToRussian => "🇬🇧 → 🇷🇺",
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, city: &str) -> ProviderResult<WeatherReport>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, direction: Direction) -> ProviderResult<String>;
}

/// Short free-form answers to a prompt
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn complete(&self, prompt: &str) -> ProviderResult<String>;
}
