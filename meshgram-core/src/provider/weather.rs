use async_trait::async_trait;
use serde::Deserialize;

use super::{PROVIDER_TIMEOUT, ProviderResult, WeatherProvider, WeatherReport};
use crate::error::ProviderError;

const ENDPOINT: &str = "http://api.weatherapi.com/v1/current.json";

/// weatherapi.com current-conditions lookup, answers in Russian
#[derive(Debug, Clone)]
pub struct WeatherApi {
    client: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    location: Option<Location>,
    current: Option<Current>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Location {
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct Current {
    temp_c: f64,
    feelslike_c: f64,
    wind_kph: f64,
    humidity: u32,
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct Condition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl WeatherApi {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl WeatherProvider for WeatherApi {
    async fn current(&self, city: &str) -> ProviderResult<WeatherReport> {
        let key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured {
            key: "WEATHERAPI_KEY",
        })?;

        // weatherapi reports unknown cities with a 400 and an error body
        let body: CurrentResponse = self
            .client
            .get(ENDPOINT)
            .query(&[("key", key), ("q", city), ("lang", "ru")])
            .timeout(PROVIDER_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.without_url().to_string()))?
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.without_url().to_string()))?;

        if let Some(error) = body.error {
            return Err(ProviderError::NotFound(error.message));
        }

        match (body.location, body.current) {
            (Some(location), Some(current)) => Ok(WeatherReport {
                location: location.name,
                country: location.country,
                temp_c: current.temp_c,
                feels_like_c: current.feelslike_c,
                condition: current.condition.text,
                wind_kph: current.wind_kph,
                humidity: current.humidity,
            }),
            _ => Err(ProviderError::Malformed(
                "missing location or current conditions".to_string(),
            )),
        }
    }
}
