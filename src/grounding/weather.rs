//! Weather fetcher
//!
//! One-line current conditions from a wttr.in-style text endpoint
//! (`{base}/{location}?format=3`). No retries; anything but a non-empty 200
//! degrades to the `unavailable` placeholder.

use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::geotime::USER_AGENT;
use super::{FetchOutcome, LocationCache, UNAVAILABLE};
use crate::config::Config;
use crate::error::GroundingError;

/// Location string that wttr.in itself returns for unknown places
const UNKNOWN_LOCATION: &str = "unknown location";

pub struct WeatherFetcher {
    http: Client,
    base_url: String,
    cache: LocationCache<String>,
}

impl WeatherFetcher {
    pub fn new(http: Client, base_url: &str, cache: LocationCache<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, GroundingError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.weather_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self::new(
            http,
            &config.weather_url,
            LocationCache::new(config.cache_ttl_secs),
        ))
    }

    /// Current conditions for a location, or the placeholder
    pub async fn fetch(&self, location: &str) -> FetchOutcome<String> {
        match self.fetch_line(location).await {
            Ok(line) => FetchOutcome::fetched(line),
            Err(e) => FetchOutcome::fallback(UNAVAILABLE.to_string(), "weather", &e),
        }
    }

    async fn fetch_line(&self, location: &str) -> Result<String, GroundingError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(GroundingError::Resolution("no location set".into()));
        }

        if let Some(line) = self.cache.get(location) {
            return Ok(line);
        }

        let url = format!("{}/{}", self.base_url, urlencoding::encode(location));
        debug!("Fetching weather: {}", url);

        let response = self
            .http
            .get(&url)
            .query(&[("format", "3")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GroundingError::Fetch {
                service: "weather",
                status: response.status().as_u16(),
            });
        }

        let line = response.text().await?.trim().to_string();
        if line.is_empty() {
            return Err(GroundingError::Decode {
                service: "weather",
                detail: "empty body".into(),
            });
        }
        if line.to_lowercase().starts_with(UNKNOWN_LOCATION) {
            return Err(GroundingError::Resolution(location.to_string()));
        }

        self.cache.insert(location, line.clone());
        Ok(line)
    }
}
