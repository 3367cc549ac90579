//! Grounding lookups: local time, weather, web search and Wikipedia
//!
//! Each lookup returns a [`FetchOutcome`]: either the fetched value or a
//! fallback value plus the reason the fetch failed. Errors never cross this
//! boundary, so the prompt assembler only ever sees data or placeholders.

pub mod cache;
pub mod geotime;
pub mod search;
pub mod weather;
pub mod wiki;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GroundingError;
use crate::intent::Intent;

pub use cache::LocationCache;
pub use geotime::{GeoTime, GeoTimeResolver, Geocoder, NominatimGeocoder, Place, TimeApiLookup, TimezoneLookup};
pub use search::{SearchBackend, SearchResults, SearchSource, TavilyClient, WebSearch};
pub use weather::WeatherFetcher;
pub use wiki::WikiLookup;

/// Placeholder for a fact that could not be fetched
pub const UNAVAILABLE: &str = "unavailable";

/// Placeholder for a location that could not be resolved
pub const UNRESOLVED: &str = "unresolved";

/// Result of one lookup, after the degrade-to-placeholder policy is applied
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome<T> {
    /// The lookup succeeded
    Fetched { value: T },
    /// The lookup failed; `value` is the fallback to show instead
    Fallback { value: T, reason: String },
}

impl<T> FetchOutcome<T> {
    pub fn fetched(value: T) -> Self {
        FetchOutcome::Fetched { value }
    }

    /// Build a fallback outcome, logging why the lookup degraded
    pub fn fallback(value: T, service: &str, err: &GroundingError) -> Self {
        warn!("{} lookup degraded to fallback: {}", service, err);
        FetchOutcome::Fallback {
            value,
            reason: err.to_string(),
        }
    }

    /// The value to use, fetched or fallback
    pub fn value(&self) -> &T {
        match self {
            FetchOutcome::Fetched { value } | FetchOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self, FetchOutcome::Fetched { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            FetchOutcome::Fetched { .. } => None,
            FetchOutcome::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Facts gathered for one turn. Rebuilt every turn, never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundingContext {
    /// Resolved address and local time (always computed)
    pub location: FetchOutcome<GeoTime>,
    /// Present only when the turn asked about weather
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<FetchOutcome<String>>,
    /// Present only when the turn asked for news or facts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<FetchOutcome<String>>,
    /// Wikipedia summary, alongside search when enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wiki: Option<FetchOutcome<String>>,
}

/// Runs the lookups a turn needs
pub struct Grounder {
    geotime: GeoTimeResolver,
    weather: WeatherFetcher,
    search: WebSearch,
    wiki: Option<WikiLookup>,
}

impl Grounder {
    pub fn new(
        geotime: GeoTimeResolver,
        weather: WeatherFetcher,
        search: WebSearch,
        wiki: Option<WikiLookup>,
    ) -> Self {
        Self {
            geotime,
            weather,
            search,
            wiki,
        }
    }

    /// Build the default HTTP-backed lookups from config
    pub fn from_config(config: &Config) -> Result<Self, GroundingError> {
        Ok(Self::new(
            GeoTimeResolver::from_config(config)?,
            WeatherFetcher::from_config(config)?,
            WebSearch::from_config(config)?,
            WikiLookup::from_config(config)?,
        ))
    }

    /// Gather grounding for a turn
    ///
    /// The lookups run concurrently and all of them finish (or time out)
    /// before this returns.
    pub async fn gather(&self, location: &str, utterance: &str, intent: &Intent) -> GroundingContext {
        let weather = async {
            if intent.needs_weather {
                Some(self.weather.fetch(location).await)
            } else {
                None
            }
        };
        let search = async {
            if intent.needs_search {
                Some(self.search.search(utterance).await)
            } else {
                None
            }
        };

        let wiki = async {
            match (&self.wiki, intent.needs_search) {
                (Some(wiki), true) => Some(wiki.lookup(utterance).await),
                _ => None,
            }
        };

        let (location, weather, search, wiki) =
            tokio::join!(self.geotime.resolve(location), weather, search, wiki);

        debug!(
            "Grounding gathered: location={}, weather={:?}, search={:?}, wiki={:?}",
            location.is_fetched(),
            weather.as_ref().map(FetchOutcome::is_fetched),
            search.as_ref().map(FetchOutcome::is_fetched),
            wiki.as_ref().map(FetchOutcome::is_fetched),
        );

        GroundingContext {
            location,
            weather,
            search,
            wiki,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_outcome_accessors() {
        let ok: FetchOutcome<String> = FetchOutcome::fetched("Tokyo: ☀️ +21°C".into());
        assert!(ok.is_fetched());
        assert_eq!(ok.value(), "Tokyo: ☀️ +21°C");
        assert!(ok.reason().is_none());

        let err = GroundingError::Fetch {
            service: "weather",
            status: 500,
        };
        let degraded = FetchOutcome::fallback(UNAVAILABLE.to_string(), "weather", &err);
        assert!(!degraded.is_fetched());
        assert_eq!(degraded.value(), UNAVAILABLE);
        assert_eq!(degraded.reason(), Some("weather returned HTTP 500"));
    }

    #[test]
    fn test_fetch_outcome_serializes_status() {
        let outcome: FetchOutcome<String> = FetchOutcome::fetched("x".into());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "fetched");
        assert_eq!(json["value"], "x");

        let outcome: FetchOutcome<String> = FetchOutcome::Fallback {
            value: String::new(),
            reason: "search API key is not configured".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "fallback");
        assert_eq!(json["reason"], "search API key is not configured");
    }
}
