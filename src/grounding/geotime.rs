//! Geo-time resolver
//!
//! Location name → coordinates (geocoder) → IANA timezone (timezone lookup)
//! → current local time in that zone.
//!
//! The cache stores only `(address, timezone)`. Local time is recomputed
//! from "now" on every call, so a cache hit still returns the current time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{FetchOutcome, LocationCache, UNRESOLVED};
use crate::config::Config;
use crate::error::GroundingError;

/// 12-hour clock with weekday, e.g. "03:07 PM, Tuesday"
pub const LOCAL_TIME_FORMAT: &str = "%I:%M %p, %A";

pub(crate) const USER_AGENT: &str = concat!("zesty/", env!("CARGO_PKG_VERSION"));

/// A geocoded place
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

/// Resolved address and local time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoTime {
    pub address: String,
    pub timezone: String,
    pub local_time: String,
}

/// Name → coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, location: &str) -> Result<Place, GroundingError>;
}

/// Coordinates → IANA timezone id
#[async_trait]
pub trait TimezoneLookup: Send + Sync {
    async fn timezone(&self, latitude: f64, longitude: f64) -> Result<String, GroundingError>;
}

/// Format `now` as local time in `tz`
pub fn format_local_time(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format(LOCAL_TIME_FORMAT).to_string()
}

// ============================================================================
// Resolver
// ============================================================================

pub struct GeoTimeResolver {
    geocoder: Arc<dyn Geocoder>,
    timezones: Arc<dyn TimezoneLookup>,
    cache: LocationCache<(String, Tz)>,
    fallback_tz: Tz,
}

impl GeoTimeResolver {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        timezones: Arc<dyn TimezoneLookup>,
        cache: LocationCache<(String, Tz)>,
        fallback_tz: Tz,
    ) -> Self {
        Self {
            geocoder,
            timezones,
            cache,
            fallback_tz,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, GroundingError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.geocode_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self::new(
            Arc::new(NominatimGeocoder::new(http.clone(), &config.geocode_url)),
            Arc::new(TimeApiLookup::new(http, &config.timezone_url)),
            LocationCache::new(config.cache_ttl_secs),
            config.fallback_tz(),
        ))
    }

    /// Resolve a location to its address and current local time
    pub async fn resolve(&self, location: &str) -> FetchOutcome<GeoTime> {
        self.resolve_at(location, Utc::now()).await
    }

    /// Resolve against an explicit "now"
    pub async fn resolve_at(&self, location: &str, now: DateTime<Utc>) -> FetchOutcome<GeoTime> {
        match self.lookup(location).await {
            Ok((address, tz)) => FetchOutcome::fetched(GeoTime {
                address,
                timezone: tz.name().to_string(),
                local_time: format_local_time(now, tz),
            }),
            Err(e) => {
                let fallback = self.fallback_pair(location, now);
                FetchOutcome::fallback(fallback, "geo-time", &e)
            }
        }
    }

    async fn lookup(&self, location: &str) -> Result<(String, Tz), GroundingError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(GroundingError::Resolution("no location set".into()));
        }

        if let Some(hit) = self.cache.get(location) {
            return Ok(hit);
        }

        let place = self.geocoder.geocode(location).await?;
        let tz_id = self.timezones.timezone(place.latitude, place.longitude).await?;
        let tz: Tz = tz_id
            .parse()
            .map_err(|_| GroundingError::Resolution(format!("unknown timezone '{}'", tz_id)))?;

        debug!("Resolved '{}' to {} ({})", location, place.address, tz.name());
        self.cache.insert(location, (place.address.clone(), tz));
        Ok((place.address, tz))
    }

    fn fallback_pair(&self, location: &str, now: DateTime<Utc>) -> GeoTime {
        let tz = self.fallback_tz;
        let name = location.trim();
        let address = if name.is_empty() {
            format!("{} (showing {})", UNRESOLVED, tz.name())
        } else {
            format!("{} ({}; showing {})", name, UNRESOLVED, tz.name())
        };

        GeoTime {
            address,
            timezone: tz.name().to_string(),
            local_time: format_local_time(now, tz),
        }
    }
}

// ============================================================================
// Nominatim geocoder
// ============================================================================

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

/// OpenStreetMap Nominatim search API
pub struct NominatimGeocoder {
    http: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, location: &str) -> Result<Place, GroundingError> {
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("q", location), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GroundingError::Fetch {
                service: "geocoder",
                status: response.status().as_u16(),
            });
        }

        let places: Vec<NominatimPlace> = response.json().await?;
        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| GroundingError::Resolution(location.to_string()))?;

        let parse = |raw: &str| {
            raw.parse::<f64>().map_err(|_| GroundingError::Decode {
                service: "geocoder",
                detail: format!("bad coordinate '{}'", raw),
            })
        };

        Ok(Place {
            latitude: parse(&place.lat)?,
            longitude: parse(&place.lon)?,
            address: place.display_name,
        })
    }
}

// ============================================================================
// timeapi.io timezone lookup
// ============================================================================

#[derive(Debug, Deserialize)]
struct CoordinateZone {
    #[serde(rename = "timeZone")]
    time_zone: Option<String>,
}

/// timeapi.io coordinate → timezone endpoint
pub struct TimeApiLookup {
    http: Client,
    base_url: String,
}

impl TimeApiLookup {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TimezoneLookup for TimeApiLookup {
    async fn timezone(&self, latitude: f64, longitude: f64) -> Result<String, GroundingError> {
        let response = self
            .http
            .get(format!("{}/api/timezone/coordinate", self.base_url))
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GroundingError::Fetch {
                service: "timezone lookup",
                status: response.status().as_u16(),
            });
        }

        let zone: CoordinateZone = response.json().await?;
        zone.time_zone
            .filter(|z| !z.is_empty())
            .ok_or_else(|| GroundingError::Resolution(format!("no timezone at {latitude},{longitude}")))
    }
}
