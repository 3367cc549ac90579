//! Shared fixtures: local stub servers and a scripted model provider

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use zesty::chat::{ChatEngine, ChatEvent, EngineSettings};
use zesty::error::{GroundingError, ProviderError};
use zesty::grounding::{
    Geocoder, GeoTimeResolver, Grounder, LocationCache, Place, SearchBackend, SearchResults,
    SearchSource, TimezoneLookup, WeatherFetcher, WebSearch,
};
use zesty::prompt::MentionPolicy;
use zesty::provider::{ChatRequest, Provider, StreamEvent};

/// Serve a router on an ephemeral loopback port, returning its base URL
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Loopback address with nothing listening
pub const DEAD_URL: &str = "http://127.0.0.1:9";

// ============================================================================
// Model provider
// ============================================================================

/// Replays a fixed event script and records every request
pub struct ScriptedProvider {
    script: Vec<StreamEvent>,
    open_error: Option<u16>,
    stall: bool,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<StreamEvent>) -> Arc<Self> {
        Arc::new(Self {
            script,
            open_error: None,
            stall: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Sends the script, then keeps the stream open without another event
    pub fn stalling(script: Vec<StreamEvent>) -> Arc<Self> {
        Arc::new(Self {
            script,
            open_error: None,
            stall: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Replies with `text` split into word chunks
    pub fn replying(text: &str) -> Arc<Self> {
        let mut script: Vec<StreamEvent> = text
            .split_inclusive(' ')
            .map(|w| StreamEvent::TextDelta(w.to_string()))
            .collect();
        script.push(StreamEvent::Done);
        Self::new(script)
    }

    /// Fails to open with the given HTTP status
    pub fn refusing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            script: vec![],
            open_error: Some(status),
            stall: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn last_request(&self) -> ChatRequest {
        self.requests.lock().unwrap().last().cloned().expect("no request recorded")
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn create_stream(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<StreamEvent>, ProviderError> {
        self.requests.lock().unwrap().push(request);

        if let Some(status) = self.open_error {
            return Err(ProviderError::Api {
                status,
                body: "rate limited".into(),
            });
        }

        let (tx, rx) = mpsc::channel(self.script.len().max(1));
        for event in &self.script {
            tx.send(event.clone()).await.unwrap();
        }
        if self.stall {
            tokio::spawn(async move {
                let _open = tx;
                std::future::pending::<()>().await;
            });
        }
        Ok(rx)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

// ============================================================================
// Grounding fakes
// ============================================================================

/// In-process geocoder over a fixed table
pub struct TableGeocoder {
    places: HashMap<String, (f64, f64, String)>,
    pub calls: Mutex<Vec<String>>,
}

impl TableGeocoder {
    pub fn world() -> Arc<Self> {
        let places = [
            ("tokyo", (35.6812, 139.7671, "Tokyo, Japan")),
            ("lisbon", (38.7223, -9.1393, "Lisboa, Portugal")),
        ]
        .into_iter()
        .map(|(k, (lat, lon, addr))| (k.to_string(), (lat, lon, addr.to_string())))
        .collect();

        Arc::new(Self {
            places,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Geocoder for TableGeocoder {
    async fn geocode(&self, location: &str) -> Result<Place, GroundingError> {
        self.calls.lock().unwrap().push(location.to_string());
        self.places
            .get(&location.to_lowercase())
            .map(|(lat, lon, address)| Place {
                latitude: *lat,
                longitude: *lon,
                address: address.clone(),
            })
            .ok_or_else(|| GroundingError::Resolution(location.to_string()))
    }
}

/// Timezone by longitude band, enough for the table above
pub struct BandZones;

#[async_trait]
impl TimezoneLookup for BandZones {
    async fn timezone(&self, _latitude: f64, longitude: f64) -> Result<String, GroundingError> {
        Ok(if longitude > 100.0 { "Asia/Tokyo" } else { "Europe/Lisbon" }.to_string())
    }
}

/// Search backend with a canned answer that records queries
pub struct CannedSearch {
    pub queries: Mutex<Vec<String>>,
}

impl CannedSearch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queries: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SearchBackend for CannedSearch {
    async fn search(&self, query: &str) -> Result<SearchResults, GroundingError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(SearchResults {
            answer: Some("X announced a new release this week.".into()),
            sources: vec![SearchSource {
                title: "X ships 2.0".into(),
                url: "https://news.example.com/x".into(),
                snippet: "The long-awaited update landed on Monday.".into(),
                domain: Some("news.example.com".into()),
                relevance_score: Some(0.92),
            }],
        })
    }

    fn provider_name(&self) -> &str {
        "canned"
    }
}

/// A grounder over the in-process fakes and a weather endpoint
pub fn grounder(geocoder: Arc<TableGeocoder>, weather_url: &str, search: WebSearch) -> Grounder {
    Grounder::new(
        GeoTimeResolver::new(geocoder, Arc::new(BandZones), LocationCache::new(300), chrono_tz::UTC),
        WeatherFetcher::new(reqwest::Client::new(), weather_url, LocationCache::new(300)),
        search,
        None,
    )
}

pub fn settings() -> EngineSettings {
    EngineSettings {
        model: "llama-3.1-8b-instant".into(),
        temperature: 0.8,
        max_tokens: None,
        mention_policy: MentionPolicy::OnlyWhenAsked,
        idle_timeout: Duration::from_secs(30),
    }
}

pub fn engine(provider: Arc<ScriptedProvider>, grounder: Grounder) -> ChatEngine {
    ChatEngine::new(provider, Arc::new(grounder), settings())
}

/// Drain every event from a finished turn
pub fn drain(rx: &mut mpsc::Receiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
