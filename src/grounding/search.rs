//! Web search grounding
//!
//! The raw utterance is sent as the query. Results are flattened into a short
//! text block: the provider's answer line (if any) followed by numbered
//! sources. No key or any failure yields an empty string, which the prompt
//! assembler renders as `unavailable`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::FetchOutcome;
use super::geotime::USER_AGENT;
use crate::config::Config;
use crate::error::GroundingError;

/// Snippets longer than this are cut at a char boundary
pub(crate) const MAX_SNIPPET_CHARS: usize = 300;

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSource {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub domain: Option<String>,
    pub relevance_score: Option<f64>,
}

/// Provider-neutral search result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub answer: Option<String>,
    pub sources: Vec<SearchSource>,
}

impl SearchResults {
    /// Flatten into the text block injected into the system instruction
    pub fn summarize(&self) -> String {
        let mut lines = Vec::new();

        if let Some(answer) = self.answer.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            lines.push(format!("Answer: {}", answer));
        }

        for (i, source) in self.sources.iter().enumerate() {
            lines.push(format!(
                "{}. {}: {} ({})",
                i + 1,
                source.title.trim(),
                truncate_chars(source.snippet.trim(), MAX_SNIPPET_CHARS),
                source.url
            ));
        }

        lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.answer.as_deref().is_none_or(|a| a.trim().is_empty())
    }
}

/// A web search provider
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchResults, GroundingError>;
    fn provider_name(&self) -> &str;
}

// ============================================================================
// Tavily
// ============================================================================

#[derive(Debug, Serialize)]
struct TavilySearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'static str,
    max_results: usize,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilySearchResponse {
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f64>,
}

/// Tavily search client, built for LLM grounding
pub struct TavilyClient {
    api_key: String,
    http: Client,
    base_url: String,
    max_results: usize,
}

impl TavilyClient {
    pub fn new(api_key: String, http: Client, base_url: &str, max_results: usize) -> Self {
        Self {
            api_key,
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_results,
        }
    }
}

#[async_trait]
impl SearchBackend for TavilyClient {
    async fn search(&self, query: &str) -> Result<SearchResults, GroundingError> {
        let request = TavilySearchRequest {
            api_key: &self.api_key,
            query,
            search_depth: "basic",
            max_results: self.max_results,
            include_answer: true,
        };

        debug!("Tavily search: {}", query);

        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GroundingError::Fetch {
                service: "search",
                status: response.status().as_u16(),
            });
        }

        let tavily: TavilySearchResponse = response.json().await?;

        let sources = tavily
            .results
            .into_iter()
            .take(self.max_results)
            .map(|r| SearchSource {
                domain: extract_domain(&r.url),
                title: r.title,
                url: r.url,
                snippet: r.content,
                relevance_score: r.score,
            })
            .collect();

        Ok(SearchResults {
            answer: tavily.answer,
            sources,
        })
    }

    fn provider_name(&self) -> &str {
        "Tavily"
    }
}

// ============================================================================
// Facade
// ============================================================================

/// Search grounding; disabled when no backend is configured
pub struct WebSearch {
    backend: Option<Arc<dyn SearchBackend>>,
}

impl WebSearch {
    pub fn new(backend: Option<Arc<dyn SearchBackend>>) -> Self {
        Self { backend }
    }

    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub fn from_config(config: &Config) -> Result<Self, GroundingError> {
        let Some(api_key) = config.tavily_api_key.clone().filter(|_| config.search_enabled()) else {
            debug!("TAVILY_API_KEY not set, web search disabled");
            return Ok(Self::disabled());
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(config.search_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self::new(Some(Arc::new(TavilyClient::new(
            api_key.trim().to_string(),
            http,
            &config.search_url,
            config.search_max_results,
        )))))
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Search with the utterance verbatim as the query
    pub async fn search(&self, utterance: &str) -> FetchOutcome<String> {
        let Some(backend) = &self.backend else {
            return FetchOutcome::Fallback {
                value: String::new(),
                reason: GroundingError::NotConfigured("search API key").to_string(),
            };
        };

        match backend.search(utterance).await {
            Ok(results) if results.is_empty() => {
                let err = GroundingError::Decode {
                    service: "search",
                    detail: "no results".into(),
                };
                FetchOutcome::fallback(String::new(), backend.provider_name(), &err)
            }
            Ok(results) => FetchOutcome::fetched(results.summarize()),
            Err(e) => FetchOutcome::fallback(String::new(), backend.provider_name(), &e),
        }
    }
}

fn extract_domain(url: &str) -> Option<String> {
    url.split("://")
        .nth(1)
        .and_then(|s| s.split('/').next())
        .map(|s| s.to_string())
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingBackend {
        queries: Mutex<Vec<String>>,
        result: Result<SearchResults, u16>,
    }

    #[async_trait]
    impl SearchBackend for RecordingBackend {
        async fn search(&self, query: &str) -> Result<SearchResults, GroundingError> {
            self.queries.lock().unwrap().push(query.to_string());
            self.result.clone().map_err(|status| GroundingError::Fetch {
                service: "search",
                status,
            })
        }

        fn provider_name(&self) -> &str {
            "recording"
        }
    }

    fn sample_results() -> SearchResults {
        SearchResults {
            answer: Some("X shipped version 2.".into()),
            sources: vec![
                SearchSource {
                    title: "X 2.0 released".into(),
                    url: "https://news.example.com/x2".into(),
                    snippet: "The team behind X announced...".into(),
                    domain: Some("news.example.com".into()),
                    relevance_score: Some(0.9),
                },
                SearchSource {
                    title: "Hands-on with X".into(),
                    url: "https://blog.example.org/x".into(),
                    snippet: "We tried it.".into(),
                    domain: Some("blog.example.org".into()),
                    relevance_score: None,
                },
            ],
        }
    }

    #[test]
    fn test_summarize() {
        let text = sample_results().summarize();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Answer: X shipped version 2.");
        assert_eq!(
            lines[1],
            "1. X 2.0 released: The team behind X announced... (https://news.example.com/x2)"
        );
        assert!(lines[2].starts_with("2. Hands-on with X"));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo", 2), "hé...");
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://www.rust-lang.org/learn").as_deref(),
            Some("www.rust-lang.org")
        );
        assert_eq!(extract_domain("not a url"), None);
    }

    #[tokio::test]
    async fn test_disabled_returns_empty() {
        let search = WebSearch::disabled();
        let outcome = search.search("latest news").await;
        assert!(!outcome.is_fetched());
        assert_eq!(outcome.value(), "");
        assert_eq!(outcome.reason(), Some("search API key is not configured"));
    }

    #[tokio::test]
    async fn test_query_sent_verbatim() {
        let backend = Arc::new(RecordingBackend {
            queries: Mutex::new(Vec::new()),
            result: Ok(sample_results()),
        });
        let search = WebSearch::new(Some(backend.clone()));

        let outcome = search.search("what's the latest news on X").await;
        assert!(outcome.is_fetched());
        assert!(outcome.value().contains("X 2.0 released"));
        assert_eq!(
            backend.queries.lock().unwrap().as_slice(),
            ["what's the latest news on X"]
        );
    }

    #[tokio::test]
    async fn test_failure_returns_empty() {
        let backend = Arc::new(RecordingBackend {
            queries: Mutex::new(Vec::new()),
            result: Err(502),
        });
        let outcome = WebSearch::new(Some(backend)).search("bitcoin price").await;
        assert!(!outcome.is_fetched());
        assert_eq!(outcome.value(), "");
        assert_eq!(outcome.reason(), Some("search returned HTTP 502"));
    }

    #[test]
    fn test_from_config_without_key_is_disabled() {
        let config = Config::default();
        let search = WebSearch::from_config(&config).unwrap();
        assert!(!search.is_enabled());
    }
}
