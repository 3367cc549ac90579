//! Wikipedia lookup
//!
//! Finds the best-matching article for the utterance through the MediaWiki
//! REST search (`{base}/w/rest.php/v1/search/page`) and returns its lead
//! summary from `{base}/api/rest_v1/page/summary/{key}`. Degrades to an empty
//! string, like web search.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::FetchOutcome;
use super::geotime::USER_AGENT;
use super::search::{MAX_SNIPPET_CHARS, truncate_chars};
use crate::config::Config;
use crate::error::GroundingError;

#[derive(Debug, Deserialize)]
struct PageSearch {
    #[serde(default)]
    pages: Vec<PageHit>,
}

#[derive(Debug, Deserialize)]
struct PageHit {
    key: String,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: PageUrl,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: String,
}

/// Wikipedia article summaries for fact questions
pub struct WikiLookup {
    http: Client,
    base_url: String,
}

impl WikiLookup {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `None` when Wikipedia grounding is switched off
    pub fn from_config(config: &Config) -> Result<Option<Self>, GroundingError> {
        if !config.wiki_enabled {
            debug!("Wikipedia lookup disabled");
            return Ok(None);
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.wiki_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Some(Self::new(http, &config.wiki_url)))
    }

    /// Summary of the best article for the utterance, or an empty fallback
    pub async fn lookup(&self, utterance: &str) -> FetchOutcome<String> {
        match self.summary(utterance).await {
            Ok(text) => FetchOutcome::fetched(text),
            Err(e) => FetchOutcome::fallback(String::new(), "wikipedia", &e),
        }
    }

    async fn summary(&self, utterance: &str) -> Result<String, GroundingError> {
        let query = utterance.trim();
        let response = self
            .http
            .get(format!("{}/w/rest.php/v1/search/page", self.base_url))
            .query(&[("q", query), ("limit", "1")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GroundingError::Fetch {
                service: "wikipedia",
                status: response.status().as_u16(),
            });
        }

        let search: PageSearch = response.json().await?;
        let key = search
            .pages
            .into_iter()
            .next()
            .map(|hit| hit.key)
            .ok_or_else(|| GroundingError::Decode {
                service: "wikipedia",
                detail: "no matching article".into(),
            })?;

        debug!("Wikipedia article for '{}': {}", query, key);

        let response = self
            .http
            .get(format!(
                "{}/api/rest_v1/page/summary/{}",
                self.base_url,
                urlencoding::encode(&key)
            ))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GroundingError::Fetch {
                service: "wikipedia",
                status: response.status().as_u16(),
            });
        }

        let page: PageSummary = response.json().await?;
        let extract = page.extract.trim();
        if extract.is_empty() {
            return Err(GroundingError::Decode {
                service: "wikipedia",
                detail: format!("article '{}' has no summary", page.title),
            });
        }

        let extract = truncate_chars(extract, MAX_SNIPPET_CHARS);
        Ok(match page.content_urls {
            Some(urls) => format!("{}: {} ({})", page.title, extract, urls.desktop.page),
            None => format!("{}: {}", page.title, extract),
        })
    }
}
