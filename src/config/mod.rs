//! Configuration for zesty
//!
//! Values resolve in this order: CLI flags > environment (after `.env` is
//! loaded) > `~/.zesty/config.toml` > built-in defaults.

use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

use crate::persona::Persona;
use crate::prompt::MentionPolicy;

/// Runtime configuration for the chat engine and its lookups
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    // ── Secrets
    pub groq_api_key: Option<String>,
    pub tavily_api_key: Option<String>,

    // ── Model
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub llm_base_url: String,
    /// Longest wait for the next model chunk before the turn fails
    pub llm_idle_timeout_secs: u64,

    // ── Grounding endpoints
    pub geocode_url: String,
    pub timezone_url: String,
    pub weather_url: String,
    pub search_url: String,
    pub wiki_url: String,

    // ── Timeouts (seconds)
    pub geocode_timeout_secs: u64,
    pub weather_timeout_secs: u64,
    pub search_timeout_secs: u64,
    pub wiki_timeout_secs: u64,

    // ── Grounding behaviour
    pub search_max_results: usize,
    /// Add a Wikipedia summary next to web search results
    pub wiki_enabled: bool,
    pub cache_ttl_secs: u64,
    pub fallback_timezone: String,
    pub mention_policy: MentionPolicy,

    // ── Session
    pub history_limit: usize,
    pub persona: Persona,
    pub home_location: String,
    pub session_timeout_mins: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            tavily_api_key: None,
            model: "llama-3.1-8b-instant".into(),
            temperature: 0.8,
            max_tokens: 1024,
            llm_base_url: "https://api.groq.com/openai/v1".into(),
            llm_idle_timeout_secs: 30,
            geocode_url: "https://nominatim.openstreetmap.org".into(),
            timezone_url: "https://timeapi.io".into(),
            weather_url: "https://wttr.in".into(),
            search_url: "https://api.tavily.com".into(),
            wiki_url: "https://en.wikipedia.org".into(),
            geocode_timeout_secs: 10,
            weather_timeout_secs: 4,
            search_timeout_secs: 8,
            wiki_timeout_secs: 4,
            search_max_results: 3,
            wiki_enabled: true,
            cache_ttl_secs: 300,
            fallback_timezone: "UTC".into(),
            mention_policy: MentionPolicy::OnlyWhenAsked,
            history_limit: 4,
            persona: Persona::Sassy,
            home_location: String::new(),
            session_timeout_mins: 60,
        }
    }
}

impl Config {
    /// Load `~/.zesty/config.toml` (if present), then apply environment overrides
    pub fn load() -> Self {
        let mut config = Self::from_file(&config_path());
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Read a TOML config file, falling back to defaults if missing or invalid
    pub fn from_file(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Override fields from environment-style lookups
    ///
    /// Takes a lookup function so tests never touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_var = |key: &str| {
            lookup(key)
                .map(|v| clean_value(&v).to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(key) = string_var("GROQ_API_KEY").or_else(|| string_var("ZESTY_API_KEY")) {
            self.groq_api_key = Some(key);
        }
        if let Some(key) = string_var("TAVILY_API_KEY") {
            self.tavily_api_key = Some(key);
        }
        if let Some(model) = string_var("ZESTY_MODEL") {
            self.model = model;
        }
        if let Some(url) = string_var("ZESTY_LLM_BASE_URL") {
            self.llm_base_url = url;
        }
        if let Some(url) = string_var("ZESTY_GEOCODE_URL") {
            self.geocode_url = url;
        }
        if let Some(url) = string_var("ZESTY_TIMEZONE_URL") {
            self.timezone_url = url;
        }
        if let Some(url) = string_var("ZESTY_WEATHER_URL") {
            self.weather_url = url;
        }
        if let Some(url) = string_var("ZESTY_SEARCH_URL") {
            self.search_url = url;
        }
        if let Some(url) = string_var("ZESTY_WIKI_URL") {
            self.wiki_url = url;
        }
        if let Some(location) = lookup("ZESTY_HOME_LOCATION") {
            self.home_location = clean_value(&location).to_string();
        }
        if let Some(tz) = string_var("ZESTY_FALLBACK_TIMEZONE") {
            self.fallback_timezone = tz;
        }

        self.temperature = env_var_or(&lookup, "ZESTY_TEMPERATURE", self.temperature);
        self.max_tokens = env_var_or(&lookup, "ZESTY_MAX_TOKENS", self.max_tokens);
        self.llm_idle_timeout_secs =
            env_var_or(&lookup, "ZESTY_LLM_IDLE_TIMEOUT_SECS", self.llm_idle_timeout_secs);
        self.geocode_timeout_secs =
            env_var_or(&lookup, "ZESTY_GEOCODE_TIMEOUT_SECS", self.geocode_timeout_secs);
        self.weather_timeout_secs =
            env_var_or(&lookup, "ZESTY_WEATHER_TIMEOUT_SECS", self.weather_timeout_secs);
        self.search_timeout_secs =
            env_var_or(&lookup, "ZESTY_SEARCH_TIMEOUT_SECS", self.search_timeout_secs);
        self.search_max_results =
            env_var_or(&lookup, "ZESTY_SEARCH_MAX_RESULTS", self.search_max_results);
        self.wiki_timeout_secs =
            env_var_or(&lookup, "ZESTY_WIKI_TIMEOUT_SECS", self.wiki_timeout_secs);
        self.wiki_enabled = env_var_or(&lookup, "ZESTY_WIKI_ENABLED", self.wiki_enabled);
        self.cache_ttl_secs = env_var_or(&lookup, "ZESTY_CACHE_TTL_SECS", self.cache_ttl_secs);
        self.history_limit = env_var_or(&lookup, "ZESTY_HISTORY_LIMIT", self.history_limit);
        self.persona = env_var_or(&lookup, "ZESTY_PERSONA", self.persona);
        self.mention_policy = env_var_or(&lookup, "ZESTY_MENTION_POLICY", self.mention_policy);
        self.session_timeout_mins =
            env_var_or(&lookup, "ZESTY_SESSION_TIMEOUT_MINS", self.session_timeout_mins);
    }

    /// The timezone used when a location cannot be resolved
    pub fn fallback_tz(&self) -> Tz {
        match self.fallback_timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                warn!(
                    "Unknown fallback timezone '{}', using UTC",
                    self.fallback_timezone
                );
                Tz::UTC
            }
        }
    }

    /// Whether web search grounding is available
    pub fn search_enabled(&self) -> bool {
        self.tavily_api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

/// Strip inline comments and surrounding whitespace from an env value
fn clean_value(raw: &str) -> &str {
    raw.split('#').next().unwrap_or("").trim()
}

/// Parse an env value, keeping the current value when absent or malformed
fn env_var_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => {
            let clean = clean_value(&val);
            match clean.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    warn!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        None => default,
    }
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Directory holding config, `.env` and REPL history
pub fn config_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".zesty")
}
