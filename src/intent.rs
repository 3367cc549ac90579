//! Keyword intent classifier
//!
//! Decides, from the raw utterance, which grounding lookups a turn needs:
//! - weather: conditions, temperature, forecast talk
//! - search: news and fact-seeking questions
//!
//! Time and location are always computed, so they have no flag that gates a
//! fetch. `asks_time` only steers the instruction wording.

use serde::Serialize;

/// Weather-related phrases
pub const WEATHER_KEYWORDS: &[&str] = &[
    "weather", "temperature", "rain", "snow", "sunny", "forecast",
    "humid", "wind", "cloudy", "storm", "hot outside", "cold outside",
    "umbrella",
];

/// News and fact-seeking phrases
pub const SEARCH_KEYWORDS: &[&str] = &[
    "news", "latest", "who is", "who's", "what is", "what's the",
    "price", "today", "happened", "current", "headline", "score",
    "update", "recent",
];

/// Phrases that ask for the clock or calendar
pub const TIME_KEYWORDS: &[&str] = &["time", "clock", "what day", "what date", "today's date"];

/// Which lookups this turn needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Intent {
    pub needs_weather: bool,
    pub needs_search: bool,
    pub asks_time: bool,
}

impl Intent {
    /// True when the user asked about time, weather or current facts
    pub fn wants_grounding(&self) -> bool {
        self.needs_weather || self.needs_search || self.asks_time
    }
}

/// Endings a single-word keyword may carry ("storms", "rainy", "snowing")
const WORD_SUFFIXES: &[&str] = &["", "s", "es", "y", "ly", "ing", "ed", "ity"];

/// Classify an utterance
pub fn classify(utterance: &str) -> Intent {
    let lower = utterance.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    Intent {
        needs_weather: matches_any(&lower, &words, WEATHER_KEYWORDS),
        needs_search: matches_any(&lower, &words, SEARCH_KEYWORDS),
        asks_time: matches_any(&lower, &words, TIME_KEYWORDS),
    }
}

/// Phrases (spaces or apostrophes) match as substrings; single words must
/// match a whole word, so "rain" does not fire on "train".
fn matches_any(text: &str, words: &[&str], keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| {
        if kw.contains([' ', '\'']) {
            text.contains(kw)
        } else {
            words.iter().any(|w| is_word_form(w, kw))
        }
    })
}

fn is_word_form(word: &str, keyword: &str) -> bool {
    word.strip_prefix(keyword)
        .is_some_and(|rest| WORD_SUFFIXES.contains(&rest))
}
