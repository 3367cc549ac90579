//! Grounding clients against local stub services

mod common;

use axum::{
    Json, Router,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use common::{BandZones, DEAD_URL, TableGeocoder, serve};
use zesty::grounding::{
    GeoTimeResolver, Geocoder, Grounder, LocationCache, NominatimGeocoder, SearchBackend,
    TavilyClient, TimeApiLookup, TimezoneLookup, WeatherFetcher, WebSearch, WikiLookup,
};
use zesty::intent::classify;

/// Nominatim and timeapi.io on one stub, counting geocoder hits
async fn geo_stub(hits: Arc<AtomicUsize>) -> String {
    let router = Router::new()
        .route(
            "/search",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(params.get("format").map(String::as_str), Some("json"));
                    assert_eq!(params.get("limit").map(String::as_str), Some("1"));
                    match params.get("q").map(String::as_str) {
                        Some("Tokyo") => Json(json!([{
                            "lat": "35.6812",
                            "lon": "139.7671",
                            "display_name": "Tokyo, Japan"
                        }])),
                        _ => Json(json!([])),
                    }
                }
            }),
        )
        .route(
            "/api/timezone/coordinate",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let lon: f64 = params["longitude"].parse().unwrap();
                let zone = if lon > 100.0 { "Asia/Tokyo" } else { "Europe/Lisbon" };
                Json(json!({ "timeZone": zone }))
            }),
        );
    serve(router).await
}

#[tokio::test]
async fn nominatim_parses_first_place() {
    let base = geo_stub(Arc::new(AtomicUsize::new(0))).await;
    let geocoder = NominatimGeocoder::new(reqwest::Client::new(), &base);

    let place = geocoder.geocode("Tokyo").await.unwrap();
    assert_eq!(place.address, "Tokyo, Japan");
    assert!((place.latitude - 35.6812).abs() < 1e-9);
    assert!((place.longitude - 139.7671).abs() < 1e-9);

    assert!(geocoder.geocode("Atlantis").await.is_err());
}

#[tokio::test]
async fn timeapi_returns_zone_id() {
    let base = geo_stub(Arc::new(AtomicUsize::new(0))).await;
    let lookup = TimeApiLookup::new(reqwest::Client::new(), &base);

    assert_eq!(lookup.timezone(35.68, 139.76).await.unwrap(), "Asia/Tokyo");
    assert_eq!(lookup.timezone(38.72, -9.14).await.unwrap(), "Europe/Lisbon");
}

#[tokio::test]
async fn resolver_caches_pair_but_not_failures() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = geo_stub(hits.clone()).await;
    let http = reqwest::Client::new();
    let resolver = GeoTimeResolver::new(
        Arc::new(NominatimGeocoder::new(http.clone(), &base)),
        Arc::new(TimeApiLookup::new(http, &base)),
        LocationCache::new(300),
        chrono_tz::UTC,
    );

    let first = resolver.resolve("Tokyo").await;
    let second = resolver.resolve("Tokyo").await;
    assert!(first.is_fetched());
    assert_eq!(second.value().timezone, "Asia/Tokyo");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let missing = resolver.resolve("Atlantis").await;
    assert!(!missing.is_fetched());
    assert_eq!(missing.value().timezone, "UTC");
    resolver.resolve("Atlantis").await;
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn resolver_falls_back_when_service_down() {
    let http = reqwest::Client::new();
    let resolver = GeoTimeResolver::new(
        Arc::new(NominatimGeocoder::new(http.clone(), DEAD_URL)),
        Arc::new(TimeApiLookup::new(http, DEAD_URL)),
        LocationCache::new(300),
        chrono_tz::Europe::London,
    );

    let outcome = resolver.resolve("Tokyo").await;
    assert!(!outcome.is_fetched());
    assert_eq!(outcome.value().address, "Tokyo (unresolved; showing Europe/London)");
    assert!(outcome.reason().is_some());
}

async fn weather_stub(status: StatusCode, body: &'static str) -> String {
    let router = Router::new().route(
        "/{location}",
        get(
            move |Path(location): Path<String>, Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("format").map(String::as_str), Some("3"));
                (status, body.replace("{loc}", &location))
            },
        ),
    );
    serve(router).await
}

#[tokio::test]
async fn weather_line_is_trimmed_and_cached() {
    let base = weather_stub(StatusCode::OK, "{loc}: ⛅️ +14°C\n").await;
    let fetcher = WeatherFetcher::new(reqwest::Client::new(), &base, LocationCache::new(300));

    let outcome = fetcher.fetch("New York").await;
    assert!(outcome.is_fetched());
    assert_eq!(outcome.value(), "New York: ⛅️ +14°C");
}

#[tokio::test]
async fn weather_server_error_is_unavailable() {
    let base = weather_stub(StatusCode::INTERNAL_SERVER_ERROR, "oops").await;
    let fetcher = WeatherFetcher::new(reqwest::Client::new(), &base, LocationCache::new(300));

    let outcome = fetcher.fetch("Tokyo").await;
    assert!(!outcome.is_fetched());
    assert_eq!(outcome.value(), "unavailable");
    assert_eq!(outcome.reason(), Some("weather returned HTTP 500"));
}

#[tokio::test]
async fn weather_empty_or_unknown_is_unavailable() {
    let base = weather_stub(StatusCode::OK, "  \n").await;
    let fetcher = WeatherFetcher::new(reqwest::Client::new(), &base, LocationCache::new(300));
    assert_eq!(fetcher.fetch("Tokyo").await.value(), "unavailable");

    let base = weather_stub(StatusCode::OK, "Unknown location; please try ~35.68,139.76").await;
    let fetcher = WeatherFetcher::new(reqwest::Client::new(), &base, LocationCache::new(300));
    let outcome = fetcher.fetch("Nowhere").await;
    assert!(!outcome.is_fetched());
    assert_eq!(outcome.value(), "unavailable");
}

#[tokio::test]
async fn tavily_posts_query_verbatim() {
    let seen: Arc<Mutex<Option<(Option<String>, Value)>>> = Arc::new(Mutex::new(None));
    let recorder = seen.clone();

    let router = Router::new().route(
        "/search",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let recorder = recorder.clone();
            async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                *recorder.lock().unwrap() = Some((auth, body));
                Json(json!({
                    "answer": "Rust 2.0 is not a thing.",
                    "results": [
                        {"title": "Rust blog", "url": "https://blog.rust-lang.org/x", "content": "Editions, not versions.", "score": 0.9},
                        {"title": "Forum", "url": "https://users.rust-lang.org/t/1", "content": "Long thread."}
                    ]
                }))
            }
        }),
    );
    let base = serve(router).await;

    let client = TavilyClient::new("tvly-test".into(), reqwest::Client::new(), &base, 5);
    let results = client.search("What's new in Rust 2.0?").await.unwrap();

    assert_eq!(results.sources.len(), 2);
    assert_eq!(results.sources[0].domain.as_deref(), Some("blog.rust-lang.org"));
    assert_eq!(
        results.summarize(),
        "Answer: Rust 2.0 is not a thing.\n\
         1. Rust blog: Editions, not versions. (https://blog.rust-lang.org/x)\n\
         2. Forum: Long thread. (https://users.rust-lang.org/t/1)"
    );

    let (auth, body) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(auth.as_deref(), Some("Bearer tvly-test"));
    assert_eq!(body["query"], "What's new in Rust 2.0?");
    assert_eq!(body["max_results"], 5);
    assert_eq!(body["include_answer"], true);
}

#[tokio::test]
async fn web_search_degrades_on_http_error() {
    let router = Router::new().route(
        "/search",
        post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
    );
    let base = serve(router).await;

    let client = TavilyClient::new("nope".into(), reqwest::Client::new(), &base, 5);
    let search = WebSearch::new(Some(Arc::new(client)));

    let outcome = search.search("latest news").await;
    assert!(!outcome.is_fetched());
    assert_eq!(outcome.value(), "");
    assert_eq!(outcome.reason(), Some("search returned HTTP 401"));
}

/// MediaWiki search plus page summary, counting search hits
async fn wiki_stub(hits: Arc<AtomicUsize>) -> String {
    let router = Router::new()
        .route(
            "/w/rest.php/v1/search/page",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(params.get("limit").map(String::as_str), Some("1"));
                    let q = params.get("q").cloned().unwrap_or_default();
                    if q.contains("Rust") {
                        Json(json!({ "pages": [{ "key": "Rust_(programming_language)", "title": "Rust (programming language)" }] }))
                    } else {
                        Json(json!({ "pages": [] }))
                    }
                }
            }),
        )
        .route(
            "/api/rest_v1/page/summary/{key}",
            get(|Path(key): Path<String>| async move {
                if key != "Rust_(programming_language)" {
                    return (StatusCode::NOT_FOUND, Json(json!({})));
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "title": "Rust (programming language)",
                        "extract": "Rust is a general-purpose programming language.",
                        "content_urls": { "desktop": { "page": "https://en.wikipedia.org/wiki/Rust_(programming_language)" } }
                    })),
                )
            }),
        );
    serve(router).await
}

#[tokio::test]
async fn wiki_returns_article_summary() {
    let base = wiki_stub(Arc::new(AtomicUsize::new(0))).await;
    let wiki = WikiLookup::new(reqwest::Client::new(), &base);

    let outcome = wiki.lookup("who made Rust?").await;
    assert!(outcome.is_fetched());
    assert_eq!(
        outcome.value(),
        "Rust (programming language): Rust is a general-purpose programming language. \
         (https://en.wikipedia.org/wiki/Rust_(programming_language))"
    );
}

#[tokio::test]
async fn wiki_without_match_degrades_to_empty() {
    let base = wiki_stub(Arc::new(AtomicUsize::new(0))).await;
    let wiki = WikiLookup::new(reqwest::Client::new(), &base);

    let outcome = wiki.lookup("zxqv").await;
    assert!(!outcome.is_fetched());
    assert_eq!(outcome.value(), "");
    assert_eq!(
        outcome.reason(),
        Some("unexpected response from wikipedia: no matching article")
    );

    let down = WikiLookup::new(reqwest::Client::new(), DEAD_URL);
    assert_eq!(down.lookup("Rust").await.value(), "");
}

#[tokio::test]
async fn grounder_consults_wiki_only_for_fact_questions() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = wiki_stub(hits.clone()).await;
    let grounder = Grounder::new(
        GeoTimeResolver::new(
            TableGeocoder::world(),
            Arc::new(BandZones),
            LocationCache::new(300),
            chrono_tz::UTC,
        ),
        WeatherFetcher::new(reqwest::Client::new(), DEAD_URL, LocationCache::new(300)),
        WebSearch::disabled(),
        Some(WikiLookup::new(reqwest::Client::new(), &base)),
    );

    let small_talk = grounder.gather("Tokyo", "hey", &classify("hey")).await;
    assert!(small_talk.wiki.is_none());
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let question = "what is the latest Rust release";
    let facts = grounder.gather("Tokyo", question, &classify(question)).await;
    let wiki = facts.wiki.unwrap();
    assert!(wiki.is_fetched());
    assert!(wiki.value().starts_with("Rust (programming language):"));
    assert!(!facts.search.unwrap().is_fetched());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
