//! Shared fixtures: a mock OpenParliament API and fetchers pointed at it

#![allow(dead_code)]

use parlcards_common::Settings;
use parlcards_core::{Fetchers, RateLimitedClient};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SESSION: &str = "45-1";

/// Settings with no pacing delay and no backoff, caching under `cache_dir`
pub fn test_settings(server: &MockServer, cache_dir: &Path) -> Settings {
    Settings {
        cache_dir: cache_dir.to_path_buf(),
        session: SESSION.to_string(),
        api_base_url: server.uri(),
        rate_limit_per_minute: 10_000,
        min_delay_seconds: 0.0,
        backoff_base_secs: 0.0,
        max_attempts: 2,
        request_timeout_secs: 60,
        progress_batch_size: 1,
        ..Settings::default()
    }
}

pub fn test_fetchers(server: &MockServer, cache_dir: &Path) -> Fetchers {
    let settings = Arc::new(test_settings(server, cache_dir));
    let client = Arc::new(RateLimitedClient::from_settings(&settings).unwrap());
    Fetchers::from_settings(client, settings)
}

pub fn page(objects: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "objects": objects,
        "pagination": {"next_url": null}
    }))
}

pub fn politician_json(slug: &str, name: &str, party: &str) -> Value {
    json!({
        "url": format!("/politicians/{}/", slug),
        "name": name,
        "current_party": {"short_name": {"en": party}},
        "current_riding": {"name": {"en": format!("{} Riding", name)}, "province": "ON"},
        "image": format!("/media/polpics/{}.jpg", slug)
    })
}

pub fn vote_json(number: u64) -> Value {
    json!({
        "url": format!("/votes/{}/{}/", SESSION, number),
        "session": SESSION,
        "number": number,
        "date": format!("2025-06-{:02}", number),
        "result": "Passed",
        "description": {"en": format!("Motion {}", number)}
    })
}

pub fn ballot_json(number: u64, ballot: &str) -> Value {
    json!({
        "vote_url": format!("/votes/{}/{}/", SESSION, number),
        "politician_url": "/politicians/unused/",
        "ballot": ballot
    })
}

/// Both parties whipped: Liberals yes, Conservatives no
pub fn vote_detail_json(number: u64) -> Value {
    json!({
        "url": format!("/votes/{}/{}/", SESSION, number),
        "session": SESSION,
        "number": number,
        "date": "2025-06-01",
        "party_votes": [
            {"party": {"short_name": {"en": "Liberal"}}, "vote": "Yes", "disagreement": 0.0},
            {"party": {"short_name": {"en": "Conservative"}}, "vote": "No", "disagreement": 0.02}
        ]
    })
}

pub async fn mount_politician_list(server: &MockServer, politicians: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/politicians/"))
        .respond_with(page(Value::Array(politicians)))
        .mount(server)
        .await;
}

/// Two session votes and their details
pub async fn mount_session_votes(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/votes/"))
        .and(query_param("session", SESSION))
        .respond_with(page(json!([vote_json(1), vote_json(2)])))
        .mount(server)
        .await;
    for number in [1, 2] {
        Mock::given(method("GET"))
            .and(path(format!("/votes/{}/{}/", SESSION, number)))
            .respond_with(ResponseTemplate::new(200).set_body_json(vote_detail_json(number)))
            .mount(server)
            .await;
    }
}

/// Ballots, speeches and bills for one politician, each expected `times` times
pub async fn mount_entity(server: &MockServer, slug: &str, ballots: Value, speeches: usize, times: u64) {
    let reference = format!("/politicians/{}/", slug);

    Mock::given(method("GET"))
        .and(path("/votes/ballots/"))
        .and(query_param("politician", reference.as_str()))
        .respond_with(page(ballots))
        .expect(times)
        .mount(server)
        .await;

    let speech_items: Vec<Value> = (0..speeches)
        .map(|i| json!({"url": format!("/debates/2025/6/{}/{}/", i + 1, slug), "time": "2025-06-01 14:00:00"}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/speeches/"))
        .and(query_param("politician", reference.as_str()))
        .respond_with(page(Value::Array(speech_items)))
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bills/"))
        .and(query_param("sponsor_politician", reference.as_str()))
        .respond_with(page(json!([
            {
                "number": format!("C-{}", slug.len()),
                "name": {"en": format!("An Act from {}", slug)},
                "introduced": "2025-06-02",
                "session": SESSION,
                "url": format!("/bills/{}/C-{}/", SESSION, slug.len())
            }
        ])))
        .expect(times)
        .mount(server)
        .await;
}
