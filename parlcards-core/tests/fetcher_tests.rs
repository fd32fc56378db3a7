//! Cache-first fetcher behaviour against a mock API

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::*;
use parlcards_core::cache::{CacheKey, CacheStore};
use parlcards_core::models::{
    Ballot, BallotValue, CardMetrics, CardSummary, MetricRecord, Percentiles, RankingsTable,
    SpeechRef, SpeechSummary,
};
use parlcards_core::rankings::Group;
use parlcards_core::{CardService, FetchError};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ballots_key(slug: &str) -> CacheKey {
    CacheKey::Ballots {
        slug: slug.to_string(),
        session: SESSION.to_string(),
    }
}

fn expired_write<T: serde::Serialize>(store: &CacheStore, key: &CacheKey, value: &T) {
    let long_ago = Utc::now() - ChronoDuration::days(30);
    store.write_at(key, value, 60, "test", long_ago).unwrap();
}

#[tokio::test]
async fn test_fresh_cache_hit_makes_no_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_politician_list(&server, vec![politician_json("alice-ames", "Alice Ames", "Liberal")])
        .await;

    let fetchers = test_fetchers(&server, dir.path());
    let first = fetchers.politician_list().await.unwrap();
    let second = fetchers.politician_list().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first[0].slug, "alice-ames");
    assert_eq!(first[0].party_slug, "liberal");
    assert_eq!(fetchers.client().request_count(), 1);
}

#[tokio::test]
async fn test_ballots_filtered_to_session() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/votes/ballots/"))
        .respond_with(page(json!([
            ballot_json(1, "Yes"),
            {"vote_url": "/votes/44-1/900/", "ballot": "No"},
            {"vote": {"url": "/votes/45-1/2/"}, "ballot": "Paired"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let fetchers = test_fetchers(&server, dir.path());
    let ballots = fetchers
        .politician_ballots("alice-ames", SESSION, false)
        .await
        .unwrap();

    assert_eq!(ballots.len(), 2);
    assert_eq!(ballots[0].ballot, BallotValue::Yes);
    assert_eq!(ballots[1].vote_url, "/votes/45-1/2/");
    assert_eq!(ballots[1].ballot, BallotValue::Paired);
}

#[tokio::test]
async fn test_stale_ballots_served_when_allowed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/votes/ballots/"))
        .respond_with(page(json!([ballot_json(1, "Yes"), ballot_json(2, "No")])))
        .expect(1)
        .mount(&server)
        .await;

    let fetchers = test_fetchers(&server, dir.path());
    let stale = vec![Ballot {
        vote_url: "/votes/45-1/1/".to_string(),
        ballot: BallotValue::Yes,
    }];
    expired_write(fetchers.store(), &ballots_key("alice-ames"), &stale);

    let served = fetchers
        .politician_ballots("alice-ames", SESSION, true)
        .await
        .unwrap();
    assert_eq!(served, stale);
    assert_eq!(fetchers.client().request_count(), 0);

    // Without stale_ok the expired cache forces a refetch
    let refreshed = fetchers
        .politician_ballots("alice-ames", SESSION, false)
        .await
        .unwrap();
    assert_eq!(refreshed.len(), 2);
    assert_eq!(fetchers.client().request_count(), 1);
}

#[tokio::test]
async fn test_speech_count_prefers_summary() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/speeches/"))
        .respond_with(page(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let fetchers = test_fetchers(&server, dir.path());
    fetchers
        .store()
        .write(
            &CacheKey::SpeechSummary {
                slug: "alice-ames".to_string(),
                session: SESSION.to_string(),
            },
            &SpeechSummary { speech_count: 42 },
            3600,
            "test",
        )
        .unwrap();

    let count = fetchers
        .ensure_speech_summary("alice-ames", SESSION)
        .await
        .unwrap();
    assert_eq!(count, 42);
}

#[tokio::test]
async fn test_speech_count_derived_from_stale_listing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/speeches/"))
        .respond_with(page(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let fetchers = test_fetchers(&server, dir.path());
    let listing: Vec<SpeechRef> = (0..3)
        .map(|i| SpeechRef {
            url: Some(format!("/debates/2025/6/{}/alice-ames/", i)),
            time: Some("2025-06-01 14:00:00".to_string()),
        })
        .collect();
    expired_write(
        fetchers.store(),
        &CacheKey::Speeches {
            slug: "alice-ames".to_string(),
            session: SESSION.to_string(),
        },
        &listing,
    );

    let count = fetchers
        .ensure_speech_summary("alice-ames", SESSION)
        .await
        .unwrap();
    assert_eq!(count, 3);

    // The summary was backfilled fresh
    let summary: SpeechSummary = fetchers
        .store()
        .read(&CacheKey::SpeechSummary {
            slug: "alice-ames".to_string(),
            session: SESSION.to_string(),
        })
        .unwrap();
    assert_eq!(summary.speech_count, 3);
}

#[tokio::test]
async fn test_speech_count_fetched_as_last_resort() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/speeches/"))
        .and(query_param("politician", "/politicians/alice-ames/"))
        .and(query_param("session", SESSION))
        .respond_with(page(json!([
            {"url": "/debates/1/", "time": "2025-06-01 14:00:00", "content": {"en": "text"}},
            {"url": "/debates/2/", "time": "2025-06-02 10:00:00", "content": {"en": "more"}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let fetchers = test_fetchers(&server, dir.path());
    let count = fetchers
        .ensure_speech_summary("alice-ames", SESSION)
        .await
        .unwrap();
    assert_eq!(count, 2);

    // Second call is a summary hit
    let again = fetchers
        .ensure_speech_summary("alice-ames", SESSION)
        .await
        .unwrap();
    assert_eq!(again, 2);

    let stored: Vec<serde_json::Value> = fetchers
        .store()
        .read(&CacheKey::Speeches {
            slug: "alice-ames".to_string(),
            session: SESSION.to_string(),
        })
        .unwrap();
    assert!(stored.iter().all(|s| s.get("content").is_none()));
}

#[tokio::test]
async fn test_unsafe_slug_is_not_found_without_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let fetchers = test_fetchers(&server, dir.path());
    let err = fetchers
        .politician_ballots("../etc", SESSION, false)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(fetchers.client().request_count(), 0);
}

#[tokio::test]
async fn test_missing_politician_is_not_found() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/politicians/nobody/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetchers = test_fetchers(&server, dir.path());
    let err = fetchers.politician_detail("nobody").await.unwrap_err();

    assert!(matches!(err, FetchError::NotFound(_)));
}

#[tokio::test]
async fn test_vote_details_batch_dedupes_and_skips_failures() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/votes/45-1/1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vote_detail_json(1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/votes/45-1/2/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetchers = test_fetchers(&server, dir.path());
    let numbers = vec!["1".to_string(), "2".to_string(), "1".to_string()];
    let details = fetchers.vote_details_batch(SESSION, &numbers).await;

    assert_eq!(details.len(), 1);
    assert_eq!(details["1"].party_votes.len(), 2);
    assert!(!fetchers.vote_detail_missing(SESSION, "1"));
    assert!(fetchers.vote_detail_missing(SESSION, "2"));
}

#[tokio::test]
async fn test_card_view_on_demand_without_rankings() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/politicians/alice-ames/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(politician_json("alice-ames", "Alice Ames", "Liberal")),
        )
        .mount(&server)
        .await;
    mount_session_votes(&server).await;
    mount_entity(&server, "alice-ames", json!([ballot_json(1, "Yes")]), 2, 1).await;

    let service = CardService::new(test_fetchers(&server, dir.path()));
    let view = service
        .card_view("alice-ames", SESSION, Group::Party)
        .await
        .unwrap();

    assert!(!view.precomputed);
    assert!(!view.rankings_available);
    assert!(view.percentiles.is_none());
    assert_eq!(view.metrics.attendance, Some(50.0));
    assert_eq!(view.metrics.party_loyalty, Some(100.0));
    assert_eq!(view.metrics.debate_speeches, 2);
    assert_eq!(view.politician.name, "Alice Ames");
}

fn metric(slug: &str, party: &str, attendance: f64) -> MetricRecord {
    MetricRecord {
        slug: slug.to_string(),
        party: party.to_string(),
        attendance: Some(attendance),
        party_loyalty: Some(90.0),
        bills_sponsored: 0,
        debate_speeches: 0,
    }
}

/// Four Liberals and three Conservatives, plus any extra records
fn write_rankings(store: &CacheStore, extra: Vec<MetricRecord>) {
    let mut metrics = vec![
        metric("lib-b", "Liberal", 80.0),
        metric("lib-c", "Liberal", 70.0),
        metric("lib-d", "Liberal", 60.0),
        metric("lib-e", "Liberal", 50.0),
        metric("con-a", "Conservative", 95.0),
        metric("con-b", "Conservative", 99.0),
        metric("con-c", "Conservative", 100.0),
    ];
    metrics.extend(extra);
    let table = RankingsTable {
        session: SESSION.to_string(),
        total_mps: metrics.len(),
        computed_mps: metrics.len(),
        failed_slugs: Vec::new(),
        metrics,
    };
    store
        .write(
            &CacheKey::Rankings {
                session: SESSION.to_string(),
            },
            &table,
            3600,
            "test",
        )
        .unwrap();
}

async fn mount_alice_detail(server: &MockServer, detail: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/politicians/alice-ames/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_card_view_serves_precomputed_card() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_alice_detail(&server, politician_json("alice-ames", "Alice Ames", "Liberal")).await;
    Mock::given(method("GET"))
        .and(path("/votes/ballots/"))
        .respond_with(page(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let fetchers = test_fetchers(&server, dir.path());
    write_rankings(fetchers.store(), vec![metric("alice-ames", "Liberal", 90.0)]);

    let stored = CardSummary {
        slug: "alice-ames".to_string(),
        session: SESSION.to_string(),
        computed_at: Utc::now(),
        metrics: CardMetrics {
            attendance: Some(90.0),
            party_loyalty: Some(90.0),
            bills_sponsored: 0,
            bills_list: Vec::new(),
            debate_speeches: 0,
            total_votes: 10,
            votes_cast: 9,
        },
        percentiles: Percentiles {
            attendance: 42,
            party_loyalty: Some(42),
            bills_sponsored: 42,
            debate_speeches: 42,
        },
    };
    fetchers
        .store()
        .write(
            &CacheKey::Card {
                slug: "alice-ames".to_string(),
                session: SESSION.to_string(),
            },
            &stored,
            3600,
            "test",
        )
        .unwrap();

    let service = CardService::new(fetchers);

    let all = service
        .card_view("alice-ames", SESSION, Group::All)
        .await
        .unwrap();
    assert!(all.precomputed);
    assert!(all.rankings_available);
    assert_eq!(all.metrics, stored.metrics);
    assert_eq!(all.percentiles, Some(stored.percentiles));
    assert!(all.distributions.is_some());

    // Against the five Liberals alice has the top attendance
    let party = service
        .card_view("alice-ames", SESSION, Group::Party)
        .await
        .unwrap();
    assert!(party.precomputed);
    assert_eq!(party.metrics, stored.metrics);
    assert_eq!(party.percentiles.unwrap().attendance, 100);

    // Government is the Liberals as well
    let government = service
        .card_view("alice-ames", SESSION, Group::Government)
        .await
        .unwrap();
    assert_eq!(government.percentiles.unwrap().attendance, 100);

    // Three Conservatives plus alice is too small; ranked against everyone:
    // 4 below of 7 non-maximum values
    let opposition = service
        .card_view("alice-ames", SESSION, Group::Opposition)
        .await
        .unwrap();
    assert_eq!(opposition.percentiles.unwrap().attendance, 57);
}

#[tokio::test]
async fn test_card_view_on_demand_ranks_against_stored_table() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut detail = politician_json("alice-ames", "Alice Ames", "Liberal");
    detail["memberships"] = json!([
        {
            "party": {"short_name": {"en": "Liberal"}},
            "riding": {"name": {"en": "Alice Ames Riding"}, "province": "ON"},
            "start_date": "2025-06-02",
            "end_date": null
        }
    ]);
    mount_alice_detail(&server, detail).await;
    mount_session_votes(&server).await;
    mount_entity(&server, "alice-ames", json!([ballot_json(2, "Yes")]), 2, 1).await;

    let fetchers = test_fetchers(&server, dir.path());
    write_rankings(fetchers.store(), Vec::new());

    let service = CardService::new(fetchers);
    let view = service
        .card_view("alice-ames", SESSION, Group::Party)
        .await
        .unwrap();

    assert!(!view.precomputed);
    assert!(view.rankings_available);
    // Vote 1 predates her membership, so one eligible vote
    assert_eq!(view.metrics.attendance, Some(100.0));
    assert_eq!(view.metrics.total_votes, 2);
    assert_eq!(view.metrics.votes_cast, 1);

    let percentiles = view.percentiles.unwrap();
    assert_eq!(percentiles.attendance, 100);
    assert_eq!(percentiles.party_loyalty, Some(100));
    assert!(view.distributions.is_some());
    assert!(service.load_card("alice-ames", SESSION).is_none());
}
