//! Scheduled sort and HTTP trigger against a mocked Spotify API

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use plsort::{
    config::Settings,
    management::{AuditStore, MemoryStore, PreferenceStore},
    server,
    sync::PlaylistSorter,
    types::{Credential, SortStatus},
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER: &str = "alice";
const FIRST: &str = "1111111111111111111111";
const SECOND: &str = "2222222222222222222222";
const THIRD: &str = "3333333333333333333333";

fn test_settings(server: &MockServer) -> Settings {
    let mut settings =
        Settings::with_endpoints(server.uri(), format!("{}/api/token", server.uri()));
    settings.sync.chunk_delay = Duration::ZERO;
    settings.sync.playlist_delay = Duration::ZERO;
    settings.sync.request_timeout = Duration::from_secs(5);
    settings
}

fn credential(principal: &str, valid: bool) -> Credential {
    let offset = chrono::Duration::hours(1);
    Credential {
        principal_id: principal.to_string(),
        access_token: format!("{principal}-token"),
        refresh_token: format!("{principal}-refresh"),
        expires_at: if valid { Utc::now() + offset } else { Utc::now() - offset },
    }
}

fn track_json(id: &str, album: &str, release_date: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Song {id}"),
        "artists": [],
        "album": { "name": album, "release_date": release_date },
        "disc_number": 1,
        "track_number": 1
    })
}

async fn mount_playlist(server: &MockServer, id: &str, tracks: &[Value], reported_total: usize) {
    let items: Vec<Value> = tracks.iter().map(|t| json!({ "track": t })).collect();
    Mock::given(method("GET"))
        .and(path(format!("/playlists/{id}/tracks")))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": items,
            "total": tracks.len(),
            "next": null
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/playlists/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "name": id,
            "owner": { "id": USER },
            "tracks": { "total": reported_total }
        })))
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/playlists/{id}/tracks")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "snapshot_id": "s" })))
        .mount(server)
        .await;
}

fn unsorted() -> Vec<Value> {
    vec![
        track_json("old", "Old", "2001"),
        track_json("new", "New", "2023-06-01"),
    ]
}

async fn register(store: &MemoryStore, playlists: &[(&str, &str)]) {
    for (id, name) in playlists {
        store.upsert_playlist(USER, id, name, None).await.unwrap();
    }
}

#[tokio::test]
async fn test_batch_continues_after_failing_playlist() {
    let server = MockServer::start().await;
    mount_playlist(&server, FIRST, &unsorted(), 2).await;
    mount_playlist(&server, SECOND, &unsorted(), 2).await;
    Mock::given(method("GET"))
        .and(path(format!("/playlists/{THIRD}/tracks")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.add_principal(credential(USER, true), true).await;
    register(&store, &[(FIRST, "First"), (SECOND, "Second"), (THIRD, "Third")]).await;
    let sorter = PlaylistSorter::with_store(Client::new(), test_settings(&server), store.clone());

    let summary = sorter.run_scheduled_sort().await;
    assert_eq!(summary.principals_processed, 1);
    assert_eq!(summary.playlists_sorted, 2);
    assert_eq!(summary.playlists_skipped, 0);
    assert_eq!(summary.errors, vec!["Playlist Third: Operation failed".to_string()]);

    let playlists = store.playlists(USER).await.unwrap();
    for playlist in &playlists {
        let sorted = playlist.last_sorted_at.is_some();
        assert_eq!(sorted, playlist.playlist_id != THIRD, "{}", playlist.name);
        // an upstream failure does not quarantine the playlist
        assert!(playlist.auto_sort_enabled);
    }

    let outcomes = store.outcomes(USER, 10).await.unwrap();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(store.all_outcomes().await, outcomes.iter().rev().cloned().collect::<Vec<_>>());
    let failed = outcomes
        .iter()
        .find(|o| o.status == SortStatus::Failed)
        .unwrap();
    assert_eq!(failed.playlist_id.as_deref(), Some(THIRD));
    assert_eq!(failed.error_message.as_deref(), Some("Operation failed"));
}

#[tokio::test]
async fn test_disabled_playlists_are_skipped() {
    let server = MockServer::start().await;
    mount_playlist(&server, FIRST, &unsorted(), 2).await;
    Mock::given(method("GET"))
        .and(path(format!("/playlists/{SECOND}/tracks")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.add_principal(credential(USER, true), true).await;
    register(&store, &[(FIRST, "First")]).await;
    store
        .upsert_playlist(USER, SECOND, "Second", Some(false))
        .await
        .unwrap();
    let sorter = PlaylistSorter::with_store(Client::new(), test_settings(&server), store);

    let summary = sorter.run_scheduled_sort().await;
    assert_eq!(summary.playlists_sorted, 1);
    assert_eq!(summary.playlists_skipped, 1);
    assert!(summary.errors.is_empty());
}

#[tokio::test]
async fn test_integrity_failure_disables_auto_sort() {
    let server = MockServer::start().await;
    // verification reports one track less than written
    mount_playlist(&server, FIRST, &unsorted(), 1).await;

    let store = Arc::new(MemoryStore::new());
    store.add_principal(credential(USER, true), true).await;
    register(&store, &[(FIRST, "First")]).await;
    let sorter = PlaylistSorter::with_store(Client::new(), test_settings(&server), store.clone());

    let summary = sorter.run_scheduled_sort().await;
    assert_eq!(summary.playlists_sorted, 0);
    assert_eq!(summary.errors.len(), 1);

    let playlists = store.playlists(USER).await.unwrap();
    assert!(!playlists[0].auto_sort_enabled);
    assert!(playlists[0].last_sorted_at.is_none());

    // the quarantined playlist is skipped on the next run
    let again = sorter.run_scheduled_sort().await;
    assert_eq!(again.playlists_skipped, 1);
    assert_eq!(again.playlists_sorted, 0);
}

#[tokio::test]
async fn test_principal_failure_does_not_stop_others() {
    let server = MockServer::start().await;
    mount_playlist(&server, FIRST, &unsorted(), 2).await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.add_principal(credential("bob", false), true).await;
    store.add_principal(credential(USER, true), true).await;
    store.add_principal(credential("carol", true), false).await;
    register(&store, &[(FIRST, "First")]).await;
    let sorter = PlaylistSorter::with_store(Client::new(), test_settings(&server), store.clone());

    let summary = sorter.run_scheduled_sort().await;
    assert_eq!(summary.principals_processed, 2);
    assert_eq!(summary.playlists_sorted, 1);
    assert_eq!(summary.errors, vec!["User processing failed".to_string()]);

    let bob = store.outcomes("bob", 10).await.unwrap();
    assert_eq!(bob.len(), 1);
    assert_eq!(bob[0].playlist_id, None);
    assert_eq!(bob[0].status, SortStatus::Failed);
}

async fn spawn_api(sorter: PlaylistSorter) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server::router(Arc::new(sorter));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_cron_endpoint_requires_bearer_secret() {
    let server = MockServer::start().await;
    mount_playlist(&server, FIRST, &unsorted(), 2).await;

    let store = Arc::new(MemoryStore::new());
    store.add_principal(credential(USER, true), true).await;
    register(&store, &[(FIRST, "First")]).await;
    let mut settings = test_settings(&server);
    settings.cron_secret = Some("s3cret".to_string());
    let base = spawn_api(PlaylistSorter::with_store(Client::new(), settings, store)).await;

    let http = Client::new();
    let url = format!("{base}/cron/sort-playlists");

    let missing = http.get(&url).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = http.get(&url).bearer_auth("nope").send().await.unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let ok = http.get(&url).bearer_auth("s3cret").send().await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body: Value = ok.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["results"]["principalsProcessed"], 1);
    assert_eq!(body["results"]["playlistsSorted"], 1);
    assert_eq!(body["results"]["errorCount"], 0);

    let health: Value = http
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn test_cron_endpoint_disabled_without_secret() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let base = spawn_api(PlaylistSorter::with_store(
        Client::new(),
        test_settings(&server),
        store,
    ))
    .await;

    let response = Client::new()
        .get(format!("{base}/cron/sort-playlists"))
        .bearer_auth("anything")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_sort_endpoint_maps_errors_to_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/playlists/{FIRST}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": FIRST,
            "name": "Theirs",
            "owner": { "id": "bob" },
            "tracks": { "total": 2 }
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.add_principal(credential(USER, true), true).await;
    let mut settings = test_settings(&server);
    settings.cron_secret = Some("s3cret".to_string());
    let base = spawn_api(PlaylistSorter::with_store(Client::new(), settings, store)).await;

    let http = Client::new();
    let forbidden = http
        .post(format!("{base}/principals/{USER}/playlists/{FIRST}/sort"))
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    let body: Value = forbidden.json().await.unwrap();
    assert_eq!(body["success"], false);

    let invalid = http
        .post(format!("{base}/principals/{USER}/playlists/short/sort"))
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sort_endpoint_limits_each_client() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    store.add_principal(credential(USER, true), true).await;
    let mut settings = test_settings(&server);
    settings.cron_secret = Some("s3cret".to_string());
    let base = spawn_api(PlaylistSorter::with_store(Client::new(), settings, store)).await;

    let http = Client::new();
    let url = format!("{base}/principals/{USER}/playlists/short/sort");
    for _ in 0..server::SORT_REQUESTS_PER_MINUTE {
        let response = http
            .post(&url)
            .header("x-forwarded-for", "198.51.100.4")
            .bearer_auth("s3cret")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let limited = http
        .post(&url)
        .header("x-forwarded-for", "198.51.100.4")
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = limited.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    let body: Value = limited.json().await.unwrap();
    assert_eq!(body["success"], false);

    // another client still has its full budget
    let other = http
        .post(&url)
        .header("x-forwarded-for", "203.0.113.9")
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::BAD_REQUEST);
}
