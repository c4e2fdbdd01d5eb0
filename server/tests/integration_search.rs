use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use songsift_preview::ResolverConfig;
use songsift_server::{build_app, AppConfig};
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

fn record(id: &str, song: &str, artist: &str, popularity: u32, tempo: u32) -> Value {
    serde_json::json!({
        "spotify_track_id": id, "song": song, "artist": artist, "album": "Greatest Hits",
        "time": "3:30", "tempo": tempo, "popularity": popularity, "dance": 50, "energy": 50,
        "acoustic": 5, "instrumental": 0, "happy": 60, "speech": 4, "live": 10
    })
}

fn write_catalog(dir: &Path, records: &[Value]) {
    fs::write(dir.join("tracks.json"), serde_json::to_string_pretty(records).unwrap()).unwrap();
}

fn config(dir: &Path, page_size: usize, admin_token: Option<&str>) -> AppConfig {
    AppConfig {
        data_dir: dir.to_path_buf(),
        songs_per_page: NonZeroUsize::new(page_size).unwrap(),
        preview: ResolverConfig { base_url: "http://127.0.0.1:9/embed/track/".into(), ..Default::default() },
        admin_token: admin_token.map(str::to_string),
        cors_allow_origin: None,
    }
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body: Bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

fn songs(json: &Value) -> Vec<String> {
    json["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["song"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn search_pages_and_clamps() {
    let dir = tempdir().unwrap();
    write_catalog(dir.path(), &[record("z", "Zebra", "B", 90, 100), record("a", "Aardvark", "A", 10, 120)]);
    let app = build_app(config(dir.path(), 1, None)).unwrap();

    let (status, json) = get(app.clone(), "/search").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(songs(&json), vec!["Aardvark"]);
    assert_eq!(json["max_page"], 3);
    assert_eq!(json["total_hits"], 2);

    let (_, json) = get(app.clone(), "/search?page=2").await;
    assert_eq!(songs(&json), vec!["Zebra"]);

    let (_, last) = get(app.clone(), "/search?page=3").await;
    assert!(songs(&last).is_empty());
    assert_eq!(last["page"], 3);
    assert_eq!(last["max_page"], 3);

    let (_, clamped) = get(app.clone(), "/search?page=4").await;
    assert_eq!(clamped["page"], 3);
    assert_eq!(clamped["records"], last["records"]);

    let (_, json) = get(app, "/search?popularity=1&page=1").await;
    assert_eq!(songs(&json), vec!["Zebra"]);
}

#[tokio::test]
async fn track_view_uses_public_fields() {
    let dir = tempdir().unwrap();
    write_catalog(dir.path(), &[record("id-1", "Song", "Artist", 42, 100)]);
    let app = build_app(config(dir.path(), 20, None)).unwrap();

    let (_, json) = get(app, "/search?search=artist").await;
    let track = &json["records"][0];
    assert_eq!(track["id"], "id-1");
    assert_eq!(track["duration"], "3:30");
    assert_eq!(track["popularity"], 42);
    assert!(track.get("duration_secs").is_none());
}

#[tokio::test]
async fn form_post_matches_query_string() {
    let dir = tempdir().unwrap();
    write_catalog(
        dir.path(),
        &[record("1", "Alpha", "Band", 10, 90), record("2", "Beta", "Band", 80, 180), record("3", "Gamma", "Solo", 50, 120)],
    );
    let app = build_app(config(dir.path(), 10, None)).unwrap();

    let req = Request::builder()
        .method(Method::POST)
        .uri("/json")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("search=band&page=1&tempo=1&popularity=0"))
        .unwrap();
    let (status, posted) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(songs(&posted), vec!["Beta", "Alpha"]);

    let (_, got) = get(app, "/search?search=band&page=1&tempo=1&popularity=0").await;
    assert_eq!(songs(&got), songs(&posted));
}

#[tokio::test]
async fn query_errors_map_to_statuses() {
    let dir = tempdir().unwrap();
    write_catalog(dir.path(), &[record("1", "Silence", "Nobody", 1, 0)]);
    let app = build_app(config(dir.path(), 10, None)).unwrap();

    let (status, json) = get(app.clone(), "/search?page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "InvalidQuery");

    let (status, _) = get(app.clone(), "/search?energy=3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = get(app.clone(), "/search?tempo=1").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "DegenerateNormalization");

    let (status, _) = get(app, "/search?time=1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn catalog_meta_reports_maxima() {
    let dir = tempdir().unwrap();
    write_catalog(dir.path(), &[record("1", "A", "X", 1, 90), record("2", "B", "X", 1, 150)]);
    let app = build_app(config(dir.path(), 5, None)).unwrap();

    let (status, json) = get(app, "/catalog/meta").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tracks"], 2);
    assert_eq!(json["max_tempo"], 150);
    assert_eq!(json["max_duration_seconds"], 210);
    assert_eq!(json["page_size"], 5);
    assert_eq!(json["attributes"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn preview_rejects_invalid_track_id() {
    let dir = tempdir().unwrap();
    write_catalog(dir.path(), &[]);
    let app = build_app(config(dir.path(), 5, None)).unwrap();

    let (status, json) = get(app, "/preview_url?track_id=..%2Fetc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "InvalidTrackId");
}

#[tokio::test]
async fn admin_reload_swaps_catalog() {
    let dir = tempdir().unwrap();
    write_catalog(dir.path(), &[record("1", "Old", "X", 1, 100)]);
    let app = build_app(config(dir.path(), 5, Some("secret"))).unwrap();

    let reload = |token: &str| {
        Request::builder()
            .method(Method::POST)
            .uri("/admin/reload")
            .header("X-ADMIN-TOKEN", token)
            .body(Body::empty())
            .unwrap()
    };

    write_catalog(dir.path(), &[record("1", "New", "X", 1, 100), record("2", "Newer", "Y", 1, 100)]);
    let (status, _) = send(app.clone(), reload("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, json) = get(app.clone(), "/search").await;
    assert_eq!(songs(&json), vec!["Old"]);

    let (status, json) = send(app.clone(), reload("secret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tracks"], 2);
    let (_, json) = get(app.clone(), "/search").await;
    assert_eq!(songs(&json), vec!["New", "Newer"]);

    fs::write(dir.path().join("broken.json"), "[{").unwrap();
    let (status, _) = send(app.clone(), reload("secret")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let (_, json) = get(app, "/search").await;
    assert_eq!(json["total_hits"], 2);
}

#[tokio::test]
async fn reload_disabled_without_token() {
    let dir = tempdir().unwrap();
    write_catalog(dir.path(), &[]);
    let app = build_app(config(dir.path(), 5, None)).unwrap();
    let req = Request::builder().method(Method::POST).uri("/admin/reload").body(Body::empty()).unwrap();
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Unauthorized");
}
