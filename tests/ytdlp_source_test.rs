//! Caption fetching over HTTP for the yt-dlp source.

use std::time::Duration;

use serde_json::json;
use skald::{CaptionSource, SkaldError, TrackDescriptor, YtDlpCaptionSource};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source() -> YtDlpCaptionSource {
    YtDlpCaptionSource::with_http("skald-test-missing-yt-dlp", reqwest::Client::new())
}

fn track(server: &MockServer) -> TrackDescriptor {
    TrackDescriptor::manual("de", "German")
        .with_locator(format!("{}/api/timedtext?v=vid&lang=de&fmt=json3", server.uri()))
}

fn json3() -> serde_json::Value {
    json!({
        "events": [
            {"tStartMs": 0, "dDurationMs": 5000},
            {"tStartMs": 500, "dDurationMs": 1500, "segs": [{"utf8": "hallo"}]},
            {"tStartMs": 2000, "dDurationMs": 1000, "segs": [{"utf8": "welt"}]}
        ]
    })
}

#[tokio::test]
async fn fetch_parses_json3_captions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/timedtext"))
        .and(query_param("lang", "de"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json3()))
        .expect(1)
        .mount(&server)
        .await;

    let segments = source().fetch(&track(&server)).await.unwrap();

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].text, "hallo");
    assert_eq!(segments[0].start, 0.5);
    assert_eq!(segments[0].duration, 1.5);
    assert_eq!(segments[1].start, 2.0);
}

#[tokio::test]
async fn translated_fetch_adds_target_language() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/timedtext"))
        .and(query_param("tlang", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json3()))
        .expect(1)
        .mount(&server)
        .await;

    let source = source();
    let translated = source.translate(&track(&server), "en").await.unwrap();
    assert_eq!(translated.translated_to.as_deref(), Some("en"));

    let segments = source.fetch(&translated).await.unwrap();
    assert_eq!(segments.len(), 2);
}

#[tokio::test]
async fn untranslatable_track_is_refused() {
    let server = MockServer::start().await;
    let track = track(&server).translatable(false);

    let err = source().translate(&track, "en").await.unwrap_err();
    assert!(matches!(err, SkaldError::TranslationUnavailable(_)));
}

#[tokio::test]
async fn too_many_requests_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let err = source().fetch(&track(&server)).await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
}

#[tokio::test]
async fn empty_body_is_an_empty_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let segments = source().fetch(&track(&server)).await.unwrap();
    assert!(segments.is_empty());
}

#[tokio::test]
async fn server_error_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let err = source().fetch(&track(&server)).await.unwrap_err();

    assert!(matches!(err, SkaldError::Api { status: 404, .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn track_without_locator_is_rejected() {
    let err = source()
        .fetch(&TrackDescriptor::manual("de", "German"))
        .await
        .unwrap_err();
    assert!(matches!(err, SkaldError::InvalidInput(_)));
}

#[tokio::test]
async fn missing_binary_fails_listing_with_tool_error() {
    let err = source().list_tracks("vid").await.unwrap_err();
    assert!(matches!(err, SkaldError::Tool { .. }));
    assert!(!err.is_no_transcript());
}
