//! HTTP-level tests for the Whisper and Gemini clients using wiremock.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use skald::stt::{GeminiClient, WhisperClient};
use skald::{RuntimeConfig, SkaldError, SpeechToText};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Write a fake mp3 into a fresh directory.
fn audio_file() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("part_000.mp3");
    std::fs::write(&file, b"ID3 not really audio").unwrap();
    (dir, file)
}

// ============================================================================
// Whisper
// ============================================================================

#[tokio::test]
async fn whisper_posts_multipart_and_parses_segments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_string_contains("verbose_json"))
        .and(body_string_contains("whisper-1"))
        .and(body_string_contains("part_000.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "guten tag welt",
            "segments": [
                {"start": 0.0, "end": 1.2, "text": " guten tag"},
                {"start": 1.2, "end": 2.0, "text": " welt"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, file) = audio_file();
    let client = WhisperClient::with_base_url(Some("sk-test".into()), server.uri());
    let segments = client.transcribe(&file, Some("de"), None).await.unwrap();

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].text, "guten tag");
    assert_eq!(segments[1].start, 1.2);
    assert!((segments[1].duration - 0.8).abs() < 1e-9);

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains(r#"name="language""#));
}

#[tokio::test]
async fn whisper_omits_language_when_detecting() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": " hola "})))
        .mount(&server)
        .await;

    let (_dir, file) = audio_file();
    let client = WhisperClient::with_base_url(Some("sk-test".into()), server.uri());
    let segments = client.transcribe(&file, None, None).await.unwrap();

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text, "hola");
    assert_eq!(segments[0].start, 0.0);

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(!body.contains(r#"name="language""#));
}

#[tokio::test]
async fn whisper_rate_limit_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let (_dir, file) = audio_file();
    let client = WhisperClient::with_base_url(Some("sk-test".into()), server.uri());
    let err = client.transcribe(&file, Some("en"), None).await.unwrap_err();

    assert!(matches!(err, SkaldError::RateLimited { .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn whisper_server_error_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let (_dir, file) = audio_file();
    let client = WhisperClient::with_base_url(Some("sk-test".into()), server.uri());
    let err = client.transcribe(&file, Some("en"), None).await.unwrap_err();

    match err {
        SkaldError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn whisper_without_key_never_calls_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, file) = audio_file();
    let client = WhisperClient::with_base_url(Some("   ".into()), server.uri());
    let err = client.transcribe(&file, Some("en"), None).await.unwrap_err();

    assert!(matches!(err, SkaldError::Configuration(_)));
}

// ============================================================================
// Gemini
// ============================================================================

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"parts": [{"text": text}]}
        }]
    })
}

#[tokio::test]
async fn gemini_sends_inline_audio_and_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "g-key"))
        .and(body_string_contains("inline_data"))
        .and(body_string_contains("audio/mpeg"))
        .and(body_string_contains("Transcribe this audio to de text only"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(" Hallo Welt ")))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, file) = audio_file();
    let client = GeminiClient::with_base_url(
        Some("g-key".into()),
        Arc::new(RuntimeConfig::default()),
        server.uri(),
    );
    let segments = client.transcribe(&file, Some("de"), None).await.unwrap();

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text, "Hallo Welt");
    assert_eq!(segments[0].start, 0.0);
}

#[tokio::test]
async fn gemini_request_key_overrides_configured_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-goog-api-key", "per-request"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, file) = audio_file();
    let client = GeminiClient::with_base_url(
        Some("configured".into()),
        Arc::new(RuntimeConfig::default()),
        server.uri(),
    );
    client
        .transcribe(&file, None, Some("per-request"))
        .await
        .unwrap();
}

#[tokio::test]
async fn gemini_model_change_applies_to_next_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("newer")))
        .expect(1)
        .mount(&server)
        .await;

    let runtime = Arc::new(RuntimeConfig::default());
    let (_dir, file) = audio_file();
    let client = GeminiClient::with_base_url(Some("g-key".into()), runtime.clone(), server.uri());

    runtime.set("GEMINI_MODEL", Some("gemini-2.0-pro")).unwrap();
    let segments = client.transcribe(&file, None, None).await.unwrap();
    assert_eq!(segments[0].text, "newer");
}

#[tokio::test]
async fn gemini_empty_candidate_yields_no_segments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let (_dir, file) = audio_file();
    let client = GeminiClient::with_base_url(
        Some("g-key".into()),
        Arc::new(RuntimeConfig::default()),
        server.uri(),
    );
    assert!(client.transcribe(&file, None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn gemini_rate_limit_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let (_dir, file) = audio_file();
    let client = GeminiClient::with_base_url(
        Some("g-key".into()),
        Arc::new(RuntimeConfig::default()),
        server.uri(),
    );
    let err = client.transcribe(&file, None, None).await.unwrap_err();
    assert!(matches!(err, SkaldError::RateLimited { .. }));
}

#[tokio::test]
async fn gemini_without_any_key_is_a_configuration_error() {
    let (_dir, file) = audio_file();
    let client = GeminiClient::new(None, Arc::new(RuntimeConfig::default()));
    let err = client.transcribe(&file, None, Some(" ")).await.unwrap_err();
    assert!(matches!(err, SkaldError::Configuration(_)));
}

#[tokio::test]
async fn gemini_uploads_large_audio_then_deletes_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .and(header("x-goog-upload-protocol", "resumable"))
        .and(header("x-goog-upload-command", "start"))
        .and(header("x-goog-upload-header-content-type", "audio/mpeg"))
        .and(body_string_contains("part_000.mp3"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-goog-upload-url", format!("{}/upload-session/s1", server.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload-session/s1"))
        .and(header("x-goog-upload-offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file": {
                "name": "files/abc",
                "uri": "https://files.example.test/v1beta/files/abc",
                "state": "ACTIVE"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(body_string_contains("file_data"))
        .and(body_string_contains("https://files.example.test/v1beta/files/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("long talk")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1beta/files/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, file) = audio_file();
    let client = GeminiClient::with_base_url(
        Some("g-key".into()),
        Arc::new(RuntimeConfig::default()),
        server.uri(),
    )
    .inline_limit(4);
    let segments = client.transcribe(&file, Some("de"), None).await.unwrap();

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text, "long talk");
}

#[tokio::test]
async fn gemini_failed_upload_skips_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("never")))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, file) = audio_file();
    let client = GeminiClient::with_base_url(
        Some("g-key".into()),
        Arc::new(RuntimeConfig::default()),
        server.uri(),
    )
    .inline_limit(4);
    let err = client.transcribe(&file, None, None).await.unwrap_err();
    assert!(matches!(err, SkaldError::RateLimited { .. }));
}
