//! End-to-End Mock Tests
//!
//! Tests for complete request flows using mocked provider backends.
//! Gemini and ElevenLabs are served by wiremock; the classifier is a keyword
//! double so the suite runs without model files.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use emotale_gateway::core::classifier::{ClassifierResult, LABEL_COUNT, LabelScores};
use emotale_gateway::{
    EmotionClassifier, EmotionLabel, FilesystemArtifactStore, GeminiNarrativeGenerator,
    GenerationConfig, ElevenLabsSynthesizer, PromptTemplate, RetryPolicy, StoryPipeline,
    SynthesisConfig, routes, state::AppState,
};

const GEMINI_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";
const FAKE_MP3: &[u8] = b"ID3\x03\x00\x00\x00fake-mp3-frames";

/// Scores by keyword; anything without a keyword is neutral
struct KeywordClassifier;

impl EmotionClassifier for KeywordClassifier {
    fn score(&self, text: &str) -> ClassifierResult<LabelScores> {
        let lower = text.to_lowercase();
        let label = if lower.contains("promoted") {
            EmotionLabel::Joy
        } else if lower.contains("scared") {
            EmotionLabel::Fear
        } else {
            EmotionLabel::Neutral
        };
        let mut scores = [0.0; LABEL_COUNT];
        scores[label.index()] = 4.0;
        Ok(scores)
    }

    fn backend_name(&self) -> &'static str {
        "keyword"
    }
}

struct Harness {
    app: Router,
    gemini: MockServer,
    elevenlabs: MockServer,
    audio_dir: tempfile::TempDir,
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

async fn create_harness(retry: RetryPolicy) -> Harness {
    let gemini = MockServer::start().await;
    let elevenlabs = MockServer::start().await;
    let audio_dir = tempfile::tempdir().unwrap();

    let generation = GenerationConfig {
        api_key: "gemini_test_key".to_string(),
        base_url: gemini.uri(),
        ..Default::default()
    };
    let synthesis = SynthesisConfig {
        api_key: "xi_test_key".to_string(),
        base_url: elevenlabs.uri(),
        ..Default::default()
    };

    let pipeline = StoryPipeline::new(
        Arc::new(KeywordClassifier),
        Arc::new(GeminiNarrativeGenerator::new(&generation).unwrap()),
        Arc::new(ElevenLabsSynthesizer::new(&synthesis).unwrap()),
        Arc::new(FilesystemArtifactStore::new(
            audio_dir.path().to_path_buf(),
            Duration::from_secs(600),
        )),
        synthesis.voice(),
        synthesis.model(),
        retry,
    );

    let app = routes::api::create_app_router().with_state(AppState::from_pipeline(pipeline));

    Harness {
        app,
        gemini,
        elevenlabs,
        audio_dir,
    }
}

fn story_body(text: &str) -> Value {
    json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
    })
}

async fn mount_gemini_story(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(story_body(text)))
        .mount(server)
        .await;
}

async fn mount_elevenlabs_audio(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/text-to-speech/.+$"))
        .and(header("xi-api-key", "xi_test_key"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .set_body_bytes(FAKE_MP3),
        )
        .mount(server)
        .await;
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn stored_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

// =============================================================================
// Health and emotion detection
// =============================================================================

#[tokio::test]
async fn test_e2e_health_check() {
    let harness = create_harness(RetryPolicy::none()).await;

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, json) = send_json(&harness.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "OK"}));
}

#[tokio::test]
async fn test_e2e_detect_emotion() {
    let harness = create_harness(RetryPolicy::none()).await;

    let (status, json) = send_json(
        &harness.app,
        post_json("/detect-emotion", json!({"text": "I just got promoted!"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"emotion": "joy"}));
}

#[tokio::test]
async fn test_e2e_detect_emotion_empty_text_is_neutral_and_stable() {
    let harness = create_harness(RetryPolicy::none()).await;

    for _ in 0..3 {
        let (status, json) =
            send_json(&harness.app, post_json("/detect-emotion", json!({"text": ""}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["emotion"], "neutral");
    }
}

#[tokio::test]
async fn test_e2e_detect_emotion_rejects_missing_text() {
    let harness = create_harness(RetryPolicy::none()).await;

    let (status, json) =
        send_json(&harness.app, post_json("/detect-emotion", json!({"body": "hi"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "input_error");

    let malformed = Request::builder()
        .method("POST")
        .uri("/detect-emotion")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send_json(&harness.app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "input_error");
    assert!(json["error"].as_str().is_some());
}

// =============================================================================
// Story generation and audio retrieval
// =============================================================================

#[tokio::test]
async fn test_e2e_generate_story_and_download_audio() {
    let harness = create_harness(RetryPolicy::none()).await;
    mount_gemini_story(&harness.gemini, "Mara opened the letter and laughed.").await;
    mount_elevenlabs_audio(&harness.elevenlabs).await;

    let (status, json) = send_json(
        &harness.app,
        post_json("/generate-story", json!({"emotion": "joy"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["emotion"], "joy");
    assert_eq!(json["story"], "Mara opened the letter and laughed.");

    let audio_url = json["audio_url"].as_str().unwrap();
    assert!(audio_url.starts_with("/audio/"));
    assert!(audio_url.ends_with(".mp3"));

    let request = Request::builder().uri(audio_url).body(Body::empty()).unwrap();
    let (status, headers, body) = send(&harness.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "audio/mpeg");
    assert_eq!(body, FAKE_MP3);

    // Artifacts persist for repeated downloads
    let request = Request::builder().uri(audio_url).body(Body::empty()).unwrap();
    let (status, _, body) = send(&harness.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, FAKE_MP3);
}

#[tokio::test]
async fn test_e2e_unknown_emotion_falls_back_to_neutral() {
    let harness = create_harness(RetryPolicy::none()).await;

    let neutral_prompt = PromptTemplate::default().render(EmotionLabel::Neutral);
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(body_partial_json(json!({
            "contents": [{"parts": [{"text": neutral_prompt}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(story_body("An ordinary day.")))
        .expect(1)
        .mount(&harness.gemini)
        .await;
    mount_elevenlabs_audio(&harness.elevenlabs).await;

    let (status, json) = send_json(
        &harness.app,
        post_json("/generate-story", json!({"emotion": "unknown_emotion_xyz"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["emotion"], "neutral");
}

#[tokio::test]
async fn test_e2e_generate_story_without_emotion_is_neutral() {
    let harness = create_harness(RetryPolicy::none()).await;
    mount_gemini_story(&harness.gemini, "Nothing much happened.").await;
    mount_elevenlabs_audio(&harness.elevenlabs).await;

    let (status, json) = send_json(&harness.app, post_json("/generate-story", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["emotion"], "neutral");
}

#[tokio::test]
async fn test_e2e_audio_not_found() {
    let harness = create_harness(RetryPolicy::none()).await;

    for uri in [
        "/audio/0123456789abcdef0123456789abcdef.mp3",
        "/audio/not-a-reference.mp3",
        "/audio/..%2F..%2Fetc%2Fpasswd",
    ] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, json) = send_json(&harness.app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "uri: {uri}");
        assert_eq!(json["kind"], "not_found");
    }
}

// =============================================================================
// Provider failures
// =============================================================================

#[tokio::test]
async fn test_e2e_generation_auth_failure_skips_synthesis() {
    let harness = create_harness(fast_retry(3)).await;

    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("API key not valid"))
        .expect(1)
        .mount(&harness.gemini)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(FAKE_MP3))
        .expect(0)
        .mount(&harness.elevenlabs)
        .await;

    let (status, json) = send_json(
        &harness.app,
        post_json("/generate-story", json!({"emotion": "anger"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["kind"], "generation_error");
    assert_eq!(stored_files(harness.audio_dir.path()), 0);
}

#[tokio::test]
async fn test_e2e_synthesis_outage_is_retried_then_unavailable() {
    let harness = create_harness(fast_retry(2)).await;
    mount_gemini_story(&harness.gemini, "The storm passed.").await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/text-to-speech/.+$"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(2)
        .mount(&harness.elevenlabs)
        .await;

    let (status, json) = send_json(
        &harness.app,
        post_json("/generate-story", json!({"emotion": "sadness"})),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["kind"], "synthesis_error");
    assert_eq!(stored_files(harness.audio_dir.path()), 0);
}

#[tokio::test]
async fn test_e2e_transient_generation_failure_recovers() {
    let harness = create_harness(fast_retry(3)).await;

    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&harness.gemini)
        .await;
    mount_gemini_story(&harness.gemini, "They were scared, then brave.").await;
    mount_elevenlabs_audio(&harness.elevenlabs).await;

    let (status, json) = send_json(
        &harness.app,
        post_json("/generate-story", json!({"emotion": "fear"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["story"], "They were scared, then brave.");
    assert_eq!(stored_files(harness.audio_dir.path()), 1);
}
