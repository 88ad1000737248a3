//! Narrator client against a mock speech endpoint

use audioshelf_engine::{DecodeHints, PreviewAudioProvider, PreviewDecoder};
use audioshelf_narrator::{GeminiNarrator, NarratorConfig, NarratorError, RetryPolicy};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/models/tts-test:generateContent";

fn narrator(server: &MockServer, retry: RetryPolicy) -> GeminiNarrator {
    let config = NarratorConfig::new("test-key")
        .with_endpoint(server.uri())
        .with_model("tts-test")
        .with_timeout(Duration::from_secs(5))
        .with_retry_policy(retry.with_initial_delay(Duration::from_millis(1)));
    GeminiNarrator::new(config).unwrap()
}

fn audio_body(data: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"parts": [{
                "inlineData": {"mimeType": "audio/L16;codec=pcm;rate=24000", "data": data}
            }]}
        }]
    })
}

#[tokio::test]
async fn sends_voice_and_key_and_returns_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"parts": [{"text": "Here is a preview of Dune by Frank Herbert. "}]}],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {"voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Puck"}}}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(audio_body("AAAAQA==")))
        .expect(1)
        .mount(&server)
        .await;

    let audio = narrator(&server, RetryPolicy::none())
        .synthesize("Here is a preview of Dune by Frank Herbert. ")
        .await
        .unwrap();

    assert_eq!(audio.bytes, vec![0, 0, 0, 0x40]);
    assert_eq!(
        audio.mime_type.as_deref(),
        Some("audio/L16;codec=pcm;rate=24000")
    );
}

#[tokio::test]
async fn rejected_key_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = narrator(&server, RetryPolicy::new(3))
        .synthesize("text")
        .await
        .unwrap_err();

    match err {
        NarratorError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "API key not valid.");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(audio_body("AAAA")))
        .mount(&server)
        .await;

    let audio = narrator(&server, RetryPolicy::new(3))
        .synthesize("text")
        .await
        .unwrap();
    assert_eq!(audio.bytes.len(), 3);
}

#[tokio::test]
async fn response_without_audio_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let err = narrator(&server, RetryPolicy::none())
        .synthesize("text")
        .await
        .unwrap_err();
    assert!(matches!(err, NarratorError::EmptyResponse));
}

#[tokio::test]
async fn provider_output_decodes_as_preview_audio() {
    let server = MockServer::start().await;
    // 0.5 s of 24 kHz mono silence
    let pcm = vec![0u8; 24000];
    let data = {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD.encode(&pcm)
    };
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(audio_body(&data)))
        .mount(&server)
        .await;

    let provider = narrator(&server, RetryPolicy::none());
    let audio = provider.request_preview_audio("text").await.unwrap();
    let buffer = PreviewDecoder::new()
        .decode(audio, DecodeHints::default())
        .await
        .unwrap();

    assert_eq!(buffer.sample_rate(), 24000);
    assert!((buffer.duration_secs() - 0.5).abs() < 1e-9);
}
