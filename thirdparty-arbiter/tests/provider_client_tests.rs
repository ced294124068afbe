//! HTTP provider client tests against in-process stubs
//!
//! Covers the speech-to-text multipart upload and the chat completion
//! request/response handling.

mod helpers;

use axum::http::StatusCode;
use helpers::stub_server::{completion_body, transcription_body};
use helpers::{generate_test_wav, spawn_stub};
use tempfile::TempDir;
use thirdparty_arbiter::config::{CompletionSettings, TranscriptionSettings};
use thirdparty_arbiter::models::{Argument, Persona};
use thirdparty_arbiter::services::{
    ChatMessage, CompletionError, CompletionRequest, CompletionService, JudgmentEngine, OpenAiCompletionClient, Transcriber, TranscriptionError,
};
use std::sync::Arc;

fn transcription_settings(url: &str) -> TranscriptionSettings {
    TranscriptionSettings {
        endpoint: format!("{}/v1/audio/transcriptions", url),
        request_timeout_seconds: 5,
        ..Default::default()
    }
}

fn completion_settings(url: &str) -> CompletionSettings {
    CompletionSettings {
        endpoint: format!("{}/v1/chat/completions", url),
        request_timeout_seconds: 5,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_transcriber_uploads_multipart_with_bearer_auth() {
    let stub = spawn_stub(StatusCode::OK, transcription_body("Alex: hello. Sam: hi.")).await;
    let dir = TempDir::new().unwrap();
    let audio = dir.path().join("normalized.m4a");
    generate_test_wav(&audio, 0.25).unwrap();

    let transcriber = Transcriber::new(transcription_settings(&stub.url), "sk-test".to_string()).unwrap();
    let transcription = transcriber.transcribe(&audio).await.unwrap();

    assert_eq!(transcription.text, "Alex: hello. Sam: hi.");
    assert_eq!(transcription.duration_seconds, Some(9.5));

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.path, "/v1/audio/transcriptions");
    assert_eq!(request.authorization.as_deref(), Some("Bearer sk-test"));
    assert!(request
        .content_type
        .as_deref()
        .unwrap_or_default()
        .starts_with("multipart/form-data"));

    let body = request.body_text();
    for field in ["name=\"model\"", "whisper-1", "verbose_json", "name=\"timestamp_granularities[]\"", "segment"] {
        assert!(body.contains(field), "multipart body missing {}", field);
    }
    assert!(body.contains("filename=\"normalized.m4a\""));

    // Audio file is left for the caller to delete
    assert!(audio.exists());
}

#[tokio::test]
async fn test_transcriber_reports_api_error() {
    let stub = spawn_stub(StatusCode::UNAUTHORIZED, r#"{"error": {"message": "bad key"}}"#).await;
    let dir = TempDir::new().unwrap();
    let audio = dir.path().join("a.m4a");
    generate_test_wav(&audio, 0.1).unwrap();

    let transcriber = Transcriber::new(transcription_settings(&stub.url), "sk-bad".to_string()).unwrap();
    match transcriber.transcribe(&audio).await {
        Err(TranscriptionError::Api { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("bad key"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transcriber_reports_malformed_body() {
    let stub = spawn_stub(StatusCode::OK, "not json").await;
    let dir = TempDir::new().unwrap();
    let audio = dir.path().join("a.m4a");
    generate_test_wav(&audio, 0.1).unwrap();

    let transcriber = Transcriber::new(transcription_settings(&stub.url), "sk-test".to_string()).unwrap();
    assert!(matches!(
        transcriber.transcribe(&audio).await,
        Err(TranscriptionError::Parse(_))
    ));
}

#[tokio::test]
async fn test_transcriber_missing_file_is_io_error() {
    let transcriber =
        Transcriber::new(transcription_settings("http://127.0.0.1:9"), "sk-test".to_string()).unwrap();
    assert!(matches!(
        transcriber.transcribe(std::path::Path::new("/nonexistent/a.m4a")).await,
        Err(TranscriptionError::Io(_))
    ));
}

#[tokio::test]
async fn test_completion_client_sends_decoding_policy() {
    let reply = r#"{"winner":"person_b","reasoning":"Sam apologized.","respect":6,"empathy":6,"accountability":6,"emotional_regulation":6,"manipulation_toxicity":6}"#;
    let stub = spawn_stub(StatusCode::OK, completion_body(reply)).await;

    let settings = completion_settings(&stub.url);
    let client = OpenAiCompletionClient::new(&settings, "sk-test".to_string()).unwrap();
    let engine = JudgmentEngine::new(Arc::new(client), settings);

    let argument = Argument::new(1, "Alex", "Sam", Persona::Mediator, "Alex: hi\nSam: sorry");
    let result = engine.judge(&argument).await.unwrap();
    assert_eq!(result.conversation_health_score, 60);
    assert_eq!(result.full_response, reply);

    let request = &stub.requests()[0];
    assert_eq!(request.path, "/v1/chat/completions");
    assert_eq!(request.authorization.as_deref(), Some("Bearer sk-test"));

    let json = request.body_json();
    assert_eq!(json["model"], "gpt-4o-mini");
    assert_eq!(json["max_tokens"], 500);
    assert!((json["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][1]["role"], "user");
    assert_eq!(json["response_format"]["type"], "json_schema");
}

#[tokio::test]
async fn test_completion_client_reports_api_error() {
    let stub = spawn_stub(StatusCode::TOO_MANY_REQUESTS, r#"{"error": "slow down"}"#).await;
    let client =
        OpenAiCompletionClient::new(&completion_settings(&stub.url), "sk-test".to_string()).unwrap();

    let request = CompletionRequest {
        model: "gpt-4o-mini".to_string(),
        temperature: 0.3,
        max_tokens: 500,
        messages: vec![ChatMessage::system("rules"), ChatMessage::user("Transcript:\n\nA: hi")],
        response_format: None,
    };

    match client.complete(&request).await {
        Err(CompletionError::Api { status, body }) => {
            assert_eq!(status, 429);
            assert!(body.contains("slow down"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_completion_client_network_failure() {
    // Nothing listens on the discard port
    let client =
        OpenAiCompletionClient::new(&completion_settings("http://127.0.0.1:9"), "sk-test".to_string()).unwrap();
    let engine = JudgmentEngine::new(Arc::new(client), completion_settings("http://127.0.0.1:9"));

    let result = engine
        .judge(&Argument::new(1, "A", "B", Persona::Mediator, "t"))
        .await;
    assert!(matches!(
        result,
        Err(thirdparty_arbiter::services::JudgmentError::Upstream(CompletionError::Network(_)))
    ));
}
