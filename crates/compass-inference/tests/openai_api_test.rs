//! HTTP-level tests for the OpenAI-compatible backend against a mock server.

use compass_core::{CompletionRequest, EmbeddingBackend, GenerationBackend, SynthesisKind};
use compass_inference::{InferenceConfig, OpenAiBackend};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> OpenAiBackend {
    let config = InferenceConfig {
        api_key: Some("test-key".into()),
        base_url: server.uri(),
        ..InferenceConfig::default()
    };
    OpenAiBackend::from_config(&config).unwrap()
}

fn completion_request() -> CompletionRequest {
    CompletionRequest {
        kind: SynthesisKind::Activities,
        system: "You are a career advisor.".into(),
        prompt: "Recommend activities.".into(),
    }
}

#[tokio::test]
async fn complete_sends_messages_and_returns_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "system", "content": "You are a career advisor."},
                {"role": "user", "content": "Recommend activities."}
            ],
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "{\"recommendations\": []}"}}
            ]
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let content = backend.complete(&completion_request()).await.unwrap();
    assert_eq!(content, "{\"recommendations\": []}");
}

#[tokio::test]
async fn rate_limit_is_retryable_but_auth_failure_is_not() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let backend = backend_for(&server);

    let rate_limited = backend.complete(&completion_request()).await.unwrap_err();
    assert!(rate_limited.is_retryable());

    let unauthorized = backend.complete(&completion_request()).await.unwrap_err();
    assert!(!unauthorized.is_retryable());
}

#[tokio::test]
async fn empty_choices_is_an_inference_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend.complete(&completion_request()).await.unwrap_err();
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn embed_parses_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({"input": ["career profile text"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": [0.25, -0.5, 0.75]}]
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let vector = backend.embed("career profile text").await.unwrap();
    assert_eq!(vector, vec![0.25, -0.5, 0.75]);
}
