//! Shared helpers for HTTP-level tests.

use axum_test::TestServer;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::{Config, OpenAiConfig, UpstreamConfig};

/// Config pointing the OpenAI provider at a wiremock server.
pub fn create_test_config(upstream: &MockServer) -> Config {
    Config {
        upstream: UpstreamConfig::OpenAi(OpenAiConfig {
            base_url: format!("{}/v1", upstream.uri()).parse().expect("valid mock url"),
            api_key: Some("sk-test".to_string()),
            timeout: None,
        }),
        ..Default::default()
    }
}

pub async fn create_test_app(config: Config) -> TestServer {
    crate::Application::new(config)
        .await
        .expect("Failed to create application")
        .into_test_server()
}

/// A chat completion response whose first choice carries `content`.
pub fn chat_completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

/// Answer every chat completion request with `content`.
pub async fn mount_completion(upstream: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion(content)))
        .mount(upstream)
        .await;
}
