//! Upstream completion provider abstraction.
//!
//! This module defines the `CompletionProvider` trait which abstracts the one outbound call the
//! service makes: turn a prompt into a chat completion. Providers are built once at startup from
//! [`UpstreamConfig`] and shared by every request.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::UpstreamConfig;

pub mod dummy;
pub mod openai;

/// Create a completion provider from configuration
///
/// This is the single point where we convert config into provider instances.
pub fn create_provider(config: &UpstreamConfig) -> Result<Arc<dyn CompletionProvider>> {
    match config {
        UpstreamConfig::OpenAi(openai_config) => Ok(Arc::new(openai::OpenAiProvider::new(openai_config)?)),
        UpstreamConfig::Dummy(dummy_config) => Ok(Arc::new(dummy::DummyProvider::from(dummy_config.clone()))),
    }
}

/// Result type for upstream operations
pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Errors that can occur while talking to the upstream service
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Connection, TLS, timeout or body read failure
    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned HTTP {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },

    /// Upstream answered 2xx with a body that is not a chat completion
    #[error("Failed to decode upstream response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Content of the single user-role message
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
}

/// The part of an upstream answer the service cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Message content of the first choice, if the upstream produced one
    pub content: Option<String>,
}

/// Abstract completion provider interface
///
/// Implementations perform exactly one upstream call per invocation with no retries.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}
