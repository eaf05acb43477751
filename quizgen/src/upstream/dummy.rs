//! Dummy completion provider implementation
//!
//! Returns the configured content for every request without any network I/O. Useful for local
//! development of the front-end and for demos without an API key.

use async_trait::async_trait;

use crate::config::DummyConfig;
use crate::upstream::{Completion, CompletionProvider, CompletionRequest, Result};

pub struct DummyProvider {
    content: String,
}

impl From<DummyConfig> for DummyProvider {
    fn from(config: DummyConfig) -> Self {
        Self { content: config.content }
    }
}

#[async_trait]
impl CompletionProvider for DummyProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        tracing::debug!(model = %request.model, prompt_len = request.prompt.len(), "Dummy provider answering completion");
        Ok(Completion {
            content: Some(self.content.clone()),
        })
    }
}
