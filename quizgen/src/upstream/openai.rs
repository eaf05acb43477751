//! OpenAI-compatible chat completion provider.
//!
//! Sends one `POST {base_url}/chat/completions` per quiz with a single user message, and reads the
//! first choice's message content back. The wire format comes from `async-openai`'s chat types;
//! the transport is a plain reqwest client. Any server speaking the OpenAI chat completion format works.

use async_openai::types::chat::{
    ChatCompletionRequestUserMessage, CreateChatCompletionRequest, CreateChatCompletionResponse,
};
use async_trait::async_trait;
use reqwest::Client;

use crate::config::OpenAiConfig;
use crate::upstream::{Completion, CompletionProvider, CompletionRequest, Result, UpstreamError};

pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            // Note: base_url already carries the version segment (e.g. /v1)
            endpoint: format!("{}/chat/completions", config.base_url.as_str().trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    #[tracing::instrument(skip_all, fields(model = %request.model, endpoint = %self.endpoint))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let payload = CreateChatCompletionRequest {
            model: request.model.clone(),
            messages: vec![ChatCompletionRequestUserMessage::from(request.prompt.as_str()).into()],
            temperature: Some(request.temperature),
            ..Default::default()
        };

        let mut http_request = self.client.post(&self.endpoint).json(&payload);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(UpstreamError::Status { status, body });
        }

        let parsed: CreateChatCompletionResponse = serde_json::from_str(&body).map_err(UpstreamError::Decode)?;
        let content = parsed.choices.into_iter().next().and_then(|choice| choice.message.content);

        tracing::debug!(has_content = content.is_some(), "Received upstream completion");
        Ok(Completion { content })
    }
}
