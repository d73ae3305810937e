//! services/api/src/adapters/openai.rs
//!
//! `GenerationBackend` backed by OpenAI chat completions.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use study_plan_core::{GenerationBackend, GenerationConfig, UpstreamError};

const SYSTEM_PROMPT: &str =
    "You are an expert educational planner. You answer with a single JSON object and nothing else.";

pub struct OpenAiAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

fn classify(err: OpenAIError) -> UpstreamError {
    match err {
        OpenAIError::ApiError(api) => {
            let code = api.code.clone().unwrap_or_default();
            let kind = api.r#type.clone().unwrap_or_default();
            let message = api.message.to_lowercase();
            if code == "rate_limit_exceeded" || message.contains("rate limit") {
                UpstreamError::rate_limited(api.message)
            } else if code == "invalid_api_key"
                || kind == "invalid_request_error" && message.contains("api key")
            {
                UpstreamError::invalid_credentials(api.message)
            } else {
                UpstreamError::transport(api.message)
            }
        }
        other => UpstreamError::transport(other.to_string()),
    }
}

#[async_trait]
impl GenerationBackend for OpenAiAdapter {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, UpstreamError> {
        let build_err = |e: OpenAIError| UpstreamError::transport(e.to_string());

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()
                    .map_err(build_err)?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(build_err)?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(messages)
            .max_tokens(config.max_new_tokens)
            .temperature(config.temperature)
            .build()
            .map_err(build_err)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| UpstreamError::transport("OpenAI returned no completion"))
    }
}
