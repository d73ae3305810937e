//! services/api/src/adapters/huggingface.rs
//!
//! `GenerationBackend` backed by the Hugging Face inference API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use study_plan_core::{GenerationBackend, GenerationConfig, UpstreamError};
use tracing::debug;

use super::http::{build_client, error_from_reqwest, map_http_error};

const PROVIDER: &str = "huggingface";

pub struct HuggingFaceAdapter {
    client: Client,
    base_url: String,
    model: String,
    token: String,
}

impl HuggingFaceAdapter {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            token: token.into(),
        })
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct InferenceOutput {
    generated_text: String,
}

#[async_trait]
impl GenerationBackend for HuggingFaceAdapter {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, UpstreamError> {
        let url = format!("{}/{}", self.base_url, self.model);
        let payload = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_new_tokens: config.max_new_tokens,
                temperature: config.temperature,
                return_full_text: false,
            },
        };

        debug!(model = %self.model, "Sending request to Hugging Face");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| error_from_reqwest(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(PROVIDER, status, &body));
        }

        let outputs: Vec<InferenceOutput> = response.json().await.map_err(|e| {
            UpstreamError::transport(format!("unexpected Hugging Face response body: {e}"))
        })?;
        outputs
            .into_iter()
            .next()
            .map(|o| o.generated_text)
            .ok_or_else(|| UpstreamError::transport("Hugging Face returned no generations"))
    }
}
