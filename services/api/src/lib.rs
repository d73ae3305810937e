//! services/api/src/lib.rs
//!
//! The HTTP service around `study_plan_core`: configuration, adapters for
//! storage and text generation, and the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;

use std::sync::Arc;
use study_plan_core::{
    GenerationBackend, GenerationConfig, PlanGenerator, PlanRepository, PlanService,
    RetryPolicy, RetryingBackend,
};

use adapters::{GeminiAdapter, HuggingFaceAdapter, OpenAiAdapter};
use config::{Config, ConfigError, ProviderKind};
use error::ApiError;

/// Instantiates the configured generation provider, wrapped in the
/// rate-limit retry decorator.
pub fn build_backend(config: &Config) -> Result<Arc<dyn GenerationBackend>, ApiError> {
    let missing = |name: &str| ApiError::from(ConfigError::MissingVar(name.to_string()));

    let backend: Arc<dyn GenerationBackend> = match config.provider {
        ProviderKind::HuggingFace => {
            let token = config
                .huggingface_token
                .as_deref()
                .ok_or_else(|| missing("HUGGINGFACE_TOKEN"))?;
            Arc::new(
                HuggingFaceAdapter::new(
                    config.huggingface_base_url.as_str(),
                    config.huggingface_model.as_str(),
                    token,
                    config.request_timeout,
                )
                .map_err(|e| ApiError::Internal(e.to_string()))?,
            )
        }
        ProviderKind::Gemini => {
            let key = config
                .gemini_api_key
                .as_deref()
                .ok_or_else(|| missing("GEMINI_API_KEY"))?;
            Arc::new(
                GeminiAdapter::new(
                    config.gemini_base_url.as_str(),
                    config.gemini_model.as_str(),
                    key,
                    config.request_timeout,
                )
                .map_err(|e| ApiError::Internal(e.to_string()))?,
            )
        }
        ProviderKind::OpenAi => {
            let key = config
                .openai_api_key
                .as_deref()
                .ok_or_else(|| missing("OPENAI_API_KEY"))?;
            let client = async_openai::Client::with_config(
                async_openai::config::OpenAIConfig::new().with_api_key(key),
            );
            Arc::new(OpenAiAdapter::new(client, config.openai_model.as_str()))
        }
    };

    let policy = RetryPolicy::default().with_max_attempts(config.max_attempts);
    Ok(Arc::new(RetryingBackend::new(backend, policy)))
}

/// Wires the plan service from a repository and a backend.
pub fn build_service(
    config: &Config,
    repo: Arc<dyn PlanRepository>,
    backend: Arc<dyn GenerationBackend>,
) -> PlanService {
    let generation = GenerationConfig {
        max_new_tokens: config.max_new_tokens,
        temperature: config.temperature,
    };
    PlanService::new(repo, PlanGenerator::new(backend, generation))
}
