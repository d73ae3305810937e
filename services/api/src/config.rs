//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("'{other}' is not development or production")),
        }
    }
}

/// Which text-generation provider backs the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    HuggingFace,
    Gemini,
    OpenAi,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(ProviderKind::HuggingFace),
            "gemini" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAi),
            other => Err(format!("'{other}' is not one of huggingface, gemini, openai")),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub environment: Environment,
    pub log_level: Level,
    pub database_url: Option<String>,
    pub provider: ProviderKind,
    pub huggingface_token: Option<String>,
    pub huggingface_model: String,
    pub huggingface_base_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub max_attempts: u32,
    pub request_timeout: Duration,
    pub cors_origin: String,
    pub default_user_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 5000)),
            environment: Environment::Development,
            log_level: Level::INFO,
            database_url: None,
            provider: ProviderKind::HuggingFace,
            huggingface_token: None,
            huggingface_model: "mistralai/Mistral-7B-Instruct-v0.3".to_string(),
            huggingface_base_url: "https://api-inference.huggingface.co/models".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-pro".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            max_new_tokens: 2000,
            temperature: 0.7,
            max_attempts: 3,
            request_timeout: Duration::from_secs(60),
            cors_origin: "http://localhost:3000".to_string(),
            default_user_id: None,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // --- Server ---
        let bind_address = parse_or(&var, "BIND_ADDRESS", defaults.bind_address)?;
        let environment = parse_or(&var, "APP_ENV", defaults.environment)?;
        let log_level = parse_or(&var, "RUST_LOG", defaults.log_level)?;
        let database_url = var("DATABASE_URL");

        // --- Generation ---
        let provider = parse_or(&var, "GENERATION_PROVIDER", defaults.provider)?;
        let max_new_tokens = parse_or(&var, "GENERATION_MAX_TOKENS", defaults.max_new_tokens)?;
        let temperature = parse_or(&var, "GENERATION_TEMPERATURE", defaults.temperature)?;
        let max_attempts = parse_or(&var, "GENERATION_MAX_ATTEMPTS", defaults.max_attempts)?;
        let timeout_secs: u64 = parse_or(
            &var,
            "GENERATION_TIMEOUT_SECS",
            defaults.request_timeout.as_secs(),
        )?;

        let config = Self {
            bind_address,
            environment,
            log_level,
            database_url,
            provider,
            huggingface_token: var("HUGGINGFACE_TOKEN"),
            huggingface_model: var("HUGGINGFACE_MODEL").unwrap_or(defaults.huggingface_model),
            huggingface_base_url: var("HUGGINGFACE_BASE_URL")
                .unwrap_or(defaults.huggingface_base_url),
            gemini_api_key: var("GEMINI_API_KEY"),
            gemini_model: var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            max_new_tokens,
            temperature,
            max_attempts,
            request_timeout: Duration::from_secs(timeout_secs),
            cors_origin: var("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            default_user_id: var("DEFAULT_USER_ID"),
        };

        // --- The selected provider's credential is required ---
        let (credential, name) = match config.provider {
            ProviderKind::HuggingFace => (&config.huggingface_token, "HUGGINGFACE_TOKEN"),
            ProviderKind::Gemini => (&config.gemini_api_key, "GEMINI_API_KEY"),
            ProviderKind::OpenAi => (&config.openai_api_key, "OPENAI_API_KEY"),
        };
        if credential.is_none() {
            return Err(ConfigError::MissingVar(name.to_string()));
        }

        Ok(config)
    }
}

fn parse_or<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}
