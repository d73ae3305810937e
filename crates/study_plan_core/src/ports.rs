//! crates/study_plan_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the storage engine and of any specific text-generation provider.

use async_trait::async_trait;
use std::fmt;

use crate::domain::{PersistedPlan, PlanId, ProgressSnapshot, UserId};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// Error type for persistence operations.
/// This abstracts away the specific errors of the underlying store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Generation Port
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    RateLimited,
    TransportFailure,
    InvalidCredentials,
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UpstreamErrorKind::RateLimited => "rate limited",
            UpstreamErrorKind::TransportFailure => "transport failure",
            UpstreamErrorKind::InvalidCredentials => "invalid credentials",
        };
        f.write_str(label)
    }
}

/// Failure reported by a generation backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("generation backend {kind}: {detail}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub detail: String,
}

impl UpstreamError {
    pub fn new(kind: UpstreamErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn rate_limited(detail: impl Into<String>) -> Self {
        Self::new(UpstreamErrorKind::RateLimited, detail)
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::new(UpstreamErrorKind::TransportFailure, detail)
    }

    pub fn invalid_credentials(detail: impl Into<String>) -> Self {
        Self::new(UpstreamErrorKind::InvalidCredentials, detail)
    }
}

/// Sampling settings passed through to the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 2000,
            temperature: 0.7,
        }
    }
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short provider label used in logs (e.g. "huggingface").
    fn name(&self) -> &str;

    /// Sends the prompt to the provider and returns its raw text output.
    async fn generate(&self, prompt: &str, config: &GenerationConfig)
        -> Result<String, UpstreamError>;
}

//=========================================================================================
// Persistence Port
//=========================================================================================

/// Storage of persisted plans, always scoped by the owning user.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn insert_plan(&self, user_id: &UserId, plan: &PersistedPlan) -> PortResult<()>;

    /// Returns the user's plans, newest first.
    async fn list_plans(&self, user_id: &UserId) -> PortResult<Vec<PersistedPlan>>;

    async fn get_plan(&self, user_id: &UserId, plan_id: &PlanId) -> PortResult<PersistedPlan>;

    /// Overwrites every mutable field of an existing plan.
    async fn replace_plan(&self, user_id: &UserId, plan: &PersistedPlan) -> PortResult<()>;

    async fn update_progress(
        &self,
        user_id: &UserId,
        plan_id: &PlanId,
        progress: &ProgressSnapshot,
    ) -> PortResult<()>;

    async fn set_starred(&self, user_id: &UserId, plan_id: &PlanId, starred: bool)
        -> PortResult<()>;

    async fn delete_plan(&self, user_id: &UserId, plan_id: &PlanId) -> PortResult<()>;
}
