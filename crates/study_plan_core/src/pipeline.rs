//! crates/study_plan_core/src/pipeline.rs
//!
//! The generation pipeline: prompt, backend call, JSON extraction, normalization.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{GeneratedPlan, PlanParameters};
use crate::extract::{extract_json_object, MalformedResponseError};
use crate::normalize::{normalize_plan, SchemaError};
use crate::ports::{GenerationBackend, GenerationConfig, UpstreamError};
use crate::prompt::{build_prompt, MAX_SCHEDULE_ENTRIES, MILESTONE_COUNT, RESOURCE_COUNT, TOPIC_COUNT};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    MalformedResponse(#[from] MalformedResponseError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub struct PlanGenerator {
    backend: Arc<dyn GenerationBackend>,
    config: GenerationConfig,
}

impl PlanGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: GenerationConfig) -> Self {
        Self { backend, config }
    }

    /// Runs one generation. No persistence happens here.
    pub async fn generate(&self, params: &PlanParameters) -> Result<GeneratedPlan, GenerationError> {
        let prompt = build_prompt(params);
        info!(
            backend = self.backend.name(),
            subject = %params.subject,
            duration = params.duration,
            difficulty = %params.difficulty,
            "Generating study plan"
        );

        let raw = self.backend.generate(&prompt, &self.config).await?;

        let value = extract_json_object(&raw).map_err(|e| {
            warn!(error = %e, raw = %raw, "Generation output has no usable JSON object");
            e
        })?;
        let plan = normalize_plan(&value).map_err(|e| {
            warn!(error = %e, raw = %raw, "Generation output failed plan validation");
            e
        })?;

        report_soft_bounds(&plan);
        Ok(plan)
    }
}

/// List sizes outside the requested ranges are accepted but noted.
fn report_soft_bounds(plan: &GeneratedPlan) {
    if !TOPIC_COUNT.contains(&plan.topics.len()) {
        warn!(count = plan.topics.len(), "Generated topic count outside requested range");
    }
    if plan.schedule.len() > MAX_SCHEDULE_ENTRIES {
        warn!(count = plan.schedule.len(), "Generated schedule longer than requested");
    }
    if !plan.resources.is_empty() && !RESOURCE_COUNT.contains(&plan.resources.len()) {
        warn!(count = plan.resources.len(), "Generated resource count outside requested range");
    }
    if !plan.milestones.is_empty() && !MILESTONE_COUNT.contains(&plan.milestones.len()) {
        warn!(count = plan.milestones.len(), "Generated milestone count outside requested range");
    }
}
