//! crates/study_plan_core/src/service.rs
//!
//! The application service the HTTP layer talks to. Every operation is scoped
//! by the calling user.

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::domain::{GeneratedPlan, PersistedPlan, PlanId, ProgressSnapshot, UserId};
use crate::extract::MalformedResponseError;
use crate::normalize::{normalize_plan, SchemaError};
use crate::pipeline::{GenerationError, PlanGenerator};
use crate::ports::{PlanRepository, PortError, UpstreamError};
use crate::progress::compute_progress;
use crate::update::{check_progress, completion_set, PlanUpdate};
use crate::validation::{validate_request, PlanRequest, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    MalformedResponse(#[from] MalformedResponseError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("plan not found: {0}")]
    NotFound(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<GenerationError> for PlanError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::Upstream(e) => PlanError::Upstream(e),
            GenerationError::MalformedResponse(e) => PlanError::MalformedResponse(e),
            GenerationError::Schema(e) => PlanError::Schema(e),
        }
    }
}

impl From<PortError> for PlanError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(id) => PlanError::NotFound(id),
            PortError::Unexpected(msg) => PlanError::Persistence(msg),
        }
    }
}

/// Result of a generation: the id is present only when the plan was saved.
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub plan_id: Option<PlanId>,
    pub plan: GeneratedPlan,
}

pub struct PlanService {
    repo: Arc<dyn PlanRepository>,
    generator: PlanGenerator,
}

impl PlanService {
    pub fn new(repo: Arc<dyn PlanRepository>, generator: PlanGenerator) -> Self {
        Self { repo, generator }
    }

    pub fn repository(&self) -> Arc<dyn PlanRepository> {
        self.repo.clone()
    }

    /// Runs the pipeline and, when `save` is set, persists the result.
    /// Nothing is written unless generation fully succeeds.
    pub async fn generate_plan(
        &self,
        user_id: &UserId,
        request: &PlanRequest,
        save: bool,
        today: NaiveDate,
    ) -> Result<GenerateOutcome, PlanError> {
        let params = validate_request(request, today)?;
        let plan = self.generator.generate(&params).await?;

        if !save {
            return Ok(GenerateOutcome { plan_id: None, plan });
        }

        let persisted = PersistedPlan::new(params, plan, Utc::now());
        self.repo.insert_plan(user_id, &persisted).await?;
        info!(user_id = %user_id, plan_id = %persisted.id, "Study plan saved");
        Ok(GenerateOutcome {
            plan_id: Some(persisted.id),
            plan: persisted.plan,
        })
    }

    /// Persists a previewed plan. Both parts are checked again because the
    /// client may have held or edited them.
    pub async fn save_plan(
        &self,
        user_id: &UserId,
        request: &PlanRequest,
        plan: &Value,
        today: NaiveDate,
    ) -> Result<PersistedPlan, PlanError> {
        let params = validate_request(request, today)?;
        let plan = normalize_plan(plan).map_err(ValidationError::from)?;

        let persisted = PersistedPlan::new(params, plan, Utc::now());
        self.repo.insert_plan(user_id, &persisted).await?;
        info!(user_id = %user_id, plan_id = %persisted.id, "Previewed study plan saved");
        Ok(persisted)
    }

    pub async fn list_plans(&self, user_id: &UserId) -> Result<Vec<PersistedPlan>, PlanError> {
        Ok(self.repo.list_plans(user_id).await?)
    }

    pub async fn get_plan(
        &self,
        user_id: &UserId,
        plan_id: &PlanId,
    ) -> Result<PersistedPlan, PlanError> {
        Ok(self.repo.get_plan(user_id, plan_id).await?)
    }

    pub async fn update_plan(
        &self,
        user_id: &UserId,
        plan_id: &PlanId,
        update: PlanUpdate,
    ) -> Result<PersistedPlan, PlanError> {
        let mut plan = self.repo.get_plan(user_id, plan_id).await?;
        update.apply_to(&mut plan)?;
        plan.updated_at = Utc::now();
        self.repo.replace_plan(user_id, &plan).await?;
        info!(user_id = %user_id, plan_id = %plan_id, "Study plan updated");
        Ok(plan)
    }

    /// Stores a new completion set. The client's `progress` must be in range,
    /// but the stored value is derived from the set.
    pub async fn update_progress(
        &self,
        user_id: &UserId,
        plan_id: &PlanId,
        progress: i64,
        completed_items: Vec<String>,
    ) -> Result<ProgressSnapshot, PlanError> {
        check_progress(progress)?;
        let plan = self.repo.get_plan(user_id, plan_id).await?;
        let completed_items = completion_set(&plan, completed_items)?;
        let snapshot = ProgressSnapshot {
            progress: compute_progress(completed_items.len(), plan.plan.trackable_count()),
            completed_items,
        };

        self.repo
            .update_progress(user_id, plan_id, &snapshot)
            .await?;
        info!(
            user_id = %user_id,
            plan_id = %plan_id,
            progress = snapshot.progress,
            "Progress updated"
        );
        Ok(snapshot)
    }

    pub async fn set_starred(
        &self,
        user_id: &UserId,
        plan_id: &PlanId,
        starred: bool,
    ) -> Result<bool, PlanError> {
        self.repo.set_starred(user_id, plan_id, starred).await?;
        Ok(starred)
    }

    pub async fn delete_plan(&self, user_id: &UserId, plan_id: &PlanId) -> Result<(), PlanError> {
        self.repo.delete_plan(user_id, plan_id).await?;
        info!(user_id = %user_id, plan_id = %plan_id, "Study plan deleted");
        Ok(())
    }
}
