//! services/api/src/adapters/memory.rs
//!
//! A process-local `PlanRepository`, used when no database is configured and
//! by the HTTP tests. Contents are lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use study_plan_core::{
    PersistedPlan, PlanId, PlanRepository, PortError, PortResult, ProgressSnapshot, UserId,
};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryPlanRepository {
    plans: RwLock<HashMap<UserId, Vec<PersistedPlan>>>,
}

impl MemoryPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(plan_id: &PlanId) -> PortError {
    PortError::NotFound(format!("Plan {plan_id} not found"))
}

/// Runs `edit` against the user's plan with `plan_id`, if it exists.
fn with_plan<T>(
    plans: &mut HashMap<UserId, Vec<PersistedPlan>>,
    user_id: &UserId,
    plan_id: &PlanId,
    edit: impl FnOnce(&mut PersistedPlan) -> T,
) -> PortResult<T> {
    plans
        .get_mut(user_id)
        .and_then(|list| list.iter_mut().find(|p| &p.id == plan_id))
        .map(edit)
        .ok_or_else(|| not_found(plan_id))
}

#[async_trait]
impl PlanRepository for MemoryPlanRepository {
    async fn insert_plan(&self, user_id: &UserId, plan: &PersistedPlan) -> PortResult<()> {
        let mut plans = self.plans.write().await;
        let list = plans.entry(user_id.clone()).or_default();
        if list.iter().any(|p| p.id == plan.id) {
            return Err(PortError::Unexpected(format!("Plan {} already exists", plan.id)));
        }
        list.push(plan.clone());
        Ok(())
    }

    async fn list_plans(&self, user_id: &UserId) -> PortResult<Vec<PersistedPlan>> {
        let plans = self.plans.read().await;
        let mut list = plans.get(user_id).cloned().unwrap_or_default();
        // Reversed first so that later inserts come first on equal timestamps.
        list.reverse();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn get_plan(&self, user_id: &UserId, plan_id: &PlanId) -> PortResult<PersistedPlan> {
        let plans = self.plans.read().await;
        plans
            .get(user_id)
            .and_then(|list| list.iter().find(|p| &p.id == plan_id))
            .cloned()
            .ok_or_else(|| not_found(plan_id))
    }

    async fn replace_plan(&self, user_id: &UserId, plan: &PersistedPlan) -> PortResult<()> {
        let mut plans = self.plans.write().await;
        with_plan(&mut plans, user_id, &plan.id, |stored| {
            // Identity and creation time are immutable.
            let created_at = stored.created_at;
            *stored = plan.clone();
            stored.created_at = created_at;
        })
    }

    async fn update_progress(
        &self,
        user_id: &UserId,
        plan_id: &PlanId,
        progress: &ProgressSnapshot,
    ) -> PortResult<()> {
        let mut plans = self.plans.write().await;
        with_plan(&mut plans, user_id, plan_id, |stored| {
            stored.progress = progress.progress;
            stored.completed_items = progress.completed_items.clone();
            stored.updated_at = Utc::now();
        })
    }

    async fn set_starred(
        &self,
        user_id: &UserId,
        plan_id: &PlanId,
        starred: bool,
    ) -> PortResult<()> {
        let mut plans = self.plans.write().await;
        with_plan(&mut plans, user_id, plan_id, |stored| {
            stored.is_starred = starred;
            stored.updated_at = Utc::now();
        })
    }

    async fn delete_plan(&self, user_id: &UserId, plan_id: &PlanId) -> PortResult<()> {
        let mut plans = self.plans.write().await;
        let list = plans.get_mut(user_id).ok_or_else(|| not_found(plan_id))?;
        let before = list.len();
        list.retain(|p| &p.id != plan_id);
        if list.len() == before {
            return Err(not_found(plan_id));
        }
        Ok(())
    }
}
