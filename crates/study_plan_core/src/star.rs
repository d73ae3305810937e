//! crates/study_plan_core/src/star.rs
//!
//! Optimistic starring of a plan. The flag flips locally before the write and
//! reverts if storage rejects it, unless a newer toggle has superseded it.

use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

use crate::domain::{PersistedPlan, PlanId, UserId};
use crate::ports::{PlanRepository, PortError};

struct StarState {
    current: bool,
    durable: bool,
    generation: u64,
}

pub struct StarToggle {
    repo: Arc<dyn PlanRepository>,
    user_id: UserId,
    plan_id: PlanId,
    state: Mutex<StarState>,
}

impl StarToggle {
    pub fn new(repo: Arc<dyn PlanRepository>, user_id: UserId, plan: &PersistedPlan) -> Self {
        Self {
            repo,
            user_id,
            plan_id: plan.id.clone(),
            state: Mutex::new(StarState {
                current: plan.is_starred,
                durable: plan.is_starred,
                generation: 0,
            }),
        }
    }

    pub fn is_starred(&self) -> bool {
        self.lock().current
    }

    pub async fn toggle(&self) -> Result<bool, PortError> {
        let next = !self.is_starred();
        self.set_starred(next).await
    }

    /// Returns the flag as stored. On failure the local flag is back at the
    /// last stored value.
    pub async fn set_starred(&self, starred: bool) -> Result<bool, PortError> {
        let generation = {
            let mut state = self.lock();
            state.current = starred;
            state.generation += 1;
            state.generation
        };

        match self
            .repo
            .set_starred(&self.user_id, &self.plan_id, starred)
            .await
        {
            Ok(()) => {
                self.lock().durable = starred;
                Ok(starred)
            }
            Err(e) => {
                warn!(plan_id = %self.plan_id, error = %e, "Failed to update star");
                let mut state = self.lock();
                if state.generation == generation {
                    state.current = state.durable;
                }
                Err(e)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StarState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
