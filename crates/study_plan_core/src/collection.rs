//! crates/study_plan_core/src/collection.rs
//!
//! A cached view of one user's plans. At most one `list_plans` call is in
//! flight at a time; concurrent refreshes await the same future.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::domain::{PersistedPlan, PlanStatus, UserId};
use crate::ports::{PlanRepository, PortError};

type Refresh = Shared<BoxFuture<'static, Result<Arc<Vec<PersistedPlan>>, PortError>>>;

pub struct PlanCollection {
    repo: Arc<dyn PlanRepository>,
    user_id: UserId,
    in_flight: Mutex<Option<Refresh>>,
    plans: Mutex<Arc<Vec<PersistedPlan>>>,
}

impl PlanCollection {
    pub fn new(repo: Arc<dyn PlanRepository>, user_id: UserId) -> Self {
        Self {
            repo,
            user_id,
            in_flight: Mutex::new(None),
            plans: Mutex::new(Arc::new(Vec::new())),
        }
    }

    /// Reloads the list from storage, joining a refresh already in progress.
    pub async fn refresh(&self) -> Result<Arc<Vec<PersistedPlan>>, PortError> {
        let refresh = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match in_flight.as_ref() {
                Some(existing) => {
                    debug!(user_id = %self.user_id, "Joining in-flight plan refresh");
                    existing.clone()
                }
                None => {
                    let repo = self.repo.clone();
                    let user_id = self.user_id.clone();
                    let fut = async move { repo.list_plans(&user_id).await.map(Arc::new) }
                        .boxed()
                        .shared();
                    *in_flight = Some(fut.clone());
                    fut
                }
            }
        };

        let result = refresh.clone().await;

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if in_flight.as_ref().is_some_and(|f| f.ptr_eq(&refresh)) {
                *in_flight = None;
            }
        }

        let plans = result?;
        *self.plans.lock().unwrap_or_else(PoisonError::into_inner) = plans.clone();
        Ok(plans)
    }

    /// The cached list, newest first.
    pub fn plans(&self) -> Arc<Vec<PersistedPlan>> {
        self.plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn starred(&self) -> Vec<PersistedPlan> {
        self.filtered(|p| p.is_starred)
    }

    pub fn tracked(&self) -> Vec<PersistedPlan> {
        self.filtered(|p| p.is_tracked)
    }

    pub fn in_progress(&self) -> Vec<PersistedPlan> {
        self.filtered(|p| p.status == PlanStatus::Active && !p.is_complete())
    }

    pub fn completed(&self) -> Vec<PersistedPlan> {
        self.filtered(PersistedPlan::is_complete)
    }

    fn filtered(&self, keep: impl Fn(&PersistedPlan) -> bool) -> Vec<PersistedPlan> {
        self.plans().iter().filter(|p| keep(p)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CompletionId, Difficulty, GeneratedPlan, PlanId, PlanParameters, ProgressSnapshot, Topic,
    };
    use crate::ports::PortResult;
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowRepo {
        plans: Vec<PersistedPlan>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PlanRepository for SlowRepo {
        async fn insert_plan(&self, _: &UserId, _: &PersistedPlan) -> PortResult<()> {
            Ok(())
        }
        async fn list_plans(&self, _: &UserId) -> PortResult<Vec<PersistedPlan>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(self.plans.clone())
        }
        async fn get_plan(&self, _: &UserId, id: &PlanId) -> PortResult<PersistedPlan> {
            Err(PortError::NotFound(id.to_string()))
        }
        async fn replace_plan(&self, _: &UserId, _: &PersistedPlan) -> PortResult<()> {
            Ok(())
        }
        async fn update_progress(&self, _: &UserId, _: &PlanId, _: &ProgressSnapshot) -> PortResult<()> {
            Ok(())
        }
        async fn set_starred(&self, _: &UserId, _: &PlanId, _: bool) -> PortResult<()> {
            Ok(())
        }
        async fn delete_plan(&self, _: &UserId, _: &PlanId) -> PortResult<()> {
            Ok(())
        }
    }

    fn plan(progress: u8, starred: bool, tracked: bool) -> PersistedPlan {
        let params = PlanParameters {
            subject: "History".into(),
            duration: 3,
            difficulty: Difficulty::Medium,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            goals: String::new(),
        };
        let generated = GeneratedPlan {
            title: "History".into(),
            description: "d".into(),
            topics: vec![Topic {
                id: CompletionId::topic(0),
                name: "Rome".into(),
                description: None,
            }],
            schedule: Vec::new(),
            resources: Vec::new(),
            milestones: Vec::new(),
        };
        let mut p = PersistedPlan::new(params, generated, Utc::now());
        p.progress = progress;
        p.is_starred = starred;
        p.is_tracked = tracked;
        p
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refreshes_share_one_fetch() {
        let repo = Arc::new(SlowRepo {
            plans: vec![plan(0, false, true)],
            calls: AtomicUsize::new(0),
        });
        let collection = PlanCollection::new(repo.clone(), UserId("u".into()));

        let (a, b, c) = tokio::join!(
            collection.refresh(),
            collection.refresh(),
            collection.refresh()
        );

        assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap().len(), 1);
        assert!(b.is_ok() && c.is_ok());

        collection.refresh().await.unwrap();
        assert_eq!(repo.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn views_partition_the_cached_list() {
        let repo = Arc::new(SlowRepo {
            plans: vec![
                plan(100, true, true),
                plan(40, false, true),
                plan(0, true, false),
            ],
            calls: AtomicUsize::new(0),
        });
        let collection = PlanCollection::new(repo, UserId("u".into()));
        assert!(collection.plans().is_empty());

        collection.refresh().await.unwrap();

        assert_eq!(collection.plans().len(), 3);
        assert_eq!(collection.starred().len(), 2);
        assert_eq!(collection.tracked().len(), 2);
        assert_eq!(collection.in_progress().len(), 2);
        assert_eq!(collection.completed().len(), 1);
    }
}
