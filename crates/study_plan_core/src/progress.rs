//! crates/study_plan_core/src/progress.rs
//!
//! Completion tracking for one persisted plan.
//!
//! `ProgressTracker` applies toggles locally and immediately, then pushes the
//! resulting snapshot to storage after a quiet period. Only the newest state
//! is ever sent, and at most one write is in flight per tracker, so a slow
//! write can never land after a newer one. When a write fails and nothing
//! newer has been toggled since, the local state rolls back to the last
//! snapshot storage accepted.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::{CompletionId, PersistedPlan, PlanId, ProgressSnapshot, UserId};
use crate::ports::{PlanRepository, PortError};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

/// Percentage of `total` items that are `completed`, rounded half up.
/// A plan with nothing to track is at 0%.
pub fn compute_progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    ((200 * completed + total) / (2 * total)).min(100) as u8
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("`{0}` is not a trackable item of this plan")]
    UnknownItem(CompletionId),
    #[error("progress sync failed: {0}")]
    Sync(#[from] PortError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Pending,
    Failed(String),
}

/// What observers of the tracker see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerState {
    pub snapshot: ProgressSnapshot,
    pub sync: SyncStatus,
}

struct Inner {
    current: ProgressSnapshot,
    durable: ProgressSnapshot,
    /// Bumped on every local change; a pending write is only sent if it still
    /// carries the latest generation.
    generation: u64,
}

struct Shared {
    repo: Arc<dyn PlanRepository>,
    user_id: UserId,
    plan_id: PlanId,
    trackable: BTreeSet<CompletionId>,
    debounce: Duration,
    inner: Mutex<Inner>,
    /// Held for the whole storage call.
    writing: tokio::sync::Mutex<()>,
    state: watch::Sender<TrackerState>,
}

#[derive(Clone)]
pub struct ProgressTracker {
    shared: Arc<Shared>,
}

impl ProgressTracker {
    pub fn new(repo: Arc<dyn PlanRepository>, user_id: UserId, plan: &PersistedPlan) -> Self {
        Self::with_debounce(repo, user_id, plan, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(
        repo: Arc<dyn PlanRepository>,
        user_id: UserId,
        plan: &PersistedPlan,
        debounce: Duration,
    ) -> Self {
        let trackable: BTreeSet<CompletionId> = plan.plan.trackable_ids().cloned().collect();
        // Ids left over from an older version of the plan are dropped.
        let completed: BTreeSet<CompletionId> = plan
            .completed_items
            .intersection(&trackable)
            .cloned()
            .collect();
        let snapshot = ProgressSnapshot {
            progress: compute_progress(completed.len(), trackable.len()),
            completed_items: completed,
        };
        let (state, _) = watch::channel(TrackerState {
            snapshot: snapshot.clone(),
            sync: SyncStatus::Idle,
        });

        Self {
            shared: Arc::new(Shared {
                repo,
                user_id,
                plan_id: plan.id.clone(),
                trackable,
                debounce,
                inner: Mutex::new(Inner {
                    current: snapshot.clone(),
                    durable: snapshot,
                    generation: 0,
                }),
                writing: tokio::sync::Mutex::new(()),
                state,
            }),
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.shared.lock().current.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerState> {
        self.shared.state.subscribe()
    }

    /// Marks `item` complete or incomplete. The returned snapshot reflects the
    /// change at once; the write to storage happens after the debounce window.
    pub fn toggle(
        &self,
        item: &CompletionId,
        completed: bool,
    ) -> Result<ProgressSnapshot, TrackerError> {
        if !self.shared.trackable.contains(item) {
            return Err(TrackerError::UnknownItem(item.clone()));
        }

        let (snapshot, generation) = {
            let mut inner = self.shared.lock();
            let changed = if completed {
                inner.current.completed_items.insert(item.clone())
            } else {
                inner.current.completed_items.remove(item)
            };
            if !changed {
                return Ok(inner.current.clone());
            }
            inner.current.progress = compute_progress(
                inner.current.completed_items.len(),
                self.shared.trackable.len(),
            );
            inner.generation += 1;
            (inner.current.clone(), inner.generation)
        };

        self.shared.publish(snapshot.clone(), SyncStatus::Pending);

        let shared = self.shared.clone();
        tokio::spawn(async move {
            tokio::time::sleep(shared.debounce).await;
            // A failure is already published to subscribers.
            let _ = shared.send(generation).await;
        });

        Ok(snapshot)
    }

    /// Sends the current state now instead of waiting for the debounce window.
    pub async fn flush(&self) -> Result<ProgressSnapshot, TrackerError> {
        let generation = self.shared.lock().generation;
        self.shared.send(generation).await?;
        Ok(self.snapshot())
    }
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: ProgressSnapshot, sync: SyncStatus) {
        self.state.send_replace(TrackerState { snapshot, sync });
    }

    async fn send(&self, generation: u64) -> Result<(), PortError> {
        // `durable` mirrors storage only while writes are serialized.
        let _writing = self.writing.lock().await;

        let snapshot = {
            let inner = self.lock();
            if inner.generation != generation {
                debug!(plan_id = %self.plan_id, "Skipping superseded progress write");
                return Ok(());
            }
            if inner.current == inner.durable {
                let current = inner.current.clone();
                drop(inner);
                self.publish(current, SyncStatus::Idle);
                return Ok(());
            }
            inner.current.clone()
        };

        match self
            .repo
            .update_progress(&self.user_id, &self.plan_id, &snapshot)
            .await
        {
            Ok(()) => {
                // A newer generation stays pending; its own task sends it.
                let current = {
                    let mut inner = self.lock();
                    inner.durable = snapshot;
                    (inner.generation == generation).then(|| inner.current.clone())
                };
                if let Some(current) = current {
                    self.publish(current, SyncStatus::Idle);
                }
                Ok(())
            }
            Err(e) => {
                warn!(plan_id = %self.plan_id, error = %e, "Failed to sync progress");
                let current = {
                    let mut inner = self.lock();
                    if inner.generation == generation {
                        inner.current = inner.durable.clone();
                    }
                    inner.current.clone()
                };
                self.publish(current, SyncStatus::Failed(e.to_string()));
                Err(e)
            }
        }
    }
}
