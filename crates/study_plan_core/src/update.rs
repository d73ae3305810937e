//! crates/study_plan_core/src/update.rs
//!
//! Partial updates of a persisted plan. Every list goes back through the
//! normalizer, and the completion set and progress are re-derived afterwards
//! so a stored plan never references items it no longer has.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::domain::{CompletionId, PersistedPlan, PlanStatus};
use crate::normalize::{
    normalize_milestones, normalize_resources, normalize_schedule, normalize_topics,
    requested_ids, SchemaError,
};
use crate::progress::compute_progress;
use crate::validation::ValidationError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub topics: Option<Vec<Value>>,
    pub schedule: Option<Vec<Value>>,
    pub resources: Option<Vec<Value>>,
    pub milestones: Option<Vec<Value>>,
    pub status: Option<String>,
    pub is_tracked: Option<bool>,
    pub is_starred: Option<bool>,
    /// Range-checked only; the stored value is always derived from the completion set.
    pub progress: Option<i64>,
    #[serde(alias = "completedTopics")]
    pub completed_items: Option<Vec<String>>,
}

impl From<SchemaError> for ValidationError {
    fn from(e: SchemaError) -> Self {
        ValidationError::new(e.field, e.message)
    }
}

impl PlanUpdate {
    /// Applies the update in place. On error `plan` is left untouched.
    pub fn apply_to(self, plan: &mut PersistedPlan) -> Result<(), ValidationError> {
        let mut next = plan.clone();

        if let Some(title) = self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ValidationError::new("title", "must not be empty"));
            }
            next.plan.title = title.to_string();
        }
        if let Some(description) = self.description {
            next.plan.description = description.trim().to_string();
        }

        // Ids of items that existed before are never handed to new items,
        // otherwise a new item could inherit a removed item's completion.
        let kept: BTreeSet<CompletionId> = [self.topics.as_deref(), self.milestones.as_deref()]
            .into_iter()
            .flatten()
            .flat_map(requested_ids)
            .collect();
        let retired: BTreeSet<CompletionId> = plan
            .plan
            .trackable_ids()
            .chain(plan.completed_items.iter())
            .filter(|id| !kept.contains(*id))
            .cloned()
            .collect();

        match (self.topics, self.milestones) {
            (Some(topics), Some(milestones)) => {
                next.plan.topics = normalize_topics(&topics, &retired)?;
                let reserved = with(&retired, next.plan.topics.iter().map(|t| &t.id));
                next.plan.milestones = normalize_milestones(&milestones, &reserved)?;
            }
            (Some(topics), None) => {
                let reserved = with(&retired, next.plan.milestones.iter().map(|m| &m.id));
                next.plan.topics = normalize_topics(&topics, &reserved)?;
            }
            (None, Some(milestones)) => {
                let reserved = with(&retired, next.plan.topics.iter().map(|t| &t.id));
                next.plan.milestones = normalize_milestones(&milestones, &reserved)?;
            }
            (None, None) => {}
        }
        if next.plan.topics.is_empty() {
            return Err(ValidationError::new("topics", "must be a non-empty list"));
        }
        if let Some(schedule) = self.schedule {
            next.plan.schedule = normalize_schedule(&schedule)?;
        }
        if let Some(resources) = self.resources {
            next.plan.resources = normalize_resources(&resources)?;
        }

        if let Some(status) = self.status {
            next.status = PlanStatus::parse(&status)
                .ok_or_else(|| ValidationError::new("status", "must be `active`"))?;
        }
        if let Some(tracked) = self.is_tracked {
            next.is_tracked = tracked;
        }
        if let Some(starred) = self.is_starred {
            next.is_starred = starred;
        }
        if let Some(progress) = self.progress {
            check_progress(progress)?;
        }

        next.completed_items = match self.completed_items {
            Some(items) => completion_set(&next, items)?,
            None => {
                let trackable = ids(next.plan.trackable_ids());
                next.completed_items
                    .intersection(&trackable)
                    .cloned()
                    .collect()
            }
        };
        next.progress = compute_progress(next.completed_items.len(), next.plan.trackable_count());

        *plan = next;
        Ok(())
    }
}

pub(crate) fn check_progress(progress: i64) -> Result<(), ValidationError> {
    if (0..=100).contains(&progress) {
        Ok(())
    } else {
        Err(ValidationError::new("progress", "must be between 0 and 100"))
    }
}

/// Builds the completion set for `plan`, rejecting ids it does not contain.
pub(crate) fn completion_set(
    plan: &PersistedPlan,
    items: Vec<String>,
) -> Result<BTreeSet<CompletionId>, ValidationError> {
    items
        .into_iter()
        .map(CompletionId)
        .map(|id| {
            if plan.plan.is_trackable(&id) {
                Ok(id)
            } else {
                Err(ValidationError::new(
                    "completedItems",
                    format!("`{id}` is not a topic or milestone of this plan"),
                ))
            }
        })
        .collect()
}

fn ids<'a>(iter: impl Iterator<Item = &'a CompletionId>) -> BTreeSet<CompletionId> {
    iter.cloned().collect()
}

fn with<'a>(
    base: &'a BTreeSet<CompletionId>,
    more: impl Iterator<Item = &'a CompletionId>,
) -> BTreeSet<CompletionId> {
    base.iter().chain(more).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, PlanParameters};
    use crate::normalize::normalize_plan;
    use chrono::{NaiveDate, Utc};
    use serde_json::json;

    fn persisted() -> PersistedPlan {
        let plan = normalize_plan(&json!({
            "title": "Physics",
            "description": "Mechanics",
            "topics": ["Kinematics", "Forces", "Energy"],
            "milestones": ["Midterm"]
        }))
        .unwrap();
        let params = PlanParameters {
            subject: "Physics".into(),
            duration: 10,
            difficulty: Difficulty::Advanced,
            start_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 4, 11).unwrap(),
            goals: String::new(),
        };
        PersistedPlan::new(params, plan, Utc::now())
    }

    #[test]
    fn reordering_topics_keeps_completion_with_the_item() {
        let mut plan = persisted();
        PlanUpdate {
            completed_items: Some(vec!["topic-1".into()]),
            ..Default::default()
        }
        .apply_to(&mut plan)
        .unwrap();
        assert_eq!(plan.progress, 25);

        let reordered: Vec<Value> = plan
            .plan
            .topics
            .iter()
            .rev()
            .map(|t| serde_json::to_value(t).unwrap())
            .collect();
        PlanUpdate {
            topics: Some(reordered),
            ..Default::default()
        }
        .apply_to(&mut plan)
        .unwrap();

        assert_eq!(plan.plan.topics[1].name, "Forces");
        assert_eq!(plan.plan.topics[1].id.as_str(), "topic-1");
        assert!(plan.completed_items.contains(&CompletionId::topic(1)));
        assert_eq!(plan.progress, 25);
    }

    #[test]
    fn removing_an_item_prunes_its_completion() {
        let mut plan = persisted();
        plan.completed_items = BTreeSet::from([CompletionId::topic(2), CompletionId::milestone(0)]);

        PlanUpdate {
            topics: Some(vec![json!({"id": "topic-0", "name": "Kinematics"})]),
            ..Default::default()
        }
        .apply_to(&mut plan)
        .unwrap();

        assert_eq!(
            plan.completed_items,
            BTreeSet::from([CompletionId::milestone(0)])
        );
        assert_eq!(plan.progress, 50);
    }

    #[test]
    fn new_items_do_not_collide_with_existing_ids() {
        let mut plan = persisted();
        PlanUpdate {
            milestones: Some(vec![json!({"id": "topic-0", "name": "Clash"})]),
            ..Default::default()
        }
        .apply_to(&mut plan)
        .unwrap();

        let id = plan.plan.milestones[0].id.as_str();
        assert!(id.starts_with("milestone-"));
        assert_ne!(id, "topic-0");
        // The replaced milestone's id is not reused either.
        assert_ne!(id, "milestone-0");
    }

    #[test]
    fn new_item_never_inherits_a_removed_items_completion() {
        let mut plan = persisted();
        PlanUpdate {
            completed_items: Some(vec!["topic-2".into()]),
            ..Default::default()
        }
        .apply_to(&mut plan)
        .unwrap();
        assert_eq!(plan.progress, 25);

        PlanUpdate {
            topics: Some(vec![
                json!({"id": "topic-0", "name": "Kinematics"}),
                json!({"id": "topic-1", "name": "Forces"}),
                json!("Thermodynamics"),
            ]),
            ..Default::default()
        }
        .apply_to(&mut plan)
        .unwrap();

        let added = &plan.plan.topics[2];
        assert_eq!(added.name, "Thermodynamics");
        assert_ne!(added.id, CompletionId::topic(2));
        assert!(plan.completed_items.is_empty());
        assert_eq!(plan.progress, 0);
    }

    #[test]
    fn invalid_updates_leave_the_plan_untouched() {
        let mut plan = persisted();
        let before = plan.clone();

        let err = PlanUpdate {
            title: Some("Renamed".into()),
            completed_items: Some(vec!["topic-7".into()]),
            ..Default::default()
        }
        .apply_to(&mut plan)
        .unwrap_err();
        assert_eq!(err.field, "completedItems");
        assert_eq!(plan, before);

        let err = PlanUpdate {
            progress: Some(101),
            ..Default::default()
        }
        .apply_to(&mut plan)
        .unwrap_err();
        assert_eq!(err.field, "progress");

        let err = PlanUpdate {
            topics: Some(vec![json!(12)]),
            ..Default::default()
        }
        .apply_to(&mut plan)
        .unwrap_err();
        assert_eq!(err.field, "topics[0]");
    }

    #[test]
    fn completed_topics_alias_is_accepted() {
        let update: PlanUpdate =
            serde_json::from_value(json!({"completedTopics": ["topic-0"], "isStarred": true}))
                .unwrap();
        let mut plan = persisted();
        update.apply_to(&mut plan).unwrap();

        assert!(plan.is_starred);
        assert_eq!(plan.progress, 25);
    }
}
