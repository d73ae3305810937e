//! crates/study_plan_core/src/domain.rs
//!
//! Defines the core data structures for the application: the parameters a
//! user chooses, the canonical plan produced by generation, and the persisted
//! plan that progress tracking mutates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

//=========================================================================================
// Identifiers
//=========================================================================================

/// The authenticated caller. Resolved outside the core and treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a persisted plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub String);

impl PlanId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of one trackable item (topic or milestone) within a plan.
///
/// Assigned once at normalization time and stored with the item, so the
/// identity survives later reordering of the plan's lists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionId(pub String);

impl CompletionId {
    pub fn topic(index: usize) -> Self {
        Self(format!("topic-{index}"))
    }

    pub fn milestone(index: usize) -> Self {
        Self(format!("milestone-{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompletionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CompletionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

//=========================================================================================
// Plan Parameters
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Easy,
    Medium,
    Advanced,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Beginner,
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Advanced,
        Difficulty::Expert,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Advanced => "advanced",
            Difficulty::Expert => "expert",
        }
    }

    /// Case-insensitive lookup of a difficulty label.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated generation inputs. `end_date` is always `start_date + duration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanParameters {
    pub subject: String,
    pub duration: u32,
    pub difficulty: Difficulty,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub goals: String,
}

//=========================================================================================
// Generated Plan (canonical shape produced by the normalizer)
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: CompletionId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub date: String,
    /// What to study that day, already joined into a single display string.
    pub topics: String,
    pub hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: CompletionId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Passed through verbatim from generation output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub title: String,
    pub description: String,
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl GeneratedPlan {
    /// Ids of every individually trackable item: topics first, then milestones.
    pub fn trackable_ids(&self) -> impl Iterator<Item = &CompletionId> + '_ {
        self.topics
            .iter()
            .map(|t| &t.id)
            .chain(self.milestones.iter().map(|m| &m.id))
    }

    pub fn trackable_count(&self) -> usize {
        self.topics.len() + self.milestones.len()
    }

    pub fn is_trackable(&self, id: &CompletionId) -> bool {
        self.trackable_ids().any(|candidate| candidate == id)
    }
}

//=========================================================================================
// Persisted Plan
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Active,
}

impl PlanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(PlanStatus::Active),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPlan {
    pub id: PlanId,
    #[serde(flatten)]
    pub plan: GeneratedPlan,
    pub params: PlanParameters,
    pub status: PlanStatus,
    pub progress: u8,
    pub is_starred: bool,
    pub is_tracked: bool,
    pub completed_items: BTreeSet<CompletionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersistedPlan {
    /// Wraps a freshly generated plan with its initial tracking state.
    pub fn new(params: PlanParameters, plan: GeneratedPlan, now: DateTime<Utc>) -> Self {
        Self {
            id: PlanId::generate(),
            plan,
            params,
            status: PlanStatus::Active,
            progress: 0,
            is_starred: false,
            is_tracked: true,
            completed_items: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 100
    }
}

/// The completion state that is synchronized with storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub progress: u8,
    pub completed_items: BTreeSet<CompletionId>,
}
