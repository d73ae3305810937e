pub mod collection;
pub mod domain;
pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod ports;
pub mod progress;
pub mod prompt;
pub mod retry;
pub mod service;
pub mod star;
pub mod update;
pub mod validation;

pub use collection::PlanCollection;
pub use domain::{
    CompletionId, Difficulty, GeneratedPlan, Milestone, PersistedPlan, PlanId, PlanParameters,
    PlanStatus, ProgressSnapshot, Resource, ScheduleEntry, Topic, UserId,
};
pub use pipeline::{GenerationError, PlanGenerator};
pub use ports::{
    GenerationBackend, GenerationConfig, PlanRepository, PortError, PortResult, UpstreamError,
    UpstreamErrorKind,
};
pub use progress::{compute_progress, ProgressTracker, SyncStatus, TrackerError, TrackerState};
pub use retry::{RetryPolicy, RetryingBackend};
pub use service::{GenerateOutcome, PlanError, PlanService};
pub use star::StarToggle;
pub use update::PlanUpdate;
pub use validation::{validate_request, PlanRequest, ValidationError};
