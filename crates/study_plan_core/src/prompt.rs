//! crates/study_plan_core/src/prompt.rs
//!
//! Renders `PlanParameters` into the instruction sent to the generation backend.
//! The JSON skeleton in the prompt uses exactly the field names the normalizer reads.

use std::ops::RangeInclusive;

use crate::domain::PlanParameters;

pub const TOPIC_COUNT: RangeInclusive<usize> = 5..=7;
pub const MAX_SCHEDULE_ENTRIES: usize = 14;
pub const RESOURCE_COUNT: RangeInclusive<usize> = 3..=5;
pub const MILESTONE_COUNT: RangeInclusive<usize> = 3..=5;

const DEFAULT_GOAL: &str = "Master the fundamentals of the subject";

/// Builds the generation prompt. Pure and deterministic.
pub fn build_prompt(params: &PlanParameters) -> String {
    let subject = &params.subject;
    let difficulty = params.difficulty.as_str();
    let goal = if params.goals.is_empty() {
        DEFAULT_GOAL
    } else {
        params.goals.as_str()
    };

    format!(
        r#"You are an expert educational planner.
Create a detailed study plan for {subject} with these parameters:
- Duration: {duration} days (from {start} to {end})
- Difficulty: {difficulty}
- Primary Goal: {goal}

Respond with a valid JSON object only, structured like this:
{{
  "title": "{subject} Study Plan",
  "description": "A study plan for {subject} at {difficulty} level focused on: {goal}",
  "topics": ["Main Topic 1", "Main Topic 2", "Main Topic 3"],
  "schedule": [
    {{"date": "YYYY-MM-DD", "topics": "What to study", "hours": 2}}
  ],
  "resources": [
    {{"name": "Resource Name", "description": "Brief description", "url": "https://..."}}
  ],
  "milestones": [
    {{"name": "Milestone Name", "description": "Description", "date": "YYYY-MM-DD"}}
  ]
}}

Keep topics between {topic_min}-{topic_max}, include no more than {schedule_max} days in schedule, and limit resources to {resource_min}-{resource_max} items and milestones to {milestone_min}-{milestone_max} items.
Schedule dates must fall between {start} and {end}.
Return ONLY the JSON object with no extra text, no code blocks, no markdown."#,
        duration = params.duration,
        start = params.start_date,
        end = params.end_date,
        topic_min = TOPIC_COUNT.start(),
        topic_max = TOPIC_COUNT.end(),
        schedule_max = MAX_SCHEDULE_ENTRIES,
        resource_min = RESOURCE_COUNT.start(),
        resource_max = RESOURCE_COUNT.end(),
        milestone_min = MILESTONE_COUNT.start(),
        milestone_max = MILESTONE_COUNT.end(),
    )
}
