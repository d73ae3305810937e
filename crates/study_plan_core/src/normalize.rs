//! crates/study_plan_core/src/normalize.rs
//!
//! Validates parsed generation output and coerces it into the canonical
//! `GeneratedPlan`. This is the only module that knows about field aliases
//! (`title`/`name`, `hours`/`estimatedHours`) and about the string-or-object
//! shapes list items arrive in. Normalization is idempotent: feeding the
//! serialized output back in yields the same plan.

use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

use crate::domain::{CompletionId, GeneratedPlan, Milestone, Resource, ScheduleEntry, Topic};

/// A missing or invalid field in generation output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid plan field `{field}`: {message}")]
pub struct SchemaError {
    pub field: String,
    pub message: String,
}

impl SchemaError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

//=========================================================================================
// Item shapes
//=========================================================================================

/// The two shapes a topic, resource or milestone may take in generation output.
#[derive(Debug, Clone, PartialEq)]
enum RawItem {
    Plain {
        text: String,
    },
    Named {
        id: Option<String>,
        title: String,
        description: Option<String>,
        url: Option<String>,
        date: Option<String>,
    },
}

impl RawItem {
    fn parse(value: &Value, field: &str) -> Result<Self, SchemaError> {
        match value {
            Value::String(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(SchemaError::new(field, "must not be empty"));
                }
                Ok(RawItem::Plain {
                    text: text.to_string(),
                })
            }
            Value::Object(obj) => {
                let title = match optional_text(obj, "title", field)? {
                    Some(title) => Some(title),
                    None => optional_text(obj, "name", field)?,
                };
                let title = title
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| SchemaError::new(field, "needs a `title` or `name`"))?;
                Ok(RawItem::Named {
                    id: optional_text(obj, "id", field)?,
                    title,
                    description: optional_text(obj, "description", field)?,
                    url: optional_text(obj, "url", field)?,
                    date: optional_text(obj, "date", field)?,
                })
            }
            _ => Err(SchemaError::new(
                field,
                "must be a string or an object with a `title` or `name`",
            )),
        }
    }

    fn name(&self) -> &str {
        match self {
            RawItem::Plain { text } => text,
            RawItem::Named { title, .. } => title,
        }
    }

    fn requested_id(&self) -> Option<&str> {
        match self {
            RawItem::Named { id: Some(id), .. } if !id.trim().is_empty() => Some(id.trim()),
            _ => None,
        }
    }

    fn into_parts(self) -> ItemParts {
        match self {
            RawItem::Plain { text } => ItemParts {
                name: text,
                description: None,
                url: None,
                date: None,
            },
            RawItem::Named {
                title,
                description,
                url,
                date,
                ..
            } => ItemParts {
                name: title,
                description,
                url,
                date,
            },
        }
    }
}

struct ItemParts {
    name: String,
    description: Option<String>,
    url: Option<String>,
    date: Option<String>,
}

/// Reads an optional scalar field as text. Numbers and booleans are rendered;
/// nested arrays or objects are rejected.
fn optional_text(
    obj: &Map<String, Value>,
    key: &str,
    field: &str,
) -> Result<Option<String>, SchemaError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(SchemaError::new(
            format!("{field}.{key}"),
            "must be a plain value",
        )),
    }
}

//=========================================================================================
// Completion id assignment
//=========================================================================================

/// Gives every trackable item a unique id. Ids already present are kept if
/// they are unique; the rest get `{prefix}-{index}`, or a random suffix when
/// that positional id is already taken.
fn assign_ids(prefix: &str, items: &[RawItem], taken: &mut HashSet<String>) -> Vec<CompletionId> {
    let mut assigned: Vec<Option<String>> = items
        .iter()
        .map(|item| {
            item.requested_id()
                .filter(|id| taken.insert(id.to_string()))
                .map(str::to_string)
        })
        .collect();

    for (index, slot) in assigned.iter_mut().enumerate() {
        if slot.is_some() {
            continue;
        }
        let mut candidate = format!("{prefix}-{index}");
        while !taken.insert(candidate.clone()) {
            let suffix = Uuid::new_v4().simple().to_string();
            candidate = format!("{prefix}-{}", &suffix[..8]);
        }
        *slot = Some(candidate);
    }

    assigned
        .into_iter()
        .map(|id| CompletionId(id.unwrap_or_default()))
        .collect()
}

fn parse_items(values: &[Value], field: &str) -> Result<Vec<RawItem>, SchemaError> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| RawItem::parse(v, &format!("{field}[{i}]")))
        .collect()
}

/// Ids that items in `values` ask to keep.
pub fn requested_ids(values: &[Value]) -> impl Iterator<Item = CompletionId> + '_ {
    values.iter().filter_map(|value| match value.get("id")? {
        Value::String(id) if !id.trim().is_empty() => Some(CompletionId(id.trim().to_string())),
        Value::Number(n) => Some(CompletionId(n.to_string())),
        _ => None,
    })
}

fn taken_from(reserved: &BTreeSet<CompletionId>) -> HashSet<String> {
    reserved.iter().map(|id| id.0.clone()).collect()
}

//=========================================================================================
// Per-list normalizers (also used when a client edits a persisted plan)
//=========================================================================================

/// Normalizes topics. `reserved` holds ids already used by the plan's milestones.
pub fn normalize_topics(
    values: &[Value],
    reserved: &BTreeSet<CompletionId>,
) -> Result<Vec<Topic>, SchemaError> {
    let items = parse_items(values, "topics")?;
    let ids = assign_ids("topic", &items, &mut taken_from(reserved));
    Ok(items
        .into_iter()
        .zip(ids)
        .map(|(item, id)| {
            let parts = item.into_parts();
            Topic {
                id,
                name: parts.name,
                description: parts.description,
            }
        })
        .collect())
}

/// Normalizes milestones. `reserved` holds ids already used by the plan's topics.
pub fn normalize_milestones(
    values: &[Value],
    reserved: &BTreeSet<CompletionId>,
) -> Result<Vec<Milestone>, SchemaError> {
    let items = parse_items(values, "milestones")?;
    let ids = assign_ids("milestone", &items, &mut taken_from(reserved));
    Ok(items
        .into_iter()
        .zip(ids)
        .map(|(item, id)| {
            let parts = item.into_parts();
            Milestone {
                id,
                name: parts.name,
                description: parts.description,
                date: parts.date,
            }
        })
        .collect())
}

pub fn normalize_resources(values: &[Value]) -> Result<Vec<Resource>, SchemaError> {
    Ok(parse_items(values, "resources")?
        .into_iter()
        .map(|item| {
            let parts = item.into_parts();
            Resource {
                name: parts.name,
                description: parts.description,
                url: parts.url,
            }
        })
        .collect())
}

pub fn normalize_schedule(values: &[Value]) -> Result<Vec<ScheduleEntry>, SchemaError> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| schedule_entry(v, &format!("schedule[{i}]")))
        .collect()
}

fn schedule_entry(value: &Value, field: &str) -> Result<ScheduleEntry, SchemaError> {
    let obj = value
        .as_object()
        .ok_or_else(|| SchemaError::new(field, "must be an object"))?;

    let date = optional_text(obj, "date", field)?
        .ok_or_else(|| SchemaError::new(format!("{field}.date"), "is required"))?;

    let topics_field = format!("{field}.topics");
    let topics = match obj.get("topics") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => parse_items(items, &topics_field)?
            .iter()
            .map(RawItem::name)
            .collect::<Vec<_>>()
            .join(", "),
        None | Some(Value::Null) => {
            return Err(SchemaError::new(topics_field, "is required"));
        }
        Some(_) => {
            return Err(SchemaError::new(
                topics_field,
                "must be a string or a list of strings",
            ));
        }
    };

    let hours = match obj.get("hours").filter(|v| !v.is_null()) {
        Some(v) => Some(v),
        None => obj.get("estimatedHours").filter(|v| !v.is_null()),
    };
    let hours = match hours {
        None => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(_) => {
            return Err(SchemaError::new(format!("{field}.hours"), "must be a number"));
        }
    };

    Ok(ScheduleEntry { date, topics, hours })
}

//=========================================================================================
// Whole-plan normalizer
//=========================================================================================

/// Checks required fields and produces the canonical plan.
pub fn normalize_plan(value: &Value) -> Result<GeneratedPlan, SchemaError> {
    let obj = value
        .as_object()
        .ok_or_else(|| SchemaError::new("$", "must be a JSON object"))?;

    let title = match obj.get("title") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(SchemaError::new("title", "must be a non-empty string")),
    };
    let description = match obj.get("description") {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => return Err(SchemaError::new("description", "must be a string")),
    };

    let topic_values = optional_list(obj, "topics")?
        .filter(|list| !list.is_empty())
        .ok_or_else(|| SchemaError::new("topics", "must be a non-empty list"))?;
    let schedule_values = optional_list(obj, "schedule")?.unwrap_or_default();
    let resource_values = optional_list(obj, "resources")?.unwrap_or_default();
    let milestone_values = optional_list(obj, "milestones")?.unwrap_or_default();

    if schedule_values.is_empty() && resource_values.is_empty() && milestone_values.is_empty() {
        return Err(SchemaError::new(
            "schedule",
            "plan needs at least one of schedule, resources or milestones",
        ));
    }

    let topics = normalize_topics(topic_values, &BTreeSet::new())?;
    let topic_ids: BTreeSet<CompletionId> = topics.iter().map(|t| t.id.clone()).collect();
    let milestones = normalize_milestones(milestone_values, &topic_ids)?;

    Ok(GeneratedPlan {
        title,
        description,
        topics,
        schedule: normalize_schedule(schedule_values)?,
        resources: normalize_resources(resource_values)?,
        milestones,
    })
}

fn optional_list<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a [Value]>, SchemaError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.as_slice())),
        Some(_) => Err(SchemaError::new(key, "must be a list")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "title": "Algebra Study Plan",
            "description": "One week of algebra",
            "topics": [
                "Linear equations",
                {"title": "Quadratics", "description": "Factoring and the formula"},
                {"name": "Inequalities"}
            ],
            "schedule": [
                {"date": "2024-01-01", "topics": ["Linear equations", "Practice"], "hours": 2},
                {"date": "2024-01-02", "topics": "Quadratics", "estimatedHours": 1.5},
                {"date": "2024-01-03", "topics": "Review"}
            ],
            "resources": [
                {"title": "Khan Academy", "url": "https://www.khanacademy.org"},
                "Textbook chapter 3"
            ],
            "milestones": [
                {"name": "Quiz 1", "date": "2024-01-04"},
                {"title": "Final review", "description": "Everything"}
            ]
        })
    }

    #[test]
    fn resolves_item_shapes_to_canonical_records() {
        let plan = normalize_plan(&sample()).unwrap();

        let names: Vec<&str> = plan.topics.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Linear equations", "Quadratics", "Inequalities"]);
        assert_eq!(
            plan.topics[1].description.as_deref(),
            Some("Factoring and the formula")
        );
        assert_eq!(plan.resources[0].name, "Khan Academy");
        assert_eq!(plan.resources[1].name, "Textbook chapter 3");
        assert_eq!(plan.milestones[0].date.as_deref(), Some("2024-01-04"));
        assert_eq!(plan.milestones[1].name, "Final review");
    }

    #[test]
    fn assigns_positional_completion_ids() {
        let plan = normalize_plan(&sample()).unwrap();

        let ids: Vec<&str> = plan.trackable_ids().map(|id| id.as_str()).collect();
        assert_eq!(
            ids,
            ["topic-0", "topic-1", "topic-2", "milestone-0", "milestone-1"]
        );
    }

    #[test]
    fn schedule_topics_are_joined_and_hours_aliased() {
        let plan = normalize_plan(&sample()).unwrap();

        assert_eq!(plan.schedule[0].topics, "Linear equations, Practice");
        assert_eq!(plan.schedule[0].hours, Some(2.0));
        assert_eq!(plan.schedule[1].hours, Some(1.5));
        assert_eq!(plan.schedule[2].hours, None);
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_plan(&sample()).unwrap();
        let twice = normalize_plan(&serde_json::to_value(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn equivalent_topic_shapes_normalize_identically() {
        let base = |topics: Value| {
            json!({
                "title": "T",
                "description": "D",
                "topics": topics,
                "resources": ["R"]
            })
        };

        let plain = normalize_plan(&base(json!(["Sets", "Maps"]))).unwrap();
        let titled = normalize_plan(&base(json!([{"title": "Sets"}, {"title": "Maps"}]))).unwrap();
        let named = normalize_plan(&base(json!([{"name": "Sets"}, {"name": "Maps"}]))).unwrap();

        assert_eq!(plain, titled);
        assert_eq!(plain, named);
    }

    #[test]
    fn title_wins_over_name() {
        let value = json!({
            "title": "T", "description": "D",
            "topics": [
                {"title": "Preferred", "name": "Ignored"},
                {"title": "Also preferred", "name": ["not", "a", "title"]}
            ],
            "resources": ["R"]
        });
        let plan = normalize_plan(&value).unwrap();
        assert_eq!(plan.topics[0].name, "Preferred");
        assert_eq!(plan.topics[1].name, "Also preferred");
    }

    #[test]
    fn keeps_unique_existing_ids_and_replaces_duplicates() {
        let value = json!({
            "title": "T", "description": "D",
            "topics": [{"id": "algebra", "name": "A"}, {"id": "algebra", "name": "B"}],
            "milestones": [{"id": "algebra", "name": "M"}]
        });
        let plan = normalize_plan(&value).unwrap();

        assert_eq!(plan.topics[0].id.as_str(), "algebra");
        assert_eq!(plan.topics[1].id.as_str(), "topic-1");
        assert_eq!(plan.milestones[0].id.as_str(), "milestone-0");
    }

    #[test]
    fn missing_required_fields_are_named() {
        let cases = [
            (json!({"description": "D", "topics": ["a"], "resources": ["r"]}), "title"),
            (json!({"title": "T", "topics": ["a"], "resources": ["r"]}), "description"),
            (json!({"title": "T", "description": "D", "resources": ["r"]}), "topics"),
            (json!({"title": "T", "description": "D", "topics": [], "resources": ["r"]}), "topics"),
            (json!({"title": "T", "description": "D", "topics": ["a"]}), "schedule"),
        ];
        for (value, field) in cases {
            assert_eq!(normalize_plan(&value).unwrap_err().field, field);
        }
    }

    #[test]
    fn unknown_item_shapes_are_rejected() {
        let value = json!({
            "title": "T", "description": "D",
            "topics": ["ok", 42],
            "resources": ["r"]
        });
        assert_eq!(normalize_plan(&value).unwrap_err().field, "topics[1]");

        let value = json!({
            "title": "T", "description": "D",
            "topics": [{"description": "no name"}],
            "resources": ["r"]
        });
        assert_eq!(normalize_plan(&value).unwrap_err().field, "topics[0]");
    }

    #[test]
    fn schedule_entries_need_a_date_and_numeric_hours() {
        let value = json!({
            "title": "T", "description": "D", "topics": ["a"],
            "schedule": [{"topics": "a"}]
        });
        assert_eq!(normalize_plan(&value).unwrap_err().field, "schedule[0].date");

        let value = json!({
            "title": "T", "description": "D", "topics": ["a"],
            "schedule": [{"date": "2024-01-01", "topics": "a", "hours": "two"}]
        });
        assert_eq!(normalize_plan(&value).unwrap_err().field, "schedule[0].hours");
    }
}
