//! crates/study_plan_core/src/validation.rs
//!
//! Turns the raw, client-supplied request into validated `PlanParameters`.

use chrono::{DateTime, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::{Difficulty, PlanParameters};

pub const MIN_DURATION_DAYS: i64 = 1;
pub const MAX_DURATION_DAYS: i64 = 365;

/// The first offending field of a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid `{field}`: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The request body as the client sends it. Every field is optional here so
/// that a missing field is reported by name instead of as a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub subject: Option<String>,
    pub duration: Option<Value>,
    pub difficulty: Option<String>,
    pub start_date: Option<String>,
    /// Accepted for compatibility and ignored: the end date is always derived.
    pub end_date: Option<String>,
    pub goals: Option<String>,
}

/// Validates a request against the calendar day `today` of the caller.
pub fn validate_request(
    request: &PlanRequest,
    today: NaiveDate,
) -> Result<PlanParameters, ValidationError> {
    let subject = request
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ValidationError::new("subject", "must not be empty"))?
        .to_string();

    let duration = parse_duration(request.duration.as_ref())?;

    let difficulty_label = request
        .difficulty
        .as_deref()
        .ok_or_else(|| ValidationError::new("difficulty", "is required"))?;
    let difficulty = Difficulty::parse(difficulty_label).ok_or_else(|| {
        let allowed: Vec<&str> = Difficulty::ALL.iter().map(|d| d.as_str()).collect();
        ValidationError::new(
            "difficulty",
            format!("must be one of {}", allowed.join(", ")),
        )
    })?;

    let start_raw = request
        .start_date
        .as_deref()
        .ok_or_else(|| ValidationError::new("startDate", "is required"))?;
    let start_date = parse_date(start_raw)
        .ok_or_else(|| ValidationError::new("startDate", "must be a date in YYYY-MM-DD form"))?;
    if start_date < today {
        return Err(ValidationError::new(
            "startDate",
            format!("must not be earlier than {today}"),
        ));
    }

    let end_date = start_date
        .checked_add_days(Days::new(u64::from(duration)))
        .ok_or_else(|| ValidationError::new("startDate", "is out of range"))?;

    if let Some(client_end) = request.end_date.as_deref() {
        if parse_date(client_end) != Some(end_date) {
            debug!(client_end, derived_end = %end_date, "ignoring client-supplied end date");
        }
    }

    let goals = request
        .goals
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    Ok(PlanParameters {
        subject,
        duration,
        difficulty,
        start_date,
        end_date,
        goals,
    })
}

fn parse_duration(value: Option<&Value>) -> Result<u32, ValidationError> {
    let invalid = || ValidationError::new("duration", "must be a whole number of days");
    let days = match value {
        None | Some(Value::Null) => {
            return Err(ValidationError::new("duration", "is required"));
        }
        Some(Value::Number(n)) => match n.as_i64() {
            Some(days) => days,
            None => match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 => f as i64,
                _ => return Err(invalid()),
            },
        },
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid())?,
        Some(_) => return Err(invalid()),
    };

    if !(MIN_DURATION_DAYS..=MAX_DURATION_DAYS).contains(&days) {
        return Err(ValidationError::new(
            "duration",
            format!("must be between {MIN_DURATION_DAYS} and {MAX_DURATION_DAYS} days"),
        ));
    }
    u32::try_from(days).map_err(|_| invalid())
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (its calendar date is used).
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn request() -> PlanRequest {
        PlanRequest {
            subject: Some("Algebra".into()),
            duration: Some(json!(7)),
            difficulty: Some("easy".into()),
            start_date: Some("2024-01-01".into()),
            end_date: None,
            goals: Some("Pass the midterm".into()),
        }
    }

    #[test]
    fn end_date_is_derived_from_duration() {
        let mut req = request();
        req.end_date = Some("2030-12-31".into());

        let params = validate_request(&req, today()).unwrap();

        assert_eq!(params.start_date, today());
        assert_eq!(params.end_date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(params.duration, 7);
        assert_eq!(params.difficulty, Difficulty::Easy);
    }

    #[test]
    fn subject_is_trimmed_and_required() {
        let mut req = request();
        req.subject = Some("  Linear Algebra ".into());
        assert_eq!(validate_request(&req, today()).unwrap().subject, "Linear Algebra");

        req.subject = Some("   ".into());
        let err = validate_request(&req, today()).unwrap_err();
        assert_eq!(err.field, "subject");
    }

    #[test]
    fn duration_outside_range_is_rejected_not_clamped() {
        for bad in [json!(0), json!(366), json!(-3)] {
            let mut req = request();
            req.duration = Some(bad);
            let err = validate_request(&req, today()).unwrap_err();
            assert_eq!(err.field, "duration");
        }

        let mut req = request();
        req.duration = Some(json!(365));
        assert!(validate_request(&req, today()).is_ok());
    }

    #[test]
    fn duration_accepts_numeric_strings_but_not_fractions() {
        let mut req = request();
        req.duration = Some(json!("14"));
        assert_eq!(validate_request(&req, today()).unwrap().duration, 14);

        req.duration = Some(json!(2.5));
        assert_eq!(validate_request(&req, today()).unwrap_err().field, "duration");

        req.duration = None;
        assert_eq!(validate_request(&req, today()).unwrap_err().field, "duration");
    }

    #[test]
    fn difficulty_must_be_enumerated() {
        let mut req = request();
        req.difficulty = Some("Advanced".into());
        assert_eq!(
            validate_request(&req, today()).unwrap().difficulty,
            Difficulty::Advanced
        );

        req.difficulty = Some("impossible".into());
        assert_eq!(validate_request(&req, today()).unwrap_err().field, "difficulty");
    }

    #[test]
    fn start_date_in_the_past_is_rejected() {
        let mut req = request();
        req.start_date = Some("2023-12-31".into());
        assert_eq!(validate_request(&req, today()).unwrap_err().field, "startDate");

        req.start_date = Some("not a date".into());
        assert_eq!(validate_request(&req, today()).unwrap_err().field, "startDate");
    }

    #[test]
    fn first_offending_field_is_reported() {
        let req = PlanRequest::default();
        assert_eq!(validate_request(&req, today()).unwrap_err().field, "subject");
    }

    #[test]
    fn rfc3339_start_dates_use_their_calendar_day() {
        let mut req = request();
        req.start_date = Some("2024-01-02T09:30:00Z".into());
        let params = validate_request(&req, today()).unwrap();
        assert_eq!(params.start_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }
}
