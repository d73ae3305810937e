//! crates/study_plan_core/src/extract.rs
//!
//! Locates the JSON object inside free-form generation output and parses it.
//! No semantic checks happen here; see `normalize` for that.

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum MalformedResponseError {
    #[error("generation output contains no JSON object")]
    NoObject,
    #[error("generation output contains an unbalanced JSON object")]
    Unbalanced,
    #[error("generation output is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Extracts and parses the first balanced `{...}` span of `raw`.
pub fn extract_json_object(raw: &str) -> Result<Value, MalformedResponseError> {
    let span = find_object_span(raw)?;
    Ok(serde_json::from_str(span)?)
}

/// Brace-depth scan starting at the first `{`. Braces inside JSON string
/// literals (including escaped quotes) do not count.
fn find_object_span(raw: &str) -> Result<&str, MalformedResponseError> {
    let start = raw.find('{').ok_or(MalformedResponseError::NoObject)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Ok(&raw[start..end]);
                }
            }
            _ => {}
        }
    }

    Err(MalformedResponseError::Unbalanced)
}
