//! services/api/src/adapters/http.rs
//!
//! Pieces shared by the reqwest-based generation adapters.

use reqwest::{Client, StatusCode};
use std::time::Duration;
use study_plan_core::UpstreamError;

/// Builds the HTTP client used by a generation adapter.
pub fn build_client(timeout: Duration) -> Result<Client, UpstreamError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| UpstreamError::transport(format!("failed to build HTTP client: {e}")))
}

/// Maps a non-success provider status onto the upstream error taxonomy.
pub fn map_http_error(provider: &str, status: StatusCode, body: &str) -> UpstreamError {
    let detail = format!("{provider} returned {}: {}", status.as_u16(), truncate(body, 300));
    match status {
        StatusCode::TOO_MANY_REQUESTS => UpstreamError::rate_limited(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => UpstreamError::invalid_credentials(detail),
        _ => UpstreamError::transport(detail),
    }
}

pub fn error_from_reqwest(provider: &str, err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::transport(format!("{provider} request timed out"))
    } else if err.is_connect() {
        UpstreamError::transport(format!("{provider} connection failed: {err}"))
    } else {
        UpstreamError::transport(format!("{provider} request failed: {err}"))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
