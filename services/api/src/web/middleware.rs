//! services/api/src/web/middleware.rs
//!
//! Identity middleware for protecting routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use study_plan_core::UserId;
use tracing::debug;

use crate::error::ApiError;
use crate::web::response::ApiRejection;
use crate::web::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Middleware that resolves the caller from the `x-user-id` header.
///
/// The header is set by a trusted upstream. When it is missing the configured
/// default user is assumed, if there is one; otherwise the request is
/// rejected with 401. The resolved `UserId` is inserted into the request
/// extensions for handlers to use.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiRejection> {
    let from_header = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let user_id = from_header
        .or_else(|| state.config.default_user_id.clone())
        .map(UserId)
        .ok_or_else(|| {
            let err = ApiError::Unauthorized;
            ApiRejection::new(err.status(), err.to_string())
        })?;

    debug!(user_id = %user_id, path = %req.uri().path(), "Resolved caller");
    req.extensions_mut().insert(user_id);

    Ok(next.run(req).await)
}
