//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::error::ApiError;
use crate::web::response::ApiRejection;
use std::sync::Arc;
use study_plan_core::PlanService;
use tracing::{error, warn};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PlanService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Logs `err` and turns it into the client-facing envelope. The error
    /// detail is attached only outside production.
    pub fn reject(&self, err: impl Into<ApiError>, message: &str) -> ApiRejection {
        let err = err.into();
        let status = err.status();
        if status.is_server_error() {
            error!(error = %err, status = status.as_u16(), "{message}");
        } else {
            warn!(error = %err, status = status.as_u16(), "{message}");
        }

        let mut rejection = ApiRejection::new(status, message);
        if !self.config.environment.is_production() {
            rejection.error = Some(err.detail());
        }
        rejection
    }
}
