//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use study_plan_core::{
    GeneratedPlan, PersistedPlan, PlanId, PlanRequest, PlanUpdate, ProgressSnapshot, UserId,
};
use utoipa::{OpenApi, ToSchema};

use crate::error::ApiError;
use crate::web::response::{ApiRejection, ApiResponse, ResponseEnvelope};
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        generate_plan_handler,
        save_plan_handler,
        list_plans_handler,
        get_plan_handler,
        update_plan_handler,
        update_progress_handler,
        toggle_star_handler,
        delete_plan_handler,
        health_handler,
    ),
    components(
        schemas(ResponseEnvelope, SavePlanRequest, ProgressRequest, StarRequest, HealthResponse)
    ),
    tags(
        (name = "Study Planner API", description = "Generate study plans and track progress against them.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    pub save: Option<bool>,
}

/// Payload of a successful generation or save.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEnvelopeData {
    pub plan_id: Option<PlanId>,
    pub plan: GeneratedPlan,
}

/// A previously generated plan and the parameters it was generated from.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SavePlanRequest {
    #[schema(value_type = Object)]
    pub params: PlanRequest,
    #[schema(value_type = Object)]
    pub plan: Value,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    pub progress: i64,
    #[serde(default, alias = "completedItems")]
    pub completed_topics: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StarRequest {
    pub is_starred: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn body<T>(
    state: &AppState,
    payload: Result<Json<T>, JsonRejection>,
    message: &str,
) -> Result<T, ApiRejection> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|e| state.reject(ApiError::BadRequest(e.body_text()), message))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Generate a study plan, persisting it unless `save=false`.
#[utoipa::path(
    post,
    path = "/plans/generate",
    request_body(content_type = "application/json", description = "subject, duration, difficulty, startDate and goals."),
    params(
        ("save" = Option<bool>, Query, description = "Persist the generated plan (default true)."),
        ("x-user-id" = String, Header, description = "The calling user.")
    ),
    responses(
        (status = 201, description = "Plan generated", body = ResponseEnvelope),
        (status = 400, description = "Invalid plan parameters", body = ResponseEnvelope),
        (status = 502, description = "Generation failed or produced an unusable plan", body = ResponseEnvelope),
        (status = 503, description = "Generation backend rate limited", body = ResponseEnvelope)
    )
)]
pub async fn generate_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<GenerateQuery>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiRejection> {
    const FAILED: &str = "Failed to generate study plan";
    let request = body(&state, payload, FAILED)?;
    let save = query.save.unwrap_or(true);

    let outcome = state
        .service
        .generate_plan(&user_id, &request, save, Utc::now().date_naive())
        .await
        .map_err(|e| state.reject(e, FAILED))?;

    let message = if outcome.plan_id.is_some() {
        "Plan generated and saved successfully"
    } else {
        "Plan generated successfully (not saved)"
    };
    let data = PlanEnvelopeData {
        plan_id: outcome.plan_id,
        plan: outcome.plan,
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(data, message)),
    ))
}

/// Persist a plan that was generated with `save=false`.
#[utoipa::path(
    post,
    path = "/plans/save",
    request_body = SavePlanRequest,
    params(("x-user-id" = String, Header, description = "The calling user.")),
    responses(
        (status = 201, description = "Plan saved", body = ResponseEnvelope),
        (status = 400, description = "Invalid parameters or plan", body = ResponseEnvelope)
    )
)]
pub async fn save_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    payload: Result<Json<SavePlanRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiRejection> {
    const FAILED: &str = "Failed to save study plan";
    let request = body(&state, payload, FAILED)?;

    let saved = state
        .service
        .save_plan(&user_id, &request.params, &request.plan, Utc::now().date_naive())
        .await
        .map_err(|e| state.reject(e, FAILED))?;

    let data = PlanEnvelopeData {
        plan_id: Some(saved.id),
        plan: saved.plan,
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(data, "Plan saved successfully")),
    ))
}

/// List the caller's plans, newest first.
#[utoipa::path(
    get,
    path = "/plans",
    params(("x-user-id" = String, Header, description = "The calling user.")),
    responses((status = 200, description = "The caller's plans", body = ResponseEnvelope))
)]
pub async fn list_plans_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<ApiResponse<Vec<PersistedPlan>>>, ApiRejection> {
    let plans = state
        .service
        .list_plans(&user_id)
        .await
        .map_err(|e| state.reject(e, "Failed to retrieve user plans"))?;
    Ok(Json(ApiResponse::data(plans)))
}

#[utoipa::path(
    get,
    path = "/plans/{id}",
    params(
        ("id" = String, Path, description = "Plan id."),
        ("x-user-id" = String, Header, description = "The calling user.")
    ),
    responses(
        (status = 200, description = "The plan", body = ResponseEnvelope),
        (status = 404, description = "No such plan for this user", body = ResponseEnvelope)
    )
)]
pub async fn get_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PersistedPlan>>, ApiRejection> {
    let plan = state
        .service
        .get_plan(&user_id, &PlanId(id))
        .await
        .map_err(|e| state.reject(e, "Failed to retrieve the plan"))?;
    Ok(Json(ApiResponse::data(plan)))
}

/// Update any editable field. Lists are re-normalized and progress re-derived.
#[utoipa::path(
    put,
    path = "/plans/{id}",
    request_body(content_type = "application/json", description = "Any subset of the plan's editable fields."),
    params(
        ("id" = String, Path, description = "Plan id."),
        ("x-user-id" = String, Header, description = "The calling user.")
    ),
    responses(
        (status = 200, description = "Plan updated", body = ResponseEnvelope),
        (status = 400, description = "Invalid update", body = ResponseEnvelope),
        (status = 404, description = "No such plan for this user", body = ResponseEnvelope)
    )
)]
pub async fn update_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    payload: Result<Json<PlanUpdate>, JsonRejection>,
) -> Result<Json<ApiResponse<PersistedPlan>>, ApiRejection> {
    const FAILED: &str = "Failed to update the plan";
    let update = body(&state, payload, FAILED)?;

    let plan = state
        .service
        .update_plan(&user_id, &PlanId(id), update)
        .await
        .map_err(|e| state.reject(e, FAILED))?;
    Ok(Json(ApiResponse::with_message(plan, "Plan updated successfully")))
}

#[utoipa::path(
    patch,
    path = "/plans/{id}/progress",
    request_body = ProgressRequest,
    params(
        ("id" = String, Path, description = "Plan id."),
        ("x-user-id" = String, Header, description = "The calling user.")
    ),
    responses(
        (status = 200, description = "Progress stored", body = ResponseEnvelope),
        (status = 400, description = "Out-of-range progress or unknown item", body = ResponseEnvelope),
        (status = 404, description = "No such plan for this user", body = ResponseEnvelope)
    )
)]
pub async fn update_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    payload: Result<Json<ProgressRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ProgressSnapshot>>, ApiRejection> {
    const FAILED: &str = "Failed to update progress";
    let request = body(&state, payload, FAILED)?;

    let snapshot = state
        .service
        .update_progress(&user_id, &PlanId(id), request.progress, request.completed_topics)
        .await
        .map_err(|e| state.reject(e, FAILED))?;
    Ok(Json(ApiResponse::with_message(
        snapshot,
        "Progress updated successfully",
    )))
}

#[utoipa::path(
    patch,
    path = "/plans/{id}/star",
    request_body = StarRequest,
    params(
        ("id" = String, Path, description = "Plan id."),
        ("x-user-id" = String, Header, description = "The calling user.")
    ),
    responses(
        (status = 200, description = "Star flag stored", body = ResponseEnvelope),
        (status = 404, description = "No such plan for this user", body = ResponseEnvelope)
    )
)]
pub async fn toggle_star_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    payload: Result<Json<StarRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, ApiRejection> {
    const FAILED: &str = "Failed to update star status";
    let request = body(&state, payload, FAILED)?;

    let starred = state
        .service
        .set_starred(&user_id, &PlanId(id), request.is_starred)
        .await
        .map_err(|e| state.reject(e, FAILED))?;
    let message = if starred {
        "Plan starred successfully"
    } else {
        "Plan unstarred successfully"
    };
    Ok(Json(ApiResponse::message(message)))
}

#[utoipa::path(
    delete,
    path = "/plans/{id}",
    params(
        ("id" = String, Path, description = "Plan id."),
        ("x-user-id" = String, Header, description = "The calling user.")
    ),
    responses(
        (status = 200, description = "Plan deleted", body = ResponseEnvelope),
        (status = 404, description = "No such plan for this user", body = ResponseEnvelope)
    )
)]
pub async fn delete_plan_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiRejection> {
    state
        .service
        .delete_plan(&user_id, &PlanId(id))
        .await
        .map_err(|e| state.reject(e, "Failed to delete the plan"))?;
    Ok(Json(ApiResponse::message("Plan deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn fallback_handler() -> ApiRejection {
    ApiRejection::new(StatusCode::NOT_FOUND, "Route not found")
}
