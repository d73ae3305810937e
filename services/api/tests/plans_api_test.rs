use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use planner_api_lib::{
    adapters::MemoryPlanRepository,
    build_service,
    config::{Config, Environment},
    web::{build_router, AppState},
};
use study_plan_core::{GenerationBackend, GenerationConfig, UpstreamError};

// -----------------------------------------------------------------------
// Fixtures
// -----------------------------------------------------------------------

struct CannedBackend(Result<String, UpstreamError>);

#[async_trait]
impl GenerationBackend for CannedBackend {
    fn name(&self) -> &str {
        "canned"
    }

    async fn generate(&self, _: &str, _: &GenerationConfig) -> Result<String, UpstreamError> {
        self.0.clone()
    }
}

fn good_reply() -> String {
    json!({
        "title": "Spanish Basics",
        "description": "Two weeks of Spanish",
        "topics": ["Greetings", "Numbers", {"title": "Verbs"}, "Food", {"name": "Travel"}],
        "schedule": [
            {"date": "day 1", "topics": ["Greetings"], "estimatedHours": 1},
            {"date": "day 2", "topics": "Numbers", "hours": 2}
        ],
        "resources": [{"name": "Duolingo", "url": "https://www.duolingo.com"}],
        "milestones": [{"name": "Order a meal"}, {"name": "Ask for directions"}]
    })
    .to_string()
}

fn app_with(reply: Result<String, UpstreamError>, config: Config) -> Router {
    let config = Arc::new(config);
    let service = build_service(
        &config,
        Arc::new(MemoryPlanRepository::new()),
        Arc::new(CannedBackend(reply)),
    );
    build_router(Arc::new(AppState {
        service: Arc::new(service),
        config,
    }))
}

fn app() -> Router {
    app_with(Ok(good_reply()), Config::default())
}

fn plan_request() -> Value {
    json!({
        "subject": "Spanish",
        "duration": 14,
        "difficulty": "beginner",
        "startDate": Utc::now().date_naive().to_string(),
        "goals": "Hold a simple conversation"
    })
}

// -----------------------------------------------------------------------
// HTTP helpers
// -----------------------------------------------------------------------

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", "user-1");
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_plan(app: &Router) -> String {
    let (status, body) = send(app, Method::POST, "/plans/generate", Some(plan_request())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["planId"].as_str().unwrap().to_string()
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn test_health_is_public() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_user_is_unauthorized() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/plans").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Unauthorized: No user ID provided"));
}

#[tokio::test]
async fn test_default_user_applies_without_header() {
    let config = Config {
        default_user_id: Some("demo-user".into()),
        ..Config::default()
    };
    let app = app_with(Ok(good_reply()), config);
    let response = app
        .oneshot(Request::builder().uri("/api/plans").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_generate_saves_by_default_and_lists() {
    let app = app();

    let (status, body) = send(&app, Method::POST, "/plans/generate", Some(plan_request())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("Plan generated and saved successfully"));
    assert_eq!(body["data"]["plan"]["topics"][2]["name"], json!("Verbs"));
    assert_eq!(body["data"]["plan"]["topics"][2]["id"], json!("topic-2"));
    assert_eq!(body["data"]["plan"]["schedule"][0]["hours"], json!(1.0));

    let (status, body) = send(&app, Method::GET, "/api/plans", None).await;
    assert_eq!(status, StatusCode::OK);
    let plans = body["data"].as_array().unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0]["progress"], json!(0));
    assert_eq!(plans[0]["completedItems"], json!([]));
    assert_eq!(plans[0]["isTracked"], json!(true));
    assert_eq!(plans[0]["status"], json!("active"));
}

#[tokio::test]
async fn test_preview_then_save() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/plans/generate?save=false",
        Some(plan_request()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], json!("Plan generated successfully (not saved)"));
    assert_eq!(body["data"]["planId"], Value::Null);

    let (_, listed) = send(&app, Method::GET, "/plans", None).await;
    assert_eq!(listed["data"], json!([]));

    let preview = body["data"]["plan"].clone();
    let (status, saved) = send(
        &app,
        Method::POST,
        "/plans/save",
        Some(json!({"params": plan_request(), "plan": preview})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(saved["message"], json!("Plan saved successfully"));
    assert_eq!(saved["data"]["plan"], preview);
}

#[tokio::test]
async fn test_invalid_parameters_are_rejected() {
    let app = app();
    let mut request = plan_request();
    request["duration"] = json!(400);

    let (status, body) = send(&app, Method::POST, "/plans/generate", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Failed to generate study plan"));
    assert!(body["error"].as_str().unwrap().contains("duration"));
}

#[tokio::test]
async fn test_unusable_generation_is_bad_gateway_without_raw_text() {
    let app = app_with(Ok("Sorry, I can only chat about the weather.".into()), Config::default());

    let (status, body) = send(&app, Method::POST, "/plans/generate", Some(plan_request())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!body["error"].as_str().unwrap().contains("weather"));

    let (_, listed) = send(&app, Method::GET, "/plans", None).await;
    assert_eq!(listed["data"], json!([]));
}

#[tokio::test]
async fn test_rate_limited_backend_is_service_unavailable() {
    let app = app_with(Err(UpstreamError::rate_limited("429")), Config::default());
    let (status, _) = send(&app, Method::POST, "/plans/generate", Some(plan_request())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_production_hides_error_details() {
    let config = Config {
        environment: Environment::Production,
        ..Config::default()
    };
    let app = app_with(Err(UpstreamError::invalid_credentials("bad token")), config);

    let (status, body) = send(&app, Method::POST, "/plans/generate", Some(plan_request())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], json!(false));
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_progress_is_recomputed_from_completed_items() {
    let app = app();
    let id = create_plan(&app).await;

    // 5 topics + 2 milestones.
    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/plans/{id}/progress"),
        Some(json!({"progress": 50, "completedTopics": ["topic-0"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Progress updated successfully"));
    assert_eq!(body["data"]["progress"], json!(14));

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/plans/{id}/progress"),
        Some(json!({"progress": 10, "completedTopics": ["topic-99"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, Method::GET, &format!("/plans/{id}"), None).await;
    assert_eq!(body["data"]["progress"], json!(14));
    assert_eq!(body["data"]["completedItems"], json!(["topic-0"]));
}

#[tokio::test]
async fn test_star_update_and_delete() {
    let app = app();
    let id = create_plan(&app).await;

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/plans/{id}/star"),
        Some(json!({"isStarred": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Plan starred successfully"));

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/plans/{id}"),
        Some(json!({"title": "Spanish for Travel"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Plan updated successfully"));
    assert_eq!(body["data"]["title"], json!("Spanish for Travel"));
    assert_eq!(body["data"]["isStarred"], json!(true));

    let (status, body) = send(&app, Method::DELETE, &format!("/plans/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Plan deleted successfully"));

    let (status, _) = send(&app, Method::GET, &format!("/plans/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_is_enveloped_404() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("Route not found"));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = app();
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/plans/generate")
                .header("x-user-id", "user-1")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
