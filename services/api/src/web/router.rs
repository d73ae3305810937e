//! services/api/src/web/router.rs
//!
//! Assembles the HTTP application: plan routes behind the identity
//! middleware, the unauthenticated health check, Swagger UI and a 404
//! fallback.

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::web::middleware::{require_user, USER_ID_HEADER};
use crate::web::rest::{
    delete_plan_handler, fallback_handler, generate_plan_handler, get_plan_handler,
    health_handler, list_plans_handler, save_plan_handler, toggle_star_handler,
    update_plan_handler, update_progress_handler, ApiDoc,
};
use crate::web::state::AppState;

/// Builds the complete router for the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let plan_routes = Router::new()
        .route("/", get(list_plans_handler))
        .route("/generate", post(generate_plan_handler))
        .route("/save", post(save_plan_handler))
        .route(
            "/{id}",
            get(get_plan_handler)
                .put(update_plan_handler)
                .delete(delete_plan_handler),
        )
        .route("/{id}/progress", patch(update_progress_handler))
        .route("/{id}/star", patch(toggle_star_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_user,
        ));

    // The plan routes are served both at the root and under `/api`.
    let api_router = Router::new()
        .route("/health", get(health_handler))
        .nest("/plans", plan_routes.clone())
        .nest("/api/plans", plan_routes)
        .fallback(fallback_handler)
        .layer(cors_layer(&state.config.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(USER_ID_HEADER),
        ]);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            warn!(origin, error = %e, "Ignoring invalid CORS origin");
            layer
        }
    }
}
