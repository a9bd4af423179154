pub mod health;

use axum::{
    extract::{DefaultBodyLimit, FromRequest},
    http::Uri,
    middleware,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::handle_events;
use crate::jobs::handlers as jobs;
use crate::optimization::handlers as optimize;
use crate::rate_limit::{limit_api, limit_optimize};
use crate::resumes::handlers as resumes;
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Parses an id from a path segment or request field.
pub fn parse_id(raw: &str, field: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("{field} is not a valid id: '{raw}'")))
}

/// JSON body extractor whose rejections use the API error envelope.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Endpoint not found: {}", uri.path()))
}

pub fn build_router(state: AppState) -> Router {
    let optimize_limit = middleware::from_fn_with_state(state.clone(), limit_optimize);

    Router::new()
        // Optimization API
        .route(
            "/api/v1/optimize",
            post(optimize::handle_optimize).route_layer(optimize_limit.clone()),
        )
        .route(
            "/api/v1/optimize/batch",
            post(optimize::handle_batch_optimize).route_layer(optimize_limit),
        )
        .route(
            "/api/v1/optimize/diff/:job_id",
            get(optimize::handle_get_diff),
        )
        // Jobs API
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        // Resumes API
        .route(
            "/api/v1/resumes",
            get(resumes::handle_list_resumes).post(resumes::handle_create_resume),
        )
        .route(
            "/api/v1/resumes/upload",
            post(resumes::handle_upload_resume).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/v1/resumes/:id",
            get(resumes::handle_get_resume)
                .put(resumes::handle_update_resume)
                .delete(resumes::handle_delete_resume),
        )
        // Change feed
        .route("/api/v1/events", get(handle_events))
        .route("/api/v1/metrics", get(health::metrics_handler))
        // Everything above counts against the per-client API limit
        .route_layer(middleware::from_fn_with_state(state.clone(), limit_api))
        .route("/health", get(health::health_handler))
        .fallback(not_found)
        .with_state(state)
}
