//! Axum route handlers for the Optimization API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::optimization::batch::BatchReport;
use crate::optimization::optimizer::{DiffView, OptimizationResult};
use crate::routes::{parse_id, ApiJson};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    pub job_id: Option<String>,
    pub resume_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOptimizeRequest {
    /// Left untyped so a bad entry fails only its own slot.
    pub job_ids: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct BatchOptimizeResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub report: BatchReport,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/optimize
///
/// Rewrites the job's resume (or `resumeId`) for the job description.
pub async fn handle_optimize(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<OptimizeRequest>,
) -> Result<Json<OptimizationResult>, AppError> {
    let job_id = match request.job_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_id(raw, "jobId")?,
        _ => return Err(AppError::Validation("Missing jobId".to_string())),
    };
    let resume_id = match request.resume_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_id(raw, "resumeId")?),
        _ => None,
    };

    let result = state.optimizer.optimize(job_id, resume_id).await?;
    Ok(Json(result))
}

/// POST /api/v1/optimize/batch
///
/// Always 200 once the list is non-empty; per-job failures are in `errors`.
pub async fn handle_batch_optimize(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BatchOptimizeRequest>,
) -> Result<Json<BatchOptimizeResponse>, AppError> {
    let job_ids = match request.job_ids {
        Some(Value::Array(items)) => items,
        _ => {
            return Err(AppError::Validation(
                "jobIds must be a non-empty array".to_string(),
            ))
        }
    };
    let report = state.batch.run_batch(&job_ids).await?;
    Ok(Json(BatchOptimizeResponse {
        message: "Batch optimization completed",
        report,
    }))
}

/// GET /api/v1/optimize/diff/:job_id
pub async fn handle_get_diff(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<DiffView>, AppError> {
    let job_id = parse_id(&job_id, "jobId")?;
    Ok(Json(state.optimizer.get_diff(job_id).await?))
}
