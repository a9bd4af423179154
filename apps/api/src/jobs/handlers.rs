//! Axum route handlers for the Jobs API.
//!
//! Lifecycle fields (status, optimizedOn, changesSummary, latest optimized
//! resume) are never written here; only the optimizer moves them.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::{JobEvent, JobObserver};
use crate::models::job::{Job, JobDetail, JobFilter, JobStatus, JobUpdate, NewJob};
use crate::routes::{parse_id, ApiJson};
use crate::state::AppState;
use crate::store::load_job_detail;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobDetail>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub client_name: Option<String>,
    pub company_name: Option<String>,
    pub position: Option<String>,
    pub job_description: Option<String>,
    #[serde(default, alias = "jobApplicationLink", deserialize_with = "nullable")]
    pub application_link: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub base_resume_id: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDeletedResponse {
    pub message: &'static str,
    pub job_id: Uuid,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

impl ListJobsQuery {
    fn to_filter(&self) -> Result<JobFilter, AppError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("All") => None,
            Some(raw) => Some(raw.parse::<JobStatus>().map_err(AppError::Validation)?),
        };
        Ok(JobFilter {
            status,
            page: self.page.unwrap_or(1).max(1),
            limit: self
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        })
    }
}

/// Absent stays `None`; an explicit `null` becomes `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn present(value: &Option<Option<String>>) -> Option<&str> {
    value.as_ref().and_then(|v| v.as_deref())
}

fn required(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Trimmed, non-blank; `None` when absent. A blank value is an error.
fn optional_non_blank(value: Option<&str>, field: &str) -> Result<Option<String>, AppError> {
    match value.map(str::trim) {
        None => Ok(None),
        Some("") => Err(AppError::Validation(format!("{field} cannot be empty"))),
        Some(v) => Ok(Some(v.to_string())),
    }
}

async fn existing_resume_id(state: &AppState, raw: Option<&str>) -> Result<Option<Uuid>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let id = parse_id(raw, "baseResumeId")?;
    if state.store.find_resume(id).await?.is_none() {
        return Err(AppError::NotFound("Base resume not found".to_string()));
    }
    Ok(Some(id))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/jobs?status=&page=&limit=
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<JobListResponse>, AppError> {
    let filter = query.to_filter()?;
    let (jobs, total) = state.store.list_jobs(&filter).await?;

    let mut details = Vec::with_capacity(jobs.len());
    for job in jobs {
        details.push(load_job_detail(state.store.as_ref(), job).await?);
    }

    Ok(Json(JobListResponse {
        jobs: details,
        pagination: Pagination {
            page: filter.page,
            limit: filter.limit,
            total,
            pages: total.div_ceil(u64::from(filter.limit)),
        },
    }))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobDetail>, AppError> {
    let id = parse_id(&id, "id")?;
    let job = state
        .store
        .find_job(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;
    Ok(Json(load_job_detail(state.store.as_ref(), job).await?))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<JobRequest>,
) -> Result<(StatusCode, Json<JobDetail>), AppError> {
    let (Some(client_name), Some(company_name), Some(position), Some(job_description)) = (
        required(request.client_name.as_deref()),
        required(request.company_name.as_deref()),
        required(request.position.as_deref()),
        required(request.job_description.as_deref()),
    ) else {
        return Err(AppError::Validation(
            "clientName, companyName, position, and jobDescription are required".to_string(),
        ));
    };

    let base_resume_id = existing_resume_id(&state, present(&request.base_resume_id)).await?;

    let job = Job::new(NewJob {
        client_name,
        company_name,
        position,
        job_description,
        application_link: required(present(&request.application_link)),
        base_resume_id,
    });
    let job = state.store.create_job(&job).await?;
    info!("Created job {} for {}", job.id, job.client_name);

    let detail = load_job_detail(state.store.as_ref(), job).await?;
    state.events.notify(JobEvent::Created(detail.clone()));

    Ok((StatusCode::CREATED, Json(detail)))
}

/// PUT /api/v1/jobs/:id
///
/// Descriptive fields and the base resume only; lifecycle fields in the body are ignored.
/// An explicit `null` (or blank) `applicationLink` or `baseResumeId` clears it.
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<JobRequest>,
) -> Result<Json<JobDetail>, AppError> {
    let id = parse_id(&id, "id")?;

    let base_resume_id = match &request.base_resume_id {
        None => None,
        Some(raw) => Some(existing_resume_id(&state, raw.as_deref()).await?),
    };

    let update = JobUpdate {
        client_name: optional_non_blank(request.client_name.as_deref(), "clientName")?,
        company_name: optional_non_blank(request.company_name.as_deref(), "companyName")?,
        position: optional_non_blank(request.position.as_deref(), "position")?,
        job_description: optional_non_blank(
            request.job_description.as_deref(),
            "jobDescription",
        )?,
        application_link: request
            .application_link
            .as_ref()
            .map(|link| required(link.as_deref())),
        base_resume_id,
    };

    let job = state
        .store
        .update_job(id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    let detail = load_job_detail(state.store.as_ref(), job).await?;
    state.events.notify(JobEvent::Updated(detail.clone()));

    Ok(Json(detail))
}

/// DELETE /api/v1/jobs/:id
///
/// Resumes are kept; those owned by the job lose their owner.
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobDeletedResponse>, AppError> {
    let id = parse_id(&id, "id")?;
    if !state.store.delete_job(id).await? {
        return Err(AppError::NotFound("Job not found".to_string()));
    }
    info!("Deleted job {id}");
    state.events.notify(JobEvent::Deleted(id));

    Ok(Json(JobDeletedResponse {
        message: "Job deleted successfully",
        job_id: id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query = ListJobsQuery {
            status: None,
            page: None,
            limit: None,
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, DEFAULT_PAGE_SIZE);
        assert!(filter.status.is_none());
    }

    #[test]
    fn test_list_query_all_status_means_no_filter() {
        let query = ListJobsQuery {
            status: Some("All".to_string()),
            page: Some(0),
            limit: Some(1000),
        };
        let filter = query.to_filter().unwrap();
        assert!(filter.status.is_none());
        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_list_query_rejects_unknown_status() {
        let query = ListJobsQuery {
            status: Some("Done".to_string()),
            page: None,
            limit: None,
        };
        assert!(matches!(query.to_filter(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_job_request_distinguishes_absent_from_null() {
        let absent: JobRequest = serde_json::from_str(r#"{"position": "Lead"}"#).unwrap();
        assert_eq!(absent.application_link, None);
        assert_eq!(absent.base_resume_id, None);

        let cleared: JobRequest =
            serde_json::from_str(r#"{"applicationLink": null, "baseResumeId": null}"#).unwrap();
        assert_eq!(cleared.application_link, Some(None));
        assert_eq!(cleared.base_resume_id, Some(None));

        let aliased: JobRequest =
            serde_json::from_str(r#"{"jobApplicationLink": "https://jobs.example"}"#).unwrap();
        assert_eq!(present(&aliased.application_link), Some("https://jobs.example"));
    }

    #[test]
    fn test_blank_update_field_is_rejected() {
        assert!(optional_non_blank(Some("  "), "position").is_err());
        assert_eq!(optional_non_blank(None, "position").unwrap(), None);
        assert_eq!(
            optional_non_blank(Some(" Lead "), "position").unwrap(),
            Some("Lead".to_string())
        );
    }
}
