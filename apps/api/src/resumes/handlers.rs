//! Axum route handlers for the Resumes API.

use std::path::Path as FsPath;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{ResumeFile, ResumeUpdate, ResumeVersion};
use crate::resumes::extract::{extract_text, media_kind, store_upload};
use crate::routes::{parse_id, ApiJson};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResumeRequest {
    pub base_resume_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResumeRequest {
    pub base_resume_text: Option<String>,
    pub optimized_resume_text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDeletedResponse {
    pub message: &'static str,
    pub resume_id: Uuid,
}

struct UploadedFile {
    name: String,
    mime_type: String,
    data: Vec<u8>,
}

fn bad_multipart(e: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {e}"))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResumeVersion>>, AppError> {
    Ok(Json(state.store.list_resumes().await?))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResumeVersion>, AppError> {
    let id = parse_id(&id, "id")?;
    let resume = state
        .store
        .find_resume(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))?;
    Ok(Json(resume))
}

/// POST /api/v1/resumes
pub async fn handle_create_resume(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateResumeRequest>,
) -> Result<(StatusCode, Json<ResumeVersion>), AppError> {
    let text = request
        .base_resume_text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("baseResumeText is required".to_string()))?;

    let resume = state
        .store
        .create_resume(&ResumeVersion::new(text, Vec::new()))
        .await?;
    info!("Created resume {}", resume.id);
    Ok((StatusCode::CREATED, Json(resume)))
}

/// POST /api/v1/resumes/upload
///
/// Multipart fields: `file` and/or `baseResumeText`. Text extracted from the
/// file wins; when extraction fails the supplied text is kept.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeVersion>), AppError> {
    let mut supplied_text: Option<String> = None;
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("resume").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(bad_multipart)?;
                upload = Some(UploadedFile {
                    name: file_name,
                    mime_type,
                    data: data.to_vec(),
                });
            }
            Some("baseResumeText") => {
                supplied_text = Some(field.text().await.map_err(bad_multipart)?);
            }
            _ => {}
        }
    }

    let has_text = supplied_text
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    if upload.is_none() && !has_text {
        return Err(AppError::Validation(
            "No file or text provided; upload a file or provide baseResumeText".to_string(),
        ));
    }

    let mut text = supplied_text.unwrap_or_default();
    let mut files = Vec::new();

    if let Some(file) = upload {
        let (stored_name, path) =
            store_upload(FsPath::new(&state.config.upload_dir), &file.name, &file.data).await?;
        info!("Stored upload {} ({} bytes)", stored_name, file.data.len());

        let kind = media_kind(&file.mime_type, &file.name);
        files.push(ResumeFile {
            filename: stored_name,
            path: path.to_string_lossy().into_owned(),
            mime_type: file.mime_type,
            uploaded_at: Utc::now(),
        });

        match extract_text(kind, file.data).await {
            Ok(Some(extracted)) => text = extracted,
            Ok(None) => {}
            Err(e) => warn!("Text extraction failed for {}: {e:#}", file.name),
        }
    }

    let resume = state
        .store
        .create_resume(&ResumeVersion::new(text, files))
        .await?;
    info!("Created resume {} from upload", resume.id);
    Ok((StatusCode::CREATED, Json(resume)))
}

/// PUT /api/v1/resumes/:id
///
/// Base text is frozen while any job uses the resume as its base.
pub async fn handle_update_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateResumeRequest>,
) -> Result<Json<ResumeVersion>, AppError> {
    let id = parse_id(&id, "id")?;
    let current = state
        .store
        .find_resume(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))?;

    if let Some(text) = &request.base_resume_text {
        if *text != current.base_resume_text {
            let refs = state.store.resume_references(id).await?;
            if refs.as_base > 0 {
                return Err(AppError::Validation(format!(
                    "Resume is the base resume of {} job(s); its base text cannot be edited",
                    refs.as_base
                )));
            }
        }
    }

    let update = ResumeUpdate {
        base_resume_text: request.base_resume_text,
        optimized_resume_text: request.optimized_resume_text,
    };
    let resume = state
        .store
        .update_resume(id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))?;
    Ok(Json(resume))
}

/// DELETE /api/v1/resumes/:id
///
/// Rejected while the resume is some job's latest optimized version.
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResumeDeletedResponse>, AppError> {
    let id = parse_id(&id, "id")?;
    let resume = state
        .store
        .find_resume(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))?;

    let refs = state.store.resume_references(id).await?;
    if refs.as_latest_optimized > 0 {
        return Err(AppError::Validation(format!(
            "Resume is the latest optimized version of {} job(s) and cannot be deleted",
            refs.as_latest_optimized
        )));
    }

    if !state.store.delete_resume(id).await? {
        return Err(AppError::NotFound("Resume not found".to_string()));
    }

    for file in &resume.files {
        if let Err(e) = tokio::fs::remove_file(&file.path).await {
            warn!("Could not delete file {}: {e}", file.path);
        }
    }
    info!("Deleted resume {id}");

    Ok(Json(ResumeDeletedResponse {
        message: "Resume deleted successfully",
        resume_id: id,
    }))
}
