//! Optimization Orchestrator: drives one job through rewrite, summary,
//! atomic commit and diff.
//!
//! Job lifecycle: `Pending Optimization` → `Optimized` → `Optimized`.
//! Nothing is written until both AI calls have succeeded, so an AI failure
//! leaves the job and its resumes exactly as they were.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::diff::{compute_diff, DiffResult};
use crate::errors::AppError;
use crate::events::{JobEvent, JobObserver};
use crate::llm_client::AiClient;
use crate::models::job::{Job, JobStatus};
use crate::optimization::parser::{extract_change_summary, extract_optimized_text, ChangeSummary};
use crate::optimization::prompts::{
    build_optimization_prompt, build_summary_prompt, OPTIMIZATION_SYSTEM, SUMMARY_SYSTEM,
};
use crate::store::{load_job_detail, OptimizationCommit, Store, StoreError};

// ────────────────────────────────────────────────────────────────────────────
// Result types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedJob {
    pub status: JobStatus,
    pub optimized_on: Option<DateTime<Utc>>,
    pub changes_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub job_id: Uuid,
    pub optimized_resume_text: String,
    pub changes_summary: ChangeSummary,
    pub updated_job: UpdatedJob,
    pub diff: DiffResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffView {
    pub job_id: Uuid,
    pub diff: DiffResult,
    pub changes_summary: Option<String>,
    pub keywords_added: Vec<String>,
}

/// What the shared pipeline produced for one job.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub job: Job,
    pub summary: ChangeSummary,
    pub optimized_text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Optimizer {
    store: Arc<dyn Store>,
    ai: AiClient,
    observer: Option<Arc<dyn JobObserver>>,
}

impl Optimizer {
    pub fn new(store: Arc<dyn Store>, ai: AiClient) -> Self {
        Self {
            store,
            ai,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Optimizes the job's resume, or `resume_override` when given.
    ///
    /// An override that differs from the job's base resume becomes the new
    /// base resume.
    pub async fn optimize(
        &self,
        job_id: Uuid,
        resume_override: Option<Uuid>,
    ) -> Result<OptimizationResult, AppError> {
        let job = self
            .store
            .find_job(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

        let resume = match resume_override {
            Some(id) => self
                .store
                .find_resume(id)
                .await?
                .ok_or_else(|| AppError::Validation(format!("Resume {id} not found")))?,
            None => {
                let stored = match job.base_resume_id {
                    Some(id) => self.store.find_resume(id).await?,
                    None => None,
                };
                stored.ok_or_else(|| {
                    AppError::NotFound(
                        "No resume associated with job; provide resumeId or set a base resume"
                            .to_string(),
                    )
                })?
            }
        };

        if !resume.has_base_text() {
            return Err(AppError::EmptyContent(
                "Resume has no text content".to_string(),
            ));
        }

        let rebase_to = resume_override.filter(|id| job.base_resume_id != Some(*id));
        let outcome = self
            .run_pipeline(&job, &resume.base_resume_text, rebase_to)
            .await?;

        let diff = compute_diff(&resume.base_resume_text, &outcome.optimized_text);

        Ok(OptimizationResult {
            job_id: outcome.job.id,
            optimized_resume_text: outcome.optimized_text,
            changes_summary: outcome.summary,
            updated_job: UpdatedJob {
                status: outcome.job.status,
                optimized_on: outcome.job.optimized_on,
                changes_summary: outcome.job.changes_summary,
            },
            diff,
        })
    }

    /// Rewrite, summarize, commit, notify. Shared by the single and batch paths.
    pub async fn run_pipeline(
        &self,
        job: &Job,
        base_text: &str,
        rebase_to: Option<Uuid>,
    ) -> Result<PipelineOutcome, AppError> {
        info!("Optimizing resume for job {} (model: {})", job.id, self.ai.model());
        let raw = self
            .ai
            .invoke(
                OPTIMIZATION_SYSTEM,
                &build_optimization_prompt(&job.job_description, base_text),
            )
            .await?;
        let optimized_text = extract_optimized_text(&raw);

        info!("Generating change summary for job {}", job.id);
        let raw = self
            .ai
            .invoke(SUMMARY_SYSTEM, &build_summary_prompt(base_text, &optimized_text))
            .await?;
        let summary = extract_change_summary(&raw);

        let commit = OptimizationCommit {
            job_id: job.id,
            target_resume_id: job.latest_optimized_resume_id,
            base_resume_text: base_text.to_string(),
            optimized_resume_text: optimized_text.clone(),
            keywords_added: summary.keywords_added.clone(),
            headline: summary.headline.clone(),
            optimized_on: Utc::now(),
            rebase_to,
        };

        let (job, _) = match self.store.commit_optimization(&commit).await {
            Ok(written) => written,
            Err(StoreError::MissingRow(_)) => {
                return Err(AppError::NotFound(format!(
                    "Job {} was deleted during optimization",
                    commit.job_id
                )))
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            "Job {} optimized: \"{}\" ({} keywords added)",
            job.id,
            summary.headline,
            summary.keywords_added.len()
        );

        self.notify(job.clone()).await;

        Ok(PipelineOutcome {
            job,
            summary,
            optimized_text,
        })
    }

    /// Diff between the job's base resume and its latest optimized text.
    pub async fn get_diff(&self, job_id: Uuid) -> Result<DiffView, AppError> {
        let job = self
            .store
            .find_job(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

        let detail = load_job_detail(self.store.as_ref(), job).await?;
        let (Some(base), Some(optimized)) = (&detail.base_resume, &detail.latest_optimized_resume)
        else {
            return Err(AppError::Validation(
                "Job does not have both base and optimized resumes".to_string(),
            ));
        };

        let revised = optimized.optimized_resume_text.as_deref().unwrap_or_default();
        Ok(DiffView {
            job_id,
            diff: compute_diff(&base.base_resume_text, revised),
            changes_summary: detail.job.changes_summary.clone(),
            keywords_added: optimized.keywords_added.clone(),
        })
    }

    async fn notify(&self, job: Job) {
        let Some(observer) = &self.observer else {
            return;
        };
        let id = job.id;
        match load_job_detail(self.store.as_ref(), job).await {
            Ok(detail) => observer.notify(JobEvent::Updated(detail)),
            Err(e) => warn!("Skipping job:updated for {id}: {e}"),
        }
    }
}
