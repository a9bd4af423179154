//! Document store for jobs and resume versions.
//!
//! Handlers and the optimization pipeline only see `Arc<dyn Store>`.
//! Production uses `PgStore`; tests use the in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::job::{Job, JobDetail, JobFilter, JobUpdate};
use crate::models::resume::{ResumeReferences, ResumeUpdate, ResumeVersion};

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Row vanished during write: {0}")]
    MissingRow(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Everything one successful optimization writes, applied atomically.
#[derive(Debug, Clone)]
pub struct OptimizationCommit {
    pub job_id: Uuid,
    /// The job's current optimized version; rewritten in place when it still exists.
    pub target_resume_id: Option<Uuid>,
    /// Base text copied into a newly created optimized version.
    pub base_resume_text: String,
    pub optimized_resume_text: String,
    pub keywords_added: Vec<String>,
    pub headline: String,
    pub optimized_on: DateTime<Utc>,
    /// New base resume reference, when an override differs from the stored one.
    pub rebase_to: Option<Uuid>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_job(&self, job: &Job) -> Result<Job, StoreError>;

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Newest first, plus the total count matching the filter.
    async fn list_jobs(&self, filter: &JobFilter) -> Result<(Vec<Job>, u64), StoreError>;

    async fn update_job(&self, id: Uuid, update: &JobUpdate) -> Result<Option<Job>, StoreError>;

    /// Resumes owned by the job lose their owner reference; none are deleted.
    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn create_resume(&self, resume: &ResumeVersion) -> Result<ResumeVersion, StoreError>;

    async fn find_resume(&self, id: Uuid) -> Result<Option<ResumeVersion>, StoreError>;

    async fn list_resumes(&self) -> Result<Vec<ResumeVersion>, StoreError>;

    async fn update_resume(
        &self,
        id: Uuid,
        update: &ResumeUpdate,
    ) -> Result<Option<ResumeVersion>, StoreError>;

    /// Jobs using the resume as base lose that reference.
    async fn delete_resume(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn resume_references(&self, id: Uuid) -> Result<ResumeReferences, StoreError>;

    /// Writes the optimized resume version and the job transition as one unit.
    /// Fails with `MissingRow`, writing nothing, when the job no longer exists.
    async fn commit_optimization(
        &self,
        commit: &OptimizationCommit,
    ) -> Result<(Job, ResumeVersion), StoreError>;
}

/// Resolves a job's resume references for API responses and notifications.
pub async fn load_job_detail(store: &dyn Store, job: Job) -> Result<JobDetail, StoreError> {
    let base_resume = match job.base_resume_id {
        Some(id) => store.find_resume(id).await?,
        None => None,
    };
    let latest_optimized_resume = match job.latest_optimized_resume_id {
        Some(id) => store.find_resume(id).await?,
        None => None,
    };
    Ok(JobDetail {
        job,
        base_resume,
        latest_optimized_resume,
    })
}
