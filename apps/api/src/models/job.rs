use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::resume::ResumeVersion;

/// Optimization lifecycle of a job.
///
/// `PendingOptimization` → `Optimized` on the first successful optimization;
/// re-optimizing stays in `Optimized`. Nothing moves a job back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    #[serde(rename = "Pending Optimization")]
    PendingOptimization,
    #[serde(rename = "Optimized")]
    Optimized,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::PendingOptimization => "Pending Optimization",
            JobStatus::Optimized => "Optimized",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending Optimization" => Ok(JobStatus::PendingOptimization),
            "Optimized" => Ok(JobStatus::Optimized),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// A candidate-to-posting pairing.
///
/// Invariant: `status == Optimized` iff `latest_optimized_resume_id` and
/// `optimized_on` are both set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub client_name: String,
    pub company_name: String,
    pub position: String,
    pub job_description: String,
    pub application_link: Option<String>,
    pub status: JobStatus,
    pub base_resume_id: Option<Uuid>,
    pub latest_optimized_resume_id: Option<Uuid>,
    pub optimized_on: Option<DateTime<Utc>>,
    pub changes_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A fresh job awaiting its first optimization.
    pub fn new(draft: NewJob) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_name: draft.client_name,
            company_name: draft.company_name,
            position: draft.position,
            job_description: draft.job_description,
            application_link: draft.application_link,
            status: JobStatus::PendingOptimization,
            base_resume_id: draft.base_resume_id,
            latest_optimized_resume_id: None,
            optimized_on: None,
            changes_summary: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Caller-supplied fields for a new job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub client_name: String,
    pub company_name: String,
    pub position: String,
    pub job_description: String,
    pub application_link: Option<String>,
    pub base_resume_id: Option<Uuid>,
}

/// Direct edits to a job. Lifecycle fields are not editable here.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub client_name: Option<String>,
    pub company_name: Option<String>,
    pub position: Option<String>,
    pub job_description: Option<String>,
    /// `Some(None)` clears the link.
    pub application_link: Option<Option<String>>,
    /// `Some(None)` detaches the base resume.
    pub base_resume_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Copy)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub page: u32,
    pub limit: u32,
}

impl JobFilter {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// A job with its resume references resolved, as pushed to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: Job,
    pub base_resume: Option<ResumeVersion>,
    pub latest_optimized_resume: Option<ResumeVersion>,
}

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub client_name: String,
    pub company_name: String,
    pub position: String,
    pub job_description: String,
    pub application_link: Option<String>,
    pub status: String,
    pub base_resume_id: Option<Uuid>,
    pub latest_optimized_resume_id: Option<Uuid>,
    pub optimized_on: Option<DateTime<Utc>>,
    pub changes_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = String;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            client_name: row.client_name,
            company_name: row.company_name,
            position: row.position,
            job_description: row.job_description,
            application_link: row.application_link,
            status: row.status.parse()?,
            base_resume_id: row.base_resume_id,
            latest_optimized_resume_id: row.latest_optimized_resume_id,
            optimized_on: row.optimized_on,
            changes_summary: row.changes_summary,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
