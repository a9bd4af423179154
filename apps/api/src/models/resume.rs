use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for an uploaded resume file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeFile {
    pub filename: String,
    pub path: String,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A snapshot of resume text, base and optionally optimized.
///
/// Once a version is some job's base resume its `base_resume_text` is frozen;
/// re-optimization only rewrites `optimized_resume_text` and `keywords_added`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeVersion {
    pub id: Uuid,
    pub owner_job_id: Option<Uuid>,
    pub base_resume_text: String,
    pub optimized_resume_text: Option<String>,
    pub files: Vec<ResumeFile>,
    pub keywords_added: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResumeVersion {
    pub fn new(base_resume_text: String, files: Vec<ResumeFile>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_job_id: None,
            base_resume_text,
            optimized_resume_text: None,
            files,
            keywords_added: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True when there is non-whitespace base text to optimize.
    pub fn has_base_text(&self) -> bool {
        !self.base_resume_text.trim().is_empty()
    }
}

/// Direct edits to a resume version.
#[derive(Debug, Clone, Default)]
pub struct ResumeUpdate {
    pub base_resume_text: Option<String>,
    pub optimized_resume_text: Option<String>,
}

/// How many jobs point at a resume, per reference kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumeReferences {
    pub as_base: u64,
    pub as_latest_optimized: u64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub owner_job_id: Option<Uuid>,
    pub base_resume_text: String,
    pub optimized_resume_text: Option<String>,
    pub files: Json<Vec<ResumeFile>>,
    pub keywords_added: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ResumeRow> for ResumeVersion {
    fn from(row: ResumeRow) -> Self {
        ResumeVersion {
            id: row.id,
            owner_job_id: row.owner_job_id,
            base_resume_text: row.base_resume_text,
            optimized_resume_text: row.optimized_resume_text,
            files: row.files.0,
            keywords_added: row.keywords_added,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
