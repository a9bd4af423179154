//! Batch Runner: optimizes a list of jobs one after another.
//!
//! Per-job failures become error entries; only an empty list fails the call.
//! Each success is followed by a pause so consecutive jobs stay under the
//! AI service's shared rate limit.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::pacing::Sleeper;
use crate::optimization::optimizer::Optimizer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSuccess {
    pub job_id: String,
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    /// Echoed as received, so a non-string entry keeps its JSON value.
    pub job_id: Value,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub results: Vec<BatchSuccess>,
    pub errors: Vec<BatchFailure>,
    pub summary: BatchSummary,
}

#[derive(Clone)]
pub struct BatchRunner {
    optimizer: Optimizer,
    sleeper: Arc<dyn Sleeper>,
    pacing: Duration,
}

impl BatchRunner {
    pub fn new(optimizer: Optimizer, sleeper: Arc<dyn Sleeper>, pacing: Duration) -> Self {
        Self {
            optimizer,
            sleeper,
            pacing,
        }
    }

    pub async fn run_batch(&self, job_ids: &[Value]) -> Result<BatchReport, AppError> {
        if job_ids.is_empty() {
            return Err(AppError::Validation(
                "jobIds must be a non-empty array".to_string(),
            ));
        }

        info!("Batch optimization of {} job(s) started", job_ids.len());
        let mut results = Vec::new();
        let mut errors = Vec::new();

        for entry in job_ids {
            let outcome = match entry.as_str() {
                Some(raw_id) => self.optimize_one(raw_id).await.map(|()| raw_id),
                None => Err("Invalid job id".to_string()),
            };
            match outcome {
                Ok(raw_id) => {
                    results.push(BatchSuccess {
                        job_id: raw_id.to_string(),
                        status: "success",
                    });
                    self.sleeper.sleep(self.pacing).await;
                }
                Err(error) => {
                    warn!("Batch optimization of job {entry} failed: {error}");
                    errors.push(BatchFailure {
                        job_id: entry.clone(),
                        error,
                    });
                }
            }
        }

        let summary = BatchSummary {
            total: job_ids.len(),
            successful: results.len(),
            failed: errors.len(),
        };
        info!(
            "Batch optimization finished: {}/{} succeeded",
            summary.successful, summary.total
        );

        Ok(BatchReport {
            results,
            errors,
            summary,
        })
    }

    /// Uses the job's stored base resume only; overrides are not accepted here.
    async fn optimize_one(&self, raw_id: &str) -> Result<(), String> {
        let job_id = Uuid::parse_str(raw_id.trim()).map_err(|_| "Invalid job id".to_string())?;
        let store = self.optimizer.store();

        let job = store
            .find_job(job_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "Job not found".to_string())?;

        let resume = match job.base_resume_id {
            Some(id) => store.find_resume(id).await.map_err(|e| e.to_string())?,
            None => None,
        };
        let resume = resume
            .filter(|r| r.has_base_text())
            .ok_or_else(|| "No resume text available".to_string())?;

        self.optimizer
            .run_pipeline(&job, &resume.base_resume_text, None)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
