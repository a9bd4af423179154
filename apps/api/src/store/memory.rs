use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::job::{Job, JobFilter, JobStatus, JobUpdate};
use crate::models::resume::{ResumeReferences, ResumeUpdate, ResumeVersion};
use crate::store::{OptimizationCommit, Store, StoreError};

/// In-memory `Store` used by tests. Mirrors the foreign-key behaviour of the
/// PostgreSQL schema and counts every write.
#[derive(Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
    resumes: RwLock<HashMap<Uuid, ResumeVersion>>,
    writes: AtomicUsize,
    fail_commits: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes every subsequent `commit_optimization` fail.
    pub fn fail_commits(&self) {
        self.fail_commits.store(true, Ordering::SeqCst);
    }

    pub fn resume_count(&self) -> usize {
        self.resumes.read().unwrap().len()
    }

    fn bump(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_job(&self, job: &Job) -> Result<Job, StoreError> {
        self.bump();
        self.jobs.write().unwrap().insert(job.id, job.clone());
        Ok(job.clone())
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().unwrap().get(&id).cloned())
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<(Vec<Job>, u64), StoreError> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .unwrap()
            .values()
            .filter(|job| filter.status.map_or(true, |s| job.status == s))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = jobs.len() as u64;
        let page = jobs
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_job(&self, id: Uuid, update: &JobUpdate) -> Result<Option<Job>, StoreError> {
        self.bump();
        let mut jobs = self.jobs.write().unwrap();
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = &update.client_name {
            job.client_name = v.clone();
        }
        if let Some(v) = &update.company_name {
            job.company_name = v.clone();
        }
        if let Some(v) = &update.position {
            job.position = v.clone();
        }
        if let Some(v) = &update.job_description {
            job.job_description = v.clone();
        }
        if let Some(v) = &update.application_link {
            job.application_link = v.clone();
        }
        if let Some(v) = update.base_resume_id {
            job.base_resume_id = v;
        }
        job.updated_at = Utc::now();
        Ok(Some(job.clone()))
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError> {
        self.bump();
        let removed = self.jobs.write().unwrap().remove(&id).is_some();
        if removed {
            for resume in self.resumes.write().unwrap().values_mut() {
                if resume.owner_job_id == Some(id) {
                    resume.owner_job_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn create_resume(&self, resume: &ResumeVersion) -> Result<ResumeVersion, StoreError> {
        self.bump();
        self.resumes
            .write()
            .unwrap()
            .insert(resume.id, resume.clone());
        Ok(resume.clone())
    }

    async fn find_resume(&self, id: Uuid) -> Result<Option<ResumeVersion>, StoreError> {
        Ok(self.resumes.read().unwrap().get(&id).cloned())
    }

    async fn list_resumes(&self) -> Result<Vec<ResumeVersion>, StoreError> {
        let mut resumes: Vec<ResumeVersion> =
            self.resumes.read().unwrap().values().cloned().collect();
        resumes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(resumes)
    }

    async fn update_resume(
        &self,
        id: Uuid,
        update: &ResumeUpdate,
    ) -> Result<Option<ResumeVersion>, StoreError> {
        self.bump();
        let mut resumes = self.resumes.write().unwrap();
        let Some(resume) = resumes.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(text) = &update.base_resume_text {
            resume.base_resume_text = text.clone();
        }
        if let Some(text) = &update.optimized_resume_text {
            resume.optimized_resume_text = Some(text.clone());
        }
        resume.updated_at = Utc::now();
        Ok(Some(resume.clone()))
    }

    async fn delete_resume(&self, id: Uuid) -> Result<bool, StoreError> {
        self.bump();
        let removed = self.resumes.write().unwrap().remove(&id).is_some();
        if removed {
            for job in self.jobs.write().unwrap().values_mut() {
                if job.base_resume_id == Some(id) {
                    job.base_resume_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn resume_references(&self, id: Uuid) -> Result<ResumeReferences, StoreError> {
        let jobs = self.jobs.read().unwrap();
        Ok(ResumeReferences {
            as_base: jobs
                .values()
                .filter(|j| j.base_resume_id == Some(id))
                .count() as u64,
            as_latest_optimized: jobs
                .values()
                .filter(|j| j.latest_optimized_resume_id == Some(id))
                .count() as u64,
        })
    }

    async fn commit_optimization(
        &self,
        commit: &OptimizationCommit,
    ) -> Result<(Job, ResumeVersion), StoreError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }

        // Both maps held for the whole commit.
        let mut jobs = self.jobs.write().unwrap();
        let mut resumes = self.resumes.write().unwrap();

        let Some(job) = jobs.get_mut(&commit.job_id) else {
            return Err(StoreError::MissingRow(format!("job {}", commit.job_id)));
        };
        self.bump();

        let now = Utc::now();
        let existing = commit
            .target_resume_id
            .and_then(|id| resumes.get_mut(&id));

        let resume = match existing {
            Some(resume) => {
                resume.optimized_resume_text = Some(commit.optimized_resume_text.clone());
                resume.keywords_added = commit.keywords_added.clone();
                resume.updated_at = now;
                resume.clone()
            }
            None => {
                let mut resume = ResumeVersion::new(commit.base_resume_text.clone(), Vec::new());
                resume.owner_job_id = Some(commit.job_id);
                resume.optimized_resume_text = Some(commit.optimized_resume_text.clone());
                resume.keywords_added = commit.keywords_added.clone();
                resumes.insert(resume.id, resume.clone());
                resume
            }
        };

        job.status = JobStatus::Optimized;
        job.optimized_on = Some(commit.optimized_on);
        job.changes_summary = Some(commit.headline.clone());
        job.latest_optimized_resume_id = Some(resume.id);
        if let Some(base) = commit.rebase_to {
            job.base_resume_id = Some(base);
        }
        job.updated_at = now;

        Ok((job.clone(), resume))
    }
}
