use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::job::{Job, JobFilter, JobRow, JobStatus, JobUpdate};
use crate::models::resume::{ResumeReferences, ResumeRow, ResumeUpdate, ResumeVersion};
use crate::store::{OptimizationCommit, Store, StoreError};

/// PostgreSQL-backed store. See `migrations/` for the schema.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_job(row: JobRow) -> Result<Job, StoreError> {
    Job::try_from(row).map_err(StoreError::Corrupt)
}

#[async_trait]
impl Store for PgStore {
    async fn create_job(&self, job: &Job) -> Result<Job, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs
                (id, client_name, company_name, position, job_description,
                 application_link, status, base_resume_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(job.id)
        .bind(&job.client_name)
        .bind(&job.company_name)
        .bind(&job.position)
        .bind(&job.job_description)
        .bind(&job.application_link)
        .bind(job.status.as_str())
        .bind(job.base_resume_id)
        .bind(job.created_at)
        .bind(job.updated_at)
        .fetch_one(&self.pool)
        .await?;

        debug!("Inserted job {}", row.id);
        into_job(row)
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(into_job)
            .transpose()
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<(Vec<Job>, u64), StoreError> {
        let status = filter.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM jobs
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(i64::from(filter.limit))
        .bind(filter.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE ($1::text IS NULL OR status = $1)")
                .bind(status)
                .fetch_one(&self.pool)
                .await?;

        let jobs = rows.into_iter().map(into_job).collect::<Result<Vec<_>, _>>()?;
        Ok((jobs, total.max(0) as u64))
    }

    async fn update_job(&self, id: Uuid, update: &JobUpdate) -> Result<Option<Job>, StoreError> {
        sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs SET
                client_name      = COALESCE($2, client_name),
                company_name     = COALESCE($3, company_name),
                position         = COALESCE($4, position),
                job_description  = COALESCE($5, job_description),
                application_link = CASE WHEN $6 THEN $7 ELSE application_link END,
                base_resume_id   = CASE WHEN $8 THEN $9 ELSE base_resume_id END,
                updated_at       = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.client_name.as_deref())
        .bind(update.company_name.as_deref())
        .bind(update.position.as_deref())
        .bind(update.job_description.as_deref())
        .bind(update.application_link.is_some())
        .bind(update.application_link.as_ref().and_then(|link| link.as_deref()))
        .bind(update.base_resume_id.is_some())
        .bind(update.base_resume_id.flatten())
        .fetch_optional(&self.pool)
        .await?
        .map(into_job)
        .transpose()
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_resume(&self, resume: &ResumeVersion) -> Result<ResumeVersion, StoreError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            INSERT INTO resumes
                (id, owner_job_id, base_resume_text, optimized_resume_text,
                 files, keywords_added, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(resume.id)
        .bind(resume.owner_job_id)
        .bind(&resume.base_resume_text)
        .bind(&resume.optimized_resume_text)
        .bind(Json(&resume.files))
        .bind(&resume.keywords_added)
        .bind(resume.created_at)
        .bind(resume.updated_at)
        .fetch_one(&self.pool)
        .await?;

        debug!("Inserted resume {}", row.id);
        Ok(row.into())
    }

    async fn find_resume(&self, id: Uuid) -> Result<Option<ResumeVersion>, StoreError> {
        Ok(
            sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .map(ResumeVersion::from),
        )
    }

    async fn list_resumes(&self) -> Result<Vec<ResumeVersion>, StoreError> {
        Ok(
            sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(ResumeVersion::from)
                .collect(),
        )
    }

    async fn update_resume(
        &self,
        id: Uuid,
        update: &ResumeUpdate,
    ) -> Result<Option<ResumeVersion>, StoreError> {
        Ok(sqlx::query_as::<_, ResumeRow>(
            r#"
            UPDATE resumes SET
                base_resume_text      = COALESCE($2, base_resume_text),
                optimized_resume_text = COALESCE($3, optimized_resume_text),
                updated_at            = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.base_resume_text.as_deref())
        .bind(update.optimized_resume_text.as_deref())
        .fetch_optional(&self.pool)
        .await?
        .map(ResumeVersion::from))
    }

    async fn delete_resume(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn resume_references(&self, id: Uuid) -> Result<ResumeReferences, StoreError> {
        let (as_base, as_latest): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE base_resume_id = $1),
                COUNT(*) FILTER (WHERE latest_optimized_resume_id = $1)
            FROM jobs
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ResumeReferences {
            as_base: as_base.max(0) as u64,
            as_latest_optimized: as_latest.max(0) as u64,
        })
    }

    async fn commit_optimization(
        &self,
        commit: &OptimizationCommit,
    ) -> Result<(Job, ResumeVersion), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Step 0: lock the job; a concurrent delete waits or has already won
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM jobs WHERE id = $1 FOR UPDATE")
                .bind(commit.job_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(StoreError::MissingRow(format!("job {}", commit.job_id)));
        }

        // Step 1: rewrite the job's optimized version in place, if it still exists
        let updated = match commit.target_resume_id {
            Some(resume_id) => {
                sqlx::query_as::<_, ResumeRow>(
                    r#"
                    UPDATE resumes SET
                        optimized_resume_text = $2,
                        keywords_added        = $3,
                        updated_at            = NOW()
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(resume_id)
                .bind(&commit.optimized_resume_text)
                .bind(&commit.keywords_added)
                .fetch_optional(&mut *tx)
                .await?
            }
            None => None,
        };

        // Step 2: otherwise mint a new version owned by the job
        let resume_row = match updated {
            Some(row) => row,
            None => {
                sqlx::query_as::<_, ResumeRow>(
                    r#"
                    INSERT INTO resumes
                        (id, owner_job_id, base_resume_text, optimized_resume_text, keywords_added)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING *
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(commit.job_id)
                .bind(&commit.base_resume_text)
                .bind(&commit.optimized_resume_text)
                .bind(&commit.keywords_added)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        // Step 3: advance the job
        let job_row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs SET
                status                     = $2,
                optimized_on               = $3,
                changes_summary            = $4,
                latest_optimized_resume_id = $5,
                base_resume_id             = COALESCE($6, base_resume_id),
                updated_at                 = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(commit.job_id)
        .bind(JobStatus::Optimized.as_str())
        .bind(commit.optimized_on)
        .bind(&commit.headline)
        .bind(resume_row.id)
        .bind(commit.rebase_to)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::MissingRow(format!("job {}", commit.job_id)))?;

        tx.commit().await?;

        info!(
            "Committed optimization of job {} into resume {}",
            job_row.id, resume_row.id
        );

        Ok((into_job(job_row)?, resume_row.into()))
    }
}
