use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::IngestError;
use crate::ingest::store::{JobStore, SourceRegistry};
use crate::models::job::{Job, JobFilters, JobIdentity, StandardizedJob, UpsertOutcome};
use crate::models::job_source::{JobSource, JobSourceRow};
use crate::models::run_record::{RunRecord, RunRecordRow};

const SOURCE_COLUMNS: &str =
    "id, name, provider_type, provider_config, is_enabled, last_fetched_at";

const RUN_COLUMNS: &str = "job_source_id, run_started_at, run_ended_at, status, jobs_found, jobs_relevant, jobs_processed, jobs_errored, jobs_created, jobs_updated, jobs_closed, error_message";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_sources(rows: Vec<JobSourceRow>) -> Vec<JobSource> {
    rows.into_iter().map(JobSource::from).collect()
}

#[async_trait]
impl SourceRegistry for PgStore {
    async fn list_sources(&self) -> Result<Vec<JobSource>, IngestError> {
        let rows = sqlx::query_as::<_, JobSourceRow>(&format!(
            "SELECT {SOURCE_COLUMNS} FROM job_sources ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(to_sources(rows))
    }

    async fn list_enabled_sources(&self) -> Result<Vec<JobSource>, IngestError> {
        let rows = sqlx::query_as::<_, JobSourceRow>(&format!(
            "SELECT {SOURCE_COLUMNS} FROM job_sources WHERE is_enabled ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(to_sources(rows))
    }

    async fn get_source(&self, id: i32) -> Result<Option<JobSource>, IngestError> {
        let row = sqlx::query_as::<_, JobSourceRow>(&format!(
            "SELECT {SOURCE_COLUMNS} FROM job_sources WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(JobSource::from))
    }

    async fn toggle_source(&self, id: i32) -> Result<Option<JobSource>, IngestError> {
        let row = sqlx::query_as::<_, JobSourceRow>(&format!(
            "UPDATE job_sources SET is_enabled = NOT is_enabled, updated_at = NOW() WHERE id = $1 RETURNING {SOURCE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(JobSource::from))
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn find_job_by_identity(
        &self,
        identity: &JobIdentity,
    ) -> Result<Option<StandardizedJob>, IngestError> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE provider_type = $1 AND identity_key = $2",
        )
        .bind(identity.provider_type.as_str())
        .bind(&identity.key)
        .fetch_optional(&self.pool)
        .await?
        .map(|job| job.to_standardized())
        .transpose()
    }

    /// Relies on the UNIQUE (provider_type, identity_key) constraint; `xmax = 0`
    /// only holds for a freshly inserted row.
    async fn upsert_job(&self, job: &StandardizedJob) -> Result<UpsertOutcome, IngestError> {
        let identity = job.identity();
        let (inserted,): (bool,) = sqlx::query_as(
            "INSERT INTO jobs (job_source_id, provider_type, identity_key, provider_native_id, title, description, original_url, company_name, location, is_remote, employment_type, salary, posted_at, hiring_region)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             ON CONFLICT (provider_type, identity_key) DO UPDATE SET
                 job_source_id = EXCLUDED.job_source_id,
                 provider_native_id = COALESCE(EXCLUDED.provider_native_id, jobs.provider_native_id),
                 title = EXCLUDED.title,
                 description = COALESCE(NULLIF(EXCLUDED.description, ''), jobs.description),
                 original_url = EXCLUDED.original_url,
                 company_name = EXCLUDED.company_name,
                 location = COALESCE(EXCLUDED.location, jobs.location),
                 is_remote = COALESCE(EXCLUDED.is_remote, jobs.is_remote),
                 employment_type = COALESCE(EXCLUDED.employment_type, jobs.employment_type),
                 salary = COALESCE(EXCLUDED.salary, jobs.salary),
                 posted_at = COALESCE(EXCLUDED.posted_at, jobs.posted_at),
                 hiring_region = EXCLUDED.hiring_region,
                 missed_runs = 0,
                 closed_at = NULL,
                 last_seen_at = NOW(),
                 updated_at = NOW()
             RETURNING (xmax = 0) AS inserted",
        )
        .bind(job.job_source_id)
        .bind(job.provider_type.as_str())
        .bind(&identity.key)
        .bind(&job.provider_native_id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.original_url)
        .bind(&job.company_name)
        .bind(&job.location)
        .bind(job.is_remote)
        .bind(&job.employment_type)
        .bind(&job.salary)
        .bind(job.posted_at)
        .bind(job.hiring_region.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn mark_job_seen(&self, identity: &JobIdentity) -> Result<(), IngestError> {
        sqlx::query(
            "UPDATE jobs SET last_seen_at = NOW(), missed_runs = 0, closed_at = NULL
             WHERE provider_type = $1 AND identity_key = $2",
        )
        .bind(identity.provider_type.as_str())
        .bind(&identity.key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn retire_unseen_jobs(
        &self,
        job_source_id: i32,
        seen: &HashSet<JobIdentity>,
        max_missed_runs: i32,
    ) -> Result<u64, IngestError> {
        let keys: Vec<String> = seen.iter().map(|i| i.key.clone()).collect();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE jobs SET missed_runs = 0, closed_at = NULL, last_seen_at = NOW()
             WHERE job_source_id = $1 AND identity_key = ANY($2)",
        )
        .bind(job_source_id)
        .bind(&keys)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE jobs SET missed_runs = missed_runs + 1
             WHERE job_source_id = $1 AND closed_at IS NULL AND NOT (identity_key = ANY($2))",
        )
        .bind(job_source_id)
        .bind(&keys)
        .execute(&mut *tx)
        .await?;

        let closed = sqlx::query(
            "UPDATE jobs SET closed_at = NOW(), updated_at = NOW()
             WHERE job_source_id = $1 AND closed_at IS NULL AND missed_runs >= $2",
        )
        .bind(job_source_id)
        .bind(max_missed_runs)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(closed.rows_affected())
    }

    async fn save_run_record(&self, record: &RunRecord) -> Result<(), IngestError> {
        sqlx::query(&format!(
            "INSERT INTO run_records ({RUN_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(record.job_source_id)
        .bind(record.run_started_at)
        .bind(record.run_ended_at)
        .bind(record.status.as_str())
        .bind(record.jobs_found)
        .bind(record.jobs_relevant)
        .bind(record.jobs_processed)
        .bind(record.jobs_errored)
        .bind(record.jobs_created)
        .bind(record.jobs_updated)
        .bind(record.jobs_closed)
        .bind(&record.error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_run_record(
        &self,
        job_source_id: i32,
    ) -> Result<Option<RunRecord>, IngestError> {
        Ok(self
            .recent_run_records(job_source_id, 1)
            .await?
            .into_iter()
            .next())
    }

    async fn recent_run_records(
        &self,
        job_source_id: i32,
        limit: i64,
    ) -> Result<Vec<RunRecord>, IngestError> {
        let rows = sqlx::query_as::<_, RunRecordRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM run_records WHERE job_source_id = $1 ORDER BY run_ended_at DESC, id DESC LIMIT $2"
        ))
        .bind(job_source_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RunRecord::try_from).collect()
    }

    async fn update_source_last_fetched(
        &self,
        job_source_id: i32,
        at: DateTime<Utc>,
    ) -> Result<(), IngestError> {
        sqlx::query("UPDATE job_sources SET last_fetched_at = $2, updated_at = NOW() WHERE id = $1")
            .bind(job_source_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_jobs(&self, filters: &JobFilters) -> Result<Vec<Job>, IngestError> {
        let (limit, offset) = filters.limit_offset();
        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs
             WHERE ($1::text IS NULL OR hiring_region = $1)
               AND ($2::int4 IS NULL OR job_source_id = $2)
               AND ($3::text IS NULL OR title ILIKE '%' || $3 || '%')
               AND ($4 OR closed_at IS NULL)
             ORDER BY last_seen_at DESC LIMIT $5 OFFSET $6",
        )
        .bind(filters.region.map(|r| r.as_str()))
        .bind(filters.source_id)
        .bind(&filters.search)
        .bind(filters.include_closed)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }
}
