use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::IngestError;
use crate::models::job::{Job, JobFilters, JobIdentity, StandardizedJob, UpsertOutcome};
use crate::models::job_source::JobSource;
use crate::models::run_record::RunRecord;

/// Persistence of ingested jobs and run audit rows.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_job_by_identity(
        &self,
        identity: &JobIdentity,
    ) -> Result<Option<StandardizedJob>, IngestError>;

    /// Insert or update keyed on the job identity. Implementations enforce
    /// uniqueness of the key themselves so concurrent writers cannot duplicate rows.
    async fn upsert_job(&self, job: &StandardizedJob) -> Result<UpsertOutcome, IngestError>;

    /// Record that an unchanged job was seen again: refresh `last_seen_at`,
    /// clear the miss counter and reopen it if it had been closed.
    async fn mark_job_seen(&self, identity: &JobIdentity) -> Result<(), IngestError>;

    /// Reset the miss counter of `seen` jobs of a source, bump it for the
    /// others, and close those reaching `max_missed_runs`. Returns how many
    /// jobs were closed.
    async fn retire_unseen_jobs(
        &self,
        job_source_id: i32,
        seen: &HashSet<JobIdentity>,
        max_missed_runs: i32,
    ) -> Result<u64, IngestError>;

    async fn save_run_record(&self, record: &RunRecord) -> Result<(), IngestError>;

    async fn latest_run_record(&self, job_source_id: i32)
    -> Result<Option<RunRecord>, IngestError>;

    async fn recent_run_records(
        &self,
        job_source_id: i32,
        limit: i64,
    ) -> Result<Vec<RunRecord>, IngestError>;

    async fn update_source_last_fetched(
        &self,
        job_source_id: i32,
        at: DateTime<Utc>,
    ) -> Result<(), IngestError>;

    async fn list_jobs(&self, filters: &JobFilters) -> Result<Vec<Job>, IngestError>;
}

/// Configured job sources.
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    async fn list_sources(&self) -> Result<Vec<JobSource>, IngestError>;

    async fn list_enabled_sources(&self) -> Result<Vec<JobSource>, IngestError>;

    async fn get_source(&self, id: i32) -> Result<Option<JobSource>, IngestError>;

    /// Flip `is_enabled`. Returns `None` when the source does not exist.
    async fn toggle_source(&self, id: i32) -> Result<Option<JobSource>, IngestError>;
}
