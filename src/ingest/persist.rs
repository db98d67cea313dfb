use std::sync::Arc;

use crate::error::IngestError;
use crate::ingest::store::JobStore;
use crate::models::job::{StandardizedJob, UpsertOutcome};

/// Dedup-aware writer in front of the job store.
#[derive(Clone)]
pub struct Persister {
    store: Arc<dyn JobStore>,
}

impl Persister {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Create, update or skip a relevant job by its identity key.
    ///
    /// The read is only a shortcut for unchanged postings; the store's upsert
    /// is what keeps concurrent runs from creating duplicates. A skipped job
    /// is still marked as seen.
    pub async fn upsert(&self, job: &StandardizedJob) -> Result<UpsertOutcome, IngestError> {
        let identity = job.identity();
        if let Some(existing) = self.store.find_job_by_identity(&identity).await?
            && !existing.differs_from(job)
        {
            self.store.mark_job_seen(&identity).await?;
            return Ok(UpsertOutcome::Skipped);
        }
        self.store.upsert_job(job).await
    }
}
