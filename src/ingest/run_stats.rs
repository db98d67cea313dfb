use chrono::{DateTime, Utc};

use crate::error::IngestError;
use crate::models::job::UpsertOutcome;
use crate::models::run_record::{RunRecord, RunStatus};

/// Counters for one source run, turned into a `RunRecord` at the end.
#[derive(Debug)]
pub struct RunStatsRecorder {
    job_source_id: i32,
    started_at: DateTime<Utc>,
    found: i32,
    relevant: i32,
    processed: i32,
    created: i32,
    updated: i32,
    normalization_errors: i32,
    persistence_errors: i32,
    last_persistence_error: Option<String>,
}

impl RunStatsRecorder {
    pub fn start(job_source_id: i32, started_at: DateTime<Utc>) -> Self {
        Self {
            job_source_id,
            started_at,
            found: 0,
            relevant: 0,
            processed: 0,
            created: 0,
            updated: 0,
            normalization_errors: 0,
            persistence_errors: 0,
            last_persistence_error: None,
        }
    }

    pub fn record_found(&mut self, count: usize) {
        self.found = i32::try_from(count).unwrap_or(i32::MAX);
    }

    pub fn record_relevant(&mut self) {
        self.relevant += 1;
    }

    pub fn record_persisted(&mut self, outcome: UpsertOutcome) {
        self.processed += 1;
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Skipped => {}
        }
    }

    pub fn record_normalization_error(&mut self) {
        self.normalization_errors += 1;
    }

    pub fn record_persistence_error(&mut self, error: &IngestError) {
        self.persistence_errors += 1;
        self.last_persistence_error = Some(error.to_string());
    }

    /// Every persistence attempt failed, i.e. the store looks unreachable.
    fn store_unreachable(&self) -> bool {
        self.relevant > 0 && self.processed == 0 && self.persistence_errors == self.relevant
    }

    /// Close a run whose fetch succeeded.
    pub fn finish(self, ended_at: DateTime<Utc>) -> RunRecord {
        let errored = self.normalization_errors + self.persistence_errors;
        let (status, error_message) = if self.store_unreachable() {
            (
                RunStatus::Failure,
                self.last_persistence_error
                    .as_ref()
                    .map(|e| format!("every job failed to persist: {e}")),
            )
        } else if errored == 0 {
            (RunStatus::Success, None)
        } else {
            (RunStatus::PartialSuccess, None)
        };

        RunRecord {
            job_source_id: self.job_source_id,
            run_started_at: self.started_at,
            run_ended_at: ended_at,
            status,
            jobs_found: self.found,
            jobs_relevant: self.relevant,
            jobs_processed: self.processed,
            jobs_errored: errored,
            jobs_created: self.created,
            jobs_updated: self.updated,
            jobs_closed: 0,
            error_message,
        }
    }

    /// Close a run whose fetch itself failed. No postings were attempted.
    pub fn fail(self, error: &IngestError, ended_at: DateTime<Utc>) -> RunRecord {
        RunRecord {
            job_source_id: self.job_source_id,
            run_started_at: self.started_at,
            run_ended_at: ended_at,
            status: RunStatus::Failure,
            jobs_found: 0,
            jobs_relevant: 0,
            jobs_processed: 0,
            jobs_errored: 0,
            jobs_created: 0,
            jobs_updated: 0,
            jobs_closed: 0,
            error_message: Some(error.to_string()),
        }
    }
}
