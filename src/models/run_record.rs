use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::IngestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    PartialSuccess,
    Failure,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::PartialSuccess => "PARTIAL_SUCCESS",
            RunStatus::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(RunStatus::Success),
            "PARTIAL_SUCCESS" => Ok(RunStatus::PartialSuccess),
            "FAILURE" => Ok(RunStatus::Failure),
            other => Err(IngestError::Persistence(format!(
                "unknown run status '{other}'"
            ))),
        }
    }
}

/// Audit row for one attempt of one source. Immutable once saved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub job_source_id: i32,
    pub run_started_at: DateTime<Utc>,
    pub run_ended_at: DateTime<Utc>,
    pub status: RunStatus,
    pub jobs_found: i32,
    pub jobs_relevant: i32,
    pub jobs_processed: i32,
    pub jobs_errored: i32,
    pub jobs_created: i32,
    pub jobs_updated: i32,
    pub jobs_closed: i32,
    pub error_message: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct RunRecordRow {
    pub job_source_id: i32,
    pub run_started_at: DateTime<Utc>,
    pub run_ended_at: DateTime<Utc>,
    pub status: String,
    pub jobs_found: i32,
    pub jobs_relevant: i32,
    pub jobs_processed: i32,
    pub jobs_errored: i32,
    pub jobs_created: i32,
    pub jobs_updated: i32,
    pub jobs_closed: i32,
    pub error_message: Option<String>,
}

impl TryFrom<RunRecordRow> for RunRecord {
    type Error = IngestError;

    fn try_from(row: RunRecordRow) -> Result<Self, Self::Error> {
        Ok(RunRecord {
            job_source_id: row.job_source_id,
            run_started_at: row.run_started_at,
            run_ended_at: row.run_ended_at,
            status: row.status.parse()?,
            jobs_found: row.jobs_found,
            jobs_relevant: row.jobs_relevant,
            jobs_processed: row.jobs_processed,
            jobs_errored: row.jobs_errored,
            jobs_created: row.jobs_created,
            jobs_updated: row.jobs_updated,
            jobs_closed: row.jobs_closed,
            error_message: row.error_message,
        })
    }
}
