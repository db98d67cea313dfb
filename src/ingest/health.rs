use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::IngestError;
use crate::ingest::store::{JobStore, SourceRegistry};
use crate::models::job_source::JobSource;
use crate::models::run_record::{RunRecord, RunStatus};

pub const DEFAULT_STALE_AFTER_HOURS: i64 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Error,
    Unknown,
}

/// Derives a source's health label from its latest run. Read-only.
#[derive(Debug, Clone, Copy)]
pub struct HealthEvaluator {
    stale_after: Duration,
}

impl Default for HealthEvaluator {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_STALE_AFTER_HOURS))
    }
}

impl HealthEvaluator {
    pub fn new(stale_after: Duration) -> Self {
        Self { stale_after }
    }

    pub fn evaluate(&self, latest: Option<&RunRecord>, now: DateTime<Utc>) -> HealthStatus {
        let Some(run) = latest else {
            return HealthStatus::Unknown;
        };

        match run.status {
            RunStatus::Failure => HealthStatus::Error,
            RunStatus::PartialSuccess => HealthStatus::Warning,
            RunStatus::Success => {
                let empty = run.jobs_found == 0 && run.jobs_relevant == 0;
                let stale = now - run.run_ended_at > self.stale_after;
                if empty || stale {
                    HealthStatus::Warning
                } else {
                    HealthStatus::Healthy
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceHealth {
    pub source: JobSource,
    pub health: HealthStatus,
    pub latest_run: Option<RunRecord>,
}

/// Health of every configured source, enabled or not.
pub async fn health_listing(
    registry: &dyn SourceRegistry,
    store: &dyn JobStore,
    evaluator: &HealthEvaluator,
    now: DateTime<Utc>,
) -> Result<Vec<SourceHealth>, IngestError> {
    let sources = registry.list_sources().await?;
    let mut listing = Vec::with_capacity(sources.len());
    for source in sources {
        let latest_run = store.latest_run_record(source.id).await?;
        listing.push(SourceHealth {
            health: evaluator.evaluate(latest_run.as_ref(), now),
            source,
            latest_run,
        });
    }
    Ok(listing)
}
