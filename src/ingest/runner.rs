use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};

use crate::error::{IngestError, TriggerError};
use crate::ingest::normalize::{Normalized, normalize};
use crate::ingest::persist::Persister;
use crate::ingest::run_stats::RunStatsRecorder;
use crate::ingest::store::{JobStore, SourceRegistry};
use crate::models::job_source::JobSource;
use crate::models::run_record::{RunRecord, RunStatus};
use crate::sources::{FetcherSet, RawPosting};

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub concurrency: usize,
    pub fetch_timeout: Duration,
    pub max_missed_runs: i32,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            concurrency: 5,
            fetch_timeout: Duration::from_secs(45),
            max_missed_runs: 3,
        }
    }
}

/// Acknowledgment of a dispatched background run. Says nothing about the
/// run's outcome, which only shows up later as a RunRecord.
#[derive(Debug, Serialize)]
pub struct RunDispatch {
    pub status: &'static str,
    pub source_id: i32,
}

/// Drives sources through fetch, normalize and persist, writing exactly one
/// RunRecord per attempt.
pub struct SourceRunner {
    registry: Arc<dyn SourceRegistry>,
    store: Arc<dyn JobStore>,
    fetchers: FetcherSet,
    persister: Persister,
    settings: RunnerSettings,
}

impl SourceRunner {
    pub fn new(
        registry: Arc<dyn SourceRegistry>,
        store: Arc<dyn JobStore>,
        fetchers: FetcherSet,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            registry,
            persister: Persister::new(store.clone()),
            store,
            fetchers,
            settings,
        }
    }

    /// Run one source to completion. Never fails: every error ends up in the
    /// returned (and stored) RunRecord.
    pub async fn run_source(&self, source: &JobSource) -> RunRecord {
        tracing::info!(
            "Starting run for source {} '{}' ({})",
            source.id,
            source.name,
            source.provider_type
        );
        let stats = RunStatsRecorder::start(source.id, Utc::now());

        let record = match self.fetch(source).await {
            Ok(postings) => self.process(source, postings, stats).await,
            Err(e) => {
                tracing::error!("Source {} fetch failed: {e}", source.id);
                stats.fail(&e, Utc::now())
            }
        };

        if let Err(e) = self
            .store
            .update_source_last_fetched(source.id, record.run_ended_at)
            .await
        {
            tracing::error!("Failed to update last_fetched_at for source {}: {e}", source.id);
        }
        if let Err(e) = self.store.save_run_record(&record).await {
            tracing::error!("Failed to save run record for source {}: {e}", source.id);
        }

        tracing::info!(
            "Source {} run finished with {}: {} found, {} relevant, {} processed, {} errored",
            source.id,
            record.status,
            record.jobs_found,
            record.jobs_relevant,
            record.jobs_processed,
            record.jobs_errored
        );
        record
    }

    async fn fetch(&self, source: &JobSource) -> Result<Vec<RawPosting>, IngestError> {
        let provider = source.provider()?;
        let fetcher = self.fetchers.get(provider).ok_or_else(|| {
            IngestError::Configuration(format!("no fetcher registered for provider '{provider}'"))
        })?;

        let timeout = self.settings.fetch_timeout;
        match tokio::time::timeout(timeout, fetcher.fetch(source, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(IngestError::Transport(format!(
                "fetch timed out after {}s",
                timeout.as_secs_f32()
            ))),
        }
    }

    async fn process(
        &self,
        source: &JobSource,
        postings: Vec<RawPosting>,
        mut stats: RunStatsRecorder,
    ) -> RunRecord {
        stats.record_found(postings.len());
        let mut seen = HashSet::new();

        for raw in &postings {
            let job = match normalize(raw, source) {
                Ok(Normalized::Relevant(job)) => job,
                Ok(Normalized::Irrelevant(reason)) => {
                    tracing::debug!("Source {} discarded posting: {reason:?}", source.id);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Source {} skipped posting: {e}", source.id);
                    stats.record_normalization_error();
                    continue;
                }
            };

            stats.record_relevant();
            seen.insert(job.identity());
            match self.persister.upsert(&job).await {
                Ok(outcome) => stats.record_persisted(outcome),
                Err(e) => {
                    tracing::warn!(
                        "Source {} failed to persist '{}': {e}",
                        source.id,
                        job.original_url
                    );
                    stats.record_persistence_error(&e);
                }
            }
        }

        let mut record = stats.finish(Utc::now());

        // Only a clean run is trusted to say which jobs disappeared upstream.
        if record.status == RunStatus::Success {
            match self
                .store
                .retire_unseen_jobs(source.id, &seen, self.settings.max_missed_runs)
                .await
            {
                Ok(closed) => {
                    record.jobs_closed = i32::try_from(closed).unwrap_or(i32::MAX);
                    if closed > 0 {
                        tracing::info!("Source {} closed {closed} stale jobs", source.id);
                    }
                }
                Err(e) => tracing::warn!("Source {} staleness pass failed: {e}", source.id),
            }
        }
        record
    }

    /// Run every enabled source with at most `concurrency` in flight.
    /// One source failing never stops the others.
    pub async fn run_all(self: &Arc<Self>) -> Result<Vec<RunRecord>, IngestError> {
        let sources = self.registry.list_enabled_sources().await?;
        tracing::info!("Running {} enabled sources", sources.len());

        let sem = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut join_set = JoinSet::new();
        for source in sources {
            let sem = sem.clone();
            let runner = self.clone();
            join_set.spawn(async move {
                let _permit = sem.acquire().await;
                runner.run_source(&source).await
            });
        }

        let mut records = Vec::new();
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(record) => records.push(record),
                Err(e) => tracing::error!("Source run task failed: {e:?}"),
            }
        }

        let failed = records
            .iter()
            .filter(|r| r.status == RunStatus::Failure)
            .count();
        tracing::info!("Batch complete: {} runs, {failed} failed", records.len());
        Ok(records)
    }

    pub fn spawn_source_run(self: &Arc<Self>, source: JobSource) -> JoinHandle<RunRecord> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run_source(&source).await })
    }

    /// Fire-and-forget re-run of one source. Returns once the run is
    /// dispatched; disabled or unknown sources are rejected without fetching.
    pub async fn trigger_source_run(
        self: &Arc<Self>,
        source_id: i32,
    ) -> Result<RunDispatch, TriggerError> {
        let source = self
            .registry
            .get_source(source_id)
            .await?
            .ok_or(TriggerError::NotFound(source_id))?;
        if !source.is_enabled {
            return Err(TriggerError::Disabled(source_id));
        }

        tracing::info!("Dispatching manual run for source {source_id}");
        drop(self.spawn_source_run(source));
        Ok(RunDispatch {
            status: "dispatched",
            source_id,
        })
    }

    /// Fire-and-forget batch over all enabled sources.
    pub fn trigger_all(self: &Arc<Self>) {
        let runner = self.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.run_all().await {
                tracing::error!("Batch run failed to start: {e}");
            }
        });
    }
}
