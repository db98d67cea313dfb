// In-memory JobStore and SourceRegistry used by the pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::IngestError;
use crate::ingest::store::{JobStore, SourceRegistry};
use crate::models::job::{Job, JobFilters, JobIdentity, StandardizedJob, UpsertOutcome};
use crate::models::job_source::JobSource;
use crate::models::run_record::RunRecord;

#[derive(Default)]
struct State {
    sources: Vec<JobSource>,
    jobs: HashMap<JobIdentity, Job>,
    runs: Vec<RunRecord>,
    next_job_id: i64,
    unavailable: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn with_sources(sources: Vec<JobSource>) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().sources = sources;
        store
    }

    /// Make every job read/write fail, as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    pub fn job_count(&self) -> usize {
        self.state.lock().unwrap().jobs.len()
    }

    pub fn stored_job(&self, identity: &JobIdentity) -> Option<Job> {
        self.state.lock().unwrap().jobs.get(identity).cloned()
    }

    pub fn runs_for(&self, job_source_id: i32) -> Vec<RunRecord> {
        self.state
            .lock()
            .unwrap()
            .runs
            .iter()
            .filter(|r| r.job_source_id == job_source_id)
            .cloned()
            .collect()
    }

    pub fn source(&self, id: i32) -> Option<JobSource> {
        self.state
            .lock()
            .unwrap()
            .sources
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    fn check_available(state: &State) -> Result<(), IngestError> {
        if state.unavailable {
            return Err(IngestError::Persistence("connection refused".to_string()));
        }
        Ok(())
    }
}

fn merge(stored: &mut Job, job: &StandardizedJob, now: DateTime<Utc>) {
    stored.job_source_id = job.job_source_id;
    stored.title = job.title.clone();
    stored.original_url = job.original_url.clone();
    stored.company_name = job.company_name.clone();
    stored.hiring_region = job.hiring_region.as_str().to_string();
    if !job.description.is_empty() {
        stored.description = job.description.clone();
    }
    if job.provider_native_id.is_some() {
        stored.provider_native_id = job.provider_native_id.clone();
    }
    if job.location.is_some() {
        stored.location = job.location.clone();
    }
    if job.is_remote.is_some() {
        stored.is_remote = job.is_remote;
    }
    if job.employment_type.is_some() {
        stored.employment_type = job.employment_type.clone();
    }
    if job.salary.is_some() {
        stored.salary = job.salary.clone();
    }
    if job.posted_at.is_some() {
        stored.posted_at = job.posted_at;
    }
    stored.last_seen_at = now;
    stored.missed_runs = 0;
    stored.closed_at = None;
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn find_job_by_identity(
        &self,
        identity: &JobIdentity,
    ) -> Result<Option<StandardizedJob>, IngestError> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        state
            .jobs
            .get(identity)
            .map(|job| job.to_standardized())
            .transpose()
    }

    async fn upsert_job(&self, job: &StandardizedJob) -> Result<UpsertOutcome, IngestError> {
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        let now = Utc::now();
        let identity = job.identity();

        if let Some(stored) = state.jobs.get_mut(&identity) {
            merge(stored, job, now);
            return Ok(UpsertOutcome::Updated);
        }

        state.next_job_id += 1;
        let stored = Job {
            id: state.next_job_id,
            job_source_id: job.job_source_id,
            provider_type: job.provider_type.as_str().to_string(),
            identity_key: identity.key.clone(),
            provider_native_id: job.provider_native_id.clone(),
            title: job.title.clone(),
            description: job.description.clone(),
            original_url: job.original_url.clone(),
            company_name: job.company_name.clone(),
            location: job.location.clone(),
            is_remote: job.is_remote,
            employment_type: job.employment_type.clone(),
            salary: job.salary.clone(),
            posted_at: job.posted_at,
            hiring_region: job.hiring_region.as_str().to_string(),
            missed_runs: 0,
            first_seen_at: now,
            last_seen_at: now,
            closed_at: None,
        };
        state.jobs.insert(identity, stored);
        Ok(UpsertOutcome::Created)
    }

    async fn mark_job_seen(&self, identity: &JobIdentity) -> Result<(), IngestError> {
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        if let Some(job) = state.jobs.get_mut(identity) {
            job.last_seen_at = Utc::now();
            job.missed_runs = 0;
            job.closed_at = None;
        }
        Ok(())
    }

    async fn retire_unseen_jobs(
        &self,
        job_source_id: i32,
        seen: &HashSet<JobIdentity>,
        max_missed_runs: i32,
    ) -> Result<u64, IngestError> {
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        let now = Utc::now();
        let mut closed = 0;

        for (identity, job) in state.jobs.iter_mut() {
            if job.job_source_id != job_source_id {
                continue;
            }
            if seen.contains(identity) {
                job.missed_runs = 0;
                job.closed_at = None;
                job.last_seen_at = now;
            } else if job.closed_at.is_none() {
                job.missed_runs += 1;
                if job.missed_runs >= max_missed_runs {
                    job.closed_at = Some(now);
                    closed += 1;
                }
            }
        }
        Ok(closed)
    }

    async fn save_run_record(&self, record: &RunRecord) -> Result<(), IngestError> {
        self.state.lock().unwrap().runs.push(record.clone());
        Ok(())
    }

    async fn latest_run_record(
        &self,
        job_source_id: i32,
    ) -> Result<Option<RunRecord>, IngestError> {
        Ok(self.recent_run_records(job_source_id, 1).await?.into_iter().next())
    }

    async fn recent_run_records(
        &self,
        job_source_id: i32,
        limit: i64,
    ) -> Result<Vec<RunRecord>, IngestError> {
        let mut runs = self.runs_for(job_source_id);
        runs.reverse();
        runs.sort_by(|a, b| b.run_ended_at.cmp(&a.run_ended_at));
        runs.truncate(limit.max(0) as usize);
        Ok(runs)
    }

    async fn update_source_last_fetched(
        &self,
        job_source_id: i32,
        at: DateTime<Utc>,
    ) -> Result<(), IngestError> {
        let mut state = self.state.lock().unwrap();
        if let Some(source) = state.sources.iter_mut().find(|s| s.id == job_source_id) {
            source.last_fetched_at = Some(at);
        }
        Ok(())
    }

    async fn list_jobs(&self, filters: &JobFilters) -> Result<Vec<Job>, IngestError> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        let (limit, offset) = filters.limit_offset();
        let search = filters.search.as_deref().map(str::to_lowercase);

        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| filters.region.is_none_or(|r| j.hiring_region == r.as_str()))
            .filter(|j| filters.source_id.is_none_or(|id| j.job_source_id == id))
            .filter(|j| {
                search
                    .as_deref()
                    .is_none_or(|s| j.title.to_lowercase().contains(s))
            })
            .filter(|j| filters.include_closed || j.closed_at.is_none())
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.id);
        Ok(jobs
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl SourceRegistry for MemoryStore {
    async fn list_sources(&self) -> Result<Vec<JobSource>, IngestError> {
        Ok(self.state.lock().unwrap().sources.clone())
    }

    async fn list_enabled_sources(&self) -> Result<Vec<JobSource>, IngestError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .sources
            .iter()
            .filter(|s| s.is_enabled)
            .cloned()
            .collect())
    }

    async fn get_source(&self, id: i32) -> Result<Option<JobSource>, IngestError> {
        Ok(self.source(id))
    }

    async fn toggle_source(&self, id: i32) -> Result<Option<JobSource>, IngestError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.sources.iter_mut().find(|s| s.id == id).map(|s| {
            s.is_enabled = !s.is_enabled;
            s.clone()
        }))
    }
}
