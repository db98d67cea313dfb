use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::models::job_source::ProviderType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HiringRegion {
    Brazil,
    Latam,
    Worldwide,
}

impl HiringRegion {
    pub fn as_str(&self) -> &'static str {
        match self {
            HiringRegion::Brazil => "BRAZIL",
            HiringRegion::Latam => "LATAM",
            HiringRegion::Worldwide => "WORLDWIDE",
        }
    }
}

impl fmt::Display for HiringRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HiringRegion {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BRAZIL" => Ok(HiringRegion::Brazil),
            "LATAM" => Ok(HiringRegion::Latam),
            "WORLDWIDE" => Ok(HiringRegion::Worldwide),
            other => Err(IngestError::Persistence(format!(
                "unknown hiring region '{other}'"
            ))),
        }
    }
}

/// Stable dedup key of a posting across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobIdentity {
    pub provider_type: ProviderType,
    pub key: String,
}

/// Canonical, provider-agnostic job listing produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardizedJob {
    pub job_source_id: i32,
    pub provider_type: ProviderType,
    pub provider_native_id: Option<String>,
    pub title: String,
    pub description: String,
    pub original_url: String,
    pub company_name: String,
    pub location: Option<String>,
    pub is_remote: Option<bool>,
    pub employment_type: Option<String>,
    pub salary: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub hiring_region: HiringRegion,
}

impl StandardizedJob {
    pub fn identity(&self) -> JobIdentity {
        JobIdentity {
            provider_type: self.provider_type,
            key: self
                .provider_native_id
                .clone()
                .unwrap_or_else(|| self.original_url.clone()),
        }
    }

    /// True when applying `incoming` over `self` would change a stored field.
    /// Fields missing from `incoming` never count, since they are not cleared.
    pub fn differs_from(&self, incoming: &StandardizedJob) -> bool {
        fn changed<T: PartialEq>(stored: &Option<T>, incoming: &Option<T>) -> bool {
            incoming.is_some() && incoming != stored
        }

        self.title != incoming.title
            || self.original_url != incoming.original_url
            || self.company_name != incoming.company_name
            || self.hiring_region != incoming.hiring_region
            || (!incoming.description.is_empty() && self.description != incoming.description)
            || changed(&self.location, &incoming.location)
            || changed(&self.is_remote, &incoming.is_remote)
            || changed(&self.employment_type, &incoming.employment_type)
            || changed(&self.salary, &incoming.salary)
            || changed(&self.posted_at, &incoming.posted_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Updated,
    Skipped,
}

/// A stored job record as listed by the admin API.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Job {
    pub id: i64,
    pub job_source_id: i32,
    pub provider_type: String,
    pub identity_key: String,
    pub provider_native_id: Option<String>,
    pub title: String,
    pub description: String,
    pub original_url: String,
    pub company_name: String,
    pub location: Option<String>,
    pub is_remote: Option<bool>,
    pub employment_type: Option<String>,
    pub salary: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub hiring_region: String,
    pub missed_runs: i32,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn to_standardized(&self) -> Result<StandardizedJob, IngestError> {
        Ok(StandardizedJob {
            job_source_id: self.job_source_id,
            provider_type: self
                .provider_type
                .parse::<ProviderType>()
                .map_err(|e| IngestError::Persistence(e.to_string()))?,
            provider_native_id: self.provider_native_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            original_url: self.original_url.clone(),
            company_name: self.company_name.clone(),
            location: self.location.clone(),
            is_remote: self.is_remote,
            employment_type: self.employment_type.clone(),
            salary: self.salary.clone(),
            posted_at: self.posted_at,
            hiring_region: self.hiring_region.parse::<HiringRegion>()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct JobFilters {
    pub region: Option<HiringRegion>,
    pub source_id: Option<i32>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_closed: bool,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl JobFilters {
    pub fn limit_offset(&self) -> (i64, i64) {
        let per_page = self.per_page.unwrap_or(50).clamp(1, 100);
        let offset = (self.page.unwrap_or(1) - 1).max(0) * per_page;
        (per_page, offset)
    }
}
