// Source fetchers: one implementation per external job-board provider.
// Fetchers only retrieve postings; relevance is decided by the normalizer.

pub mod ashby;
pub mod greenhouse;
pub mod lever;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::IngestError;
use crate::models::job_source::{JobSource, ProviderType};

/// Characters left untouched when a board slug is placed in a URL path.
const PATH_SEGMENT_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

const USER_AGENT: &str = concat!("jobboard-ingest/", env!("CARGO_PKG_VERSION"));

/// One provider-shaped job listing, valid for the duration of a run.
#[derive(Debug, Clone)]
pub struct RawPosting {
    pub provider: ProviderType,
    pub payload: Value,
}

impl RawPosting {
    pub fn new(provider: ProviderType, payload: Value) -> Self {
        Self { provider, payload }
    }
}

/// Trait that all provider fetchers implement.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    fn provider(&self) -> ProviderType;

    /// Fetch every posting the source currently publishes.
    /// Must fail with `IngestError::Configuration` before any network call
    /// when the source config is unusable.
    async fn fetch(
        &self,
        source: &JobSource,
        timeout: Duration,
    ) -> Result<Vec<RawPosting>, IngestError>;
}

/// Fetcher lookup by provider type.
#[derive(Clone, Default)]
pub struct FetcherSet {
    fetchers: HashMap<ProviderType, Arc<dyn SourceFetcher>>,
}

impl FetcherSet {
    /// All built-in HTTP fetchers sharing one client.
    pub fn http() -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| IngestError::Transport(format!("Failed to build HTTP client: {e}")))?;

        let mut set = Self::default();
        set.insert(Arc::new(ashby::Ashby::new(client.clone())));
        set.insert(Arc::new(greenhouse::Greenhouse::new(client.clone())));
        set.insert(Arc::new(lever::Lever::new(client)));
        Ok(set)
    }

    pub fn insert(&mut self, fetcher: Arc<dyn SourceFetcher>) {
        self.fetchers.insert(fetcher.provider(), fetcher);
    }

    pub fn get(&self, provider: ProviderType) -> Option<Arc<dyn SourceFetcher>> {
        self.fetchers.get(&provider).cloned()
    }
}

/// Deserialize a source's provider config into the fetcher's typed shape.
pub fn parse_config<T: DeserializeOwned>(source: &JobSource) -> Result<T, IngestError> {
    serde_json::from_value(source.provider_config.clone()).map_err(|e| {
        IngestError::Configuration(format!(
            "invalid {} config for source {}: {e}",
            source.provider_type, source.id
        ))
    })
}

/// Reject blank slugs, returning the trimmed value.
pub fn require_slug<'a>(
    value: &'a str,
    field: &str,
    source: &JobSource,
) -> Result<&'a str, IngestError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(IngestError::Configuration(format!(
            "'{field}' is empty for source {}",
            source.id
        )));
    }
    Ok(trimmed)
}

pub fn path_segment(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT_SET).to_string()
}

/// GET a JSON document, mapping non-2xx statuses and bad bodies to transport errors.
pub async fn get_json(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Value, IngestError> {
    let resp = client
        .get(url)
        .header("Accept", "application/json")
        .timeout(timeout)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(IngestError::Transport(format!(
            "{url} returned {}",
            resp.status()
        )));
    }

    resp.json()
        .await
        .map_err(|e| IngestError::Transport(format!("Failed to parse response from {url}: {e}")))
}

/// Pull the array of postings out of a provider response.
pub fn postings_from(
    provider: ProviderType,
    data: Value,
    key: Option<&str>,
) -> Result<Vec<RawPosting>, IngestError> {
    let array = match key {
        Some(key) => match data {
            Value::Object(mut obj) => obj.remove(key),
            _ => None,
        },
        None => Some(data),
    };

    match array {
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .map(|payload| RawPosting::new(provider, payload))
            .collect()),
        _ => Err(IngestError::Transport(format!(
            "Missing '{}' array in {provider} response",
            key.unwrap_or("postings")
        ))),
    }
}
