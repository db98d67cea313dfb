use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::IngestError;
use crate::ingest::normalize::{PostingFields, id_field, str_field, timestamp_field};
use crate::models::job_source::{JobSource, ProviderType};
use crate::sources::{
    RawPosting, SourceFetcher, get_json, parse_config, path_segment, postings_from, require_slug,
};

const BASE_URL: &str = "https://boards-api.greenhouse.io/v1/boards";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GreenhouseConfig {
    board_token: String,
}

pub struct Greenhouse {
    client: reqwest::Client,
}

impl Greenhouse {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceFetcher for Greenhouse {
    fn provider(&self) -> ProviderType {
        ProviderType::Greenhouse
    }

    async fn fetch(
        &self,
        source: &JobSource,
        timeout: Duration,
    ) -> Result<Vec<RawPosting>, IngestError> {
        let config: GreenhouseConfig = parse_config(source)?;
        let token = require_slug(&config.board_token, "boardToken", source)?;

        let url = format!("{BASE_URL}/{}/jobs?content=true", path_segment(token));
        let data = get_json(&self.client, &url, timeout).await?;
        postings_from(ProviderType::Greenhouse, data, Some("jobs"))
    }
}

/// Map one Greenhouse board job. The board API only publishes open jobs and
/// has no remote flag, so both are left to the shared relevance rules.
pub fn map_posting(raw: &Value) -> PostingFields {
    let mut locations: Vec<String> = raw
        .get("location")
        .and_then(|l| str_field(l, "name"))
        .into_iter()
        .collect();
    if let Some(offices) = raw.get("offices").and_then(|v| v.as_array()) {
        for office in offices {
            if let Some(name) = str_field(office, "name")
                && !locations.contains(&name)
            {
                locations.push(name);
            }
        }
    }

    PostingFields {
        native_id: id_field(raw, "id"),
        title: str_field(raw, "title"),
        url: str_field(raw, "absolute_url"),
        description: str_field(raw, "content").map(|c| unescape_html(&c)),
        company_name: str_field(raw, "company_name"),
        location: (!locations.is_empty()).then(|| locations.join("; ")),
        country: None,
        is_remote: None,
        is_listed: None,
        employment_type: None,
        salary: None,
        posted_at: timestamp_field(raw, "first_published")
            .or_else(|| timestamp_field(raw, "updated_at")),
    }
}

/// Greenhouse returns `content` entity-escaped.
fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
