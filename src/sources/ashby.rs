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

const BASE_URL: &str = "https://api.ashbyhq.com/posting-api/job-board";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AshbyConfig {
    board_name: String,
}

pub struct Ashby {
    client: reqwest::Client,
}

impl Ashby {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceFetcher for Ashby {
    fn provider(&self) -> ProviderType {
        ProviderType::Ashby
    }

    async fn fetch(
        &self,
        source: &JobSource,
        timeout: Duration,
    ) -> Result<Vec<RawPosting>, IngestError> {
        let config: AshbyConfig = parse_config(source)?;
        let board = require_slug(&config.board_name, "boardName", source)?;

        let url = format!(
            "{BASE_URL}/{}?includeCompensation=true",
            path_segment(board)
        );
        let data = get_json(&self.client, &url, timeout).await?;
        postings_from(ProviderType::Ashby, data, Some("jobs"))
    }
}

/// Map one Ashby job-board posting.
pub fn map_posting(raw: &Value) -> PostingFields {
    let mut location = str_field(raw, "location");
    let secondary: Vec<String> = raw
        .get("secondaryLocations")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| str_field(item, "location"))
                .collect()
        })
        .unwrap_or_default();
    if !secondary.is_empty() {
        let mut all: Vec<String> = location.into_iter().collect();
        all.extend(secondary);
        location = Some(all.join("; "));
    }

    let country = raw
        .get("address")
        .and_then(|a| a.get("postalAddress"))
        .and_then(|p| str_field(p, "addressCountry"));

    // Older boards only expose isRemote; newer ones also expose workplaceType.
    let is_remote = raw
        .get("isRemote")
        .and_then(|v| v.as_bool())
        .or_else(|| match str_field(raw, "workplaceType")?.as_str() {
            "Remote" => Some(true),
            "OnSite" | "Hybrid" => Some(false),
            _ => None,
        });

    let salary = raw
        .get("compensation")
        .and_then(|c| str_field(c, "compensationTierSummary"));

    PostingFields {
        native_id: id_field(raw, "id"),
        title: str_field(raw, "title"),
        url: str_field(raw, "jobUrl").or_else(|| str_field(raw, "applyUrl")),
        description: str_field(raw, "descriptionHtml")
            .or_else(|| str_field(raw, "descriptionPlain")),
        company_name: None,
        location,
        country,
        is_remote,
        is_listed: raw.get("isListed").and_then(|v| v.as_bool()),
        employment_type: str_field(raw, "employmentType"),
        salary,
        posted_at: timestamp_field(raw, "publishedAt"),
    }
}
