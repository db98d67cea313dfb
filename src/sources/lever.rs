use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::IngestError;
use crate::ingest::normalize::{PostingFields, id_field, str_field};
use crate::models::job_source::{JobSource, ProviderType};
use crate::sources::{
    RawPosting, SourceFetcher, get_json, parse_config, path_segment, postings_from, require_slug,
};

const BASE_URL: &str = "https://api.lever.co/v0/postings";

#[derive(Debug, Deserialize)]
struct LeverConfig {
    site: String,
}

pub struct Lever {
    client: reqwest::Client,
}

impl Lever {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceFetcher for Lever {
    fn provider(&self) -> ProviderType {
        ProviderType::Lever
    }

    async fn fetch(
        &self,
        source: &JobSource,
        timeout: Duration,
    ) -> Result<Vec<RawPosting>, IngestError> {
        let config: LeverConfig = parse_config(source)?;
        let site = require_slug(&config.site, "site", source)?;

        let url = format!("{BASE_URL}/{}?mode=json", path_segment(site));
        let data = get_json(&self.client, &url, timeout).await?;
        // Lever answers with a bare array.
        postings_from(ProviderType::Lever, data, None)
    }
}

pub fn map_posting(raw: &Value) -> PostingFields {
    let categories = raw.get("categories");

    let mut locations: Vec<String> = categories
        .and_then(|c| c.get("allLocations"))
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    if locations.is_empty()
        && let Some(location) = categories.and_then(|c| str_field(c, "location"))
    {
        locations.push(location);
    }

    let is_remote = match str_field(raw, "workplaceType").as_deref() {
        Some("remote") => Some(true),
        Some("onsite") | Some("hybrid") => Some(false),
        _ => None,
    };

    PostingFields {
        native_id: id_field(raw, "id"),
        title: str_field(raw, "text"),
        url: str_field(raw, "hostedUrl").or_else(|| str_field(raw, "applyUrl")),
        description: str_field(raw, "description")
            .or_else(|| str_field(raw, "descriptionPlain")),
        company_name: None,
        location: (!locations.is_empty()).then(|| locations.join("; ")),
        country: str_field(raw, "country"),
        is_remote,
        is_listed: None,
        employment_type: categories.and_then(|c| str_field(c, "commitment")),
        salary: raw.get("salaryRange").and_then(salary_range),
        posted_at: raw
            .get("createdAt")
            .and_then(|v| v.as_i64())
            .and_then(DateTime::<Utc>::from_timestamp_millis),
    }
}

fn salary_range(range: &Value) -> Option<String> {
    let min = range.get("min").and_then(|v| v.as_f64())?;
    let max = range.get("max").and_then(|v| v.as_f64()).unwrap_or(min);
    let currency = str_field(range, "currency").unwrap_or_default();
    let interval = str_field(range, "interval")
        .map(|i| format!(" {i}"))
        .unwrap_or_default();
    Some(format!("{currency} {min:.0}-{max:.0}{interval}").trim().to_string())
}
