use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::IngestError;
use crate::ingest::region;
use crate::models::job::StandardizedJob;
use crate::models::job_source::{JobSource, ProviderType};
use crate::sources::{RawPosting, ashby, greenhouse, lever};

const REMOTE_MARKERS: &[&str] = &[
    "remote",
    "remoto",
    "remota",
    "anywhere",
    "home office",
    "work from home",
    "wfh",
];

/// Provider fields mapped onto canonical names, before validation.
#[derive(Debug, Default)]
pub struct PostingFields {
    pub native_id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    pub is_remote: Option<bool>,
    pub is_listed: Option<bool>,
    pub employment_type: Option<String>,
    pub salary: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discard {
    NotRemote,
    Unlisted,
}

#[derive(Debug)]
pub enum Normalized {
    Relevant(StandardizedJob),
    Irrelevant(Discard),
}

/// Map a raw posting into a `StandardizedJob` and apply the relevance filter.
///
/// Missing title or URL is an error for this posting only. A posting that is
/// not remote, or no longer listed, comes back as `Irrelevant`.
pub fn normalize(raw: &RawPosting, source: &JobSource) -> Result<Normalized, IngestError> {
    let fields = match raw.provider {
        ProviderType::Ashby => ashby::map_posting(&raw.payload),
        ProviderType::Greenhouse => greenhouse::map_posting(&raw.payload),
        ProviderType::Lever => lever::map_posting(&raw.payload),
    };

    let title = fields
        .title
        .ok_or_else(|| IngestError::Normalization("posting has no title".to_string()))?;
    let url = fields.url.ok_or_else(|| {
        IngestError::Normalization(format!("posting '{title}' has no URL"))
    })?;

    if fields.is_listed == Some(false) {
        return Ok(Normalized::Irrelevant(Discard::Unlisted));
    }

    let location = fields.location;
    let is_remote = fields.is_remote.unwrap_or_else(|| {
        mentions_remote(location.as_deref().unwrap_or_default()) || mentions_remote(&title)
    });
    if !is_remote {
        return Ok(Normalized::Irrelevant(Discard::NotRemote));
    }

    let hiring_region = region::classify(
        location.as_deref().unwrap_or_default(),
        fields.country.as_deref(),
    );

    Ok(Normalized::Relevant(StandardizedJob {
        job_source_id: source.id,
        provider_type: raw.provider,
        provider_native_id: fields.native_id,
        title,
        description: fields.description.unwrap_or_default(),
        original_url: url,
        company_name: fields
            .company_name
            .unwrap_or_else(|| source.company_name().to_string()),
        location,
        is_remote: fields.is_remote,
        employment_type: fields.employment_type,
        salary: fields.salary,
        posted_at: fields.posted_at,
        hiring_region,
    }))
}

fn mentions_remote(text: &str) -> bool {
    region::mentions_any(text, REMOTE_MARKERS)
}

/// Non-blank, trimmed string field.
pub fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Identifier that a provider may send as either a string or a number.
pub fn id_field(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(_) => str_field(v, key),
        _ => None,
    }
}

pub fn timestamp_field(v: &Value, key: &str) -> Option<DateTime<Utc>> {
    let raw = str_field(v, key)?;
    DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::HiringRegion;
    use serde_json::json;

    fn source(provider: ProviderType) -> JobSource {
        JobSource {
            id: 11,
            name: "Acme".to_string(),
            provider_type: provider.to_string(),
            provider_config: json!({}),
            is_enabled: true,
            last_fetched_at: None,
        }
    }

    fn relevant(result: Result<Normalized, IngestError>) -> StandardizedJob {
        match result {
            Ok(Normalized::Relevant(job)) => job,
            other => panic!("expected relevant job, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_title_or_url_is_an_error() {
        let src = source(ProviderType::Ashby);
        let cases = [
            json!({ "jobUrl": "https://jobs.ashbyhq.com/acme/1", "isRemote": true }),
            json!({ "title": "Engineer", "isRemote": true }),
            json!({ "title": "   ", "jobUrl": "https://x", "isRemote": true }),
            json!({ "title": "Engineer", "jobUrl": "", "isListed": false }),
        ];
        for payload in cases {
            let raw = RawPosting::new(ProviderType::Ashby, payload);
            assert!(matches!(
                normalize(&raw, &src),
                Err(IngestError::Normalization(_))
            ));
        }
    }

    #[test]
    fn test_unlisted_posting_is_discarded() {
        let raw = RawPosting::new(
            ProviderType::Ashby,
            json!({ "title": "Engineer", "jobUrl": "https://x/1", "isRemote": true, "isListed": false }),
        );
        assert!(matches!(
            normalize(&raw, &source(ProviderType::Ashby)),
            Ok(Normalized::Irrelevant(Discard::Unlisted))
        ));
    }

    #[test]
    fn test_provider_flag_beats_location_text() {
        let raw = RawPosting::new(
            ProviderType::Ashby,
            json!({ "title": "Engineer", "jobUrl": "https://x/1", "location": "Remote", "isRemote": false }),
        );
        assert!(matches!(
            normalize(&raw, &source(ProviderType::Ashby)),
            Ok(Normalized::Irrelevant(Discard::NotRemote))
        ));
    }

    #[test]
    fn test_remote_text_used_when_flag_absent() {
        let src = source(ProviderType::Greenhouse);
        let remote = RawPosting::new(
            ProviderType::Greenhouse,
            json!({
                "id": 7,
                "title": "Backend Engineer",
                "absolute_url": "https://boards.greenhouse.io/acme/jobs/7",
                "location": { "name": "Remoto - Brasil" }
            }),
        );
        let job = relevant(normalize(&remote, &src));
        assert_eq!(job.hiring_region, HiringRegion::Brazil);
        assert_eq!(job.provider_native_id.as_deref(), Some("7"));
        assert_eq!(job.company_name, "Acme");
        assert_eq!(job.is_remote, None);

        let onsite = RawPosting::new(
            ProviderType::Greenhouse,
            json!({
                "id": 8,
                "title": "Office Manager",
                "absolute_url": "https://boards.greenhouse.io/acme/jobs/8",
                "location": { "name": "New York" }
            }),
        );
        assert!(matches!(
            normalize(&onsite, &src),
            Ok(Normalized::Irrelevant(Discard::NotRemote))
        ));
    }

    #[test]
    fn test_remote_markers_match_whole_words_only() {
        let src = source(ProviderType::Greenhouse);
        let onsite = RawPosting::new(
            ProviderType::Greenhouse,
            json!({
                "id": 9,
                "title": "Distributed Systems Engineer",
                "absolute_url": "https://boards.greenhouse.io/acme/jobs/9",
                "location": { "name": "San Francisco, CA" }
            }),
        );
        assert!(matches!(
            normalize(&onsite, &src),
            Ok(Normalized::Irrelevant(Discard::NotRemote))
        ));

        let remote_first = RawPosting::new(
            ProviderType::Greenhouse,
            json!({
                "id": 10,
                "title": "Distributed Systems Engineer",
                "absolute_url": "https://boards.greenhouse.io/acme/jobs/10",
                "location": { "name": "Remote-first, Americas" }
            }),
        );
        relevant(normalize(&remote_first, &src));
    }

    #[test]
    fn test_colombia_location_is_latam() {
        let raw = RawPosting::new(
            ProviderType::Lever,
            json!({
                "id": "abc",
                "text": "Remote Support Engineer",
                "hostedUrl": "https://jobs.lever.co/acme/abc",
                "categories": { "location": "Bogotá, Colombia" }
            }),
        );
        let job = relevant(normalize(&raw, &source(ProviderType::Lever)));
        assert_eq!(job.hiring_region, HiringRegion::Latam);
        assert_eq!(job.description, "");
    }

    #[test]
    fn test_id_field_accepts_numbers_and_strings() {
        let v = json!({ "a": 12, "b": " x1 ", "c": null });
        assert_eq!(id_field(&v, "a").as_deref(), Some("12"));
        assert_eq!(id_field(&v, "b").as_deref(), Some("x1"));
        assert_eq!(id_field(&v, "c"), None);
    }
}
