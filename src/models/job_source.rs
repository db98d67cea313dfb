use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Which fetcher implementation serves a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Ashby,
    Greenhouse,
    Lever,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Ashby => "ashby",
            ProviderType::Greenhouse => "greenhouse",
            ProviderType::Lever => "lever",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ashby" => Ok(ProviderType::Ashby),
            "greenhouse" => Ok(ProviderType::Greenhouse),
            "lever" => Ok(ProviderType::Lever),
            other => Err(IngestError::Configuration(format!(
                "unknown provider type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSource {
    pub id: i32,
    pub name: String,
    /// Stored as written; resolved per run so one unknown provider only
    /// fails its own source.
    pub provider_type: String,
    pub provider_config: serde_json::Value,
    pub is_enabled: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl JobSource {
    pub fn provider(&self) -> Result<ProviderType, IngestError> {
        self.provider_type.parse()
    }

    /// Company name to fall back on when a posting does not carry one.
    pub fn company_name(&self) -> &str {
        self.provider_config
            .get("companyName")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct JobSourceRow {
    pub id: i32,
    pub name: String,
    pub provider_type: String,
    pub provider_config: serde_json::Value,
    pub is_enabled: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl From<JobSourceRow> for JobSource {
    fn from(row: JobSourceRow) -> Self {
        JobSource {
            id: row.id,
            name: row.name,
            provider_type: row.provider_type,
            provider_config: row.provider_config,
            is_enabled: row.is_enabled,
            last_fetched_at: row.last_fetched_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!("Ashby".parse::<ProviderType>().unwrap(), ProviderType::Ashby);
        assert_eq!(" lever ".parse::<ProviderType>().unwrap(), ProviderType::Lever);
        assert!(matches!(
            "workday".parse::<ProviderType>(),
            Err(IngestError::Configuration(_))
        ));
    }

    #[test]
    fn test_company_name_falls_back_to_source_name() {
        let mut source = JobSource {
            id: 1,
            name: "Acme".to_string(),
            provider_type: "ashby".to_string(),
            provider_config: json!({ "boardName": "acme" }),
            is_enabled: true,
            last_fetched_at: None,
        };
        assert_eq!(source.company_name(), "Acme");

        source.provider_config = json!({ "boardName": "acme", "companyName": "Acme Inc" });
        assert_eq!(source.company_name(), "Acme Inc");
    }

    #[test]
    fn test_unknown_provider_is_a_configuration_error() {
        let source = JobSource::from(JobSourceRow {
            id: 4,
            name: "Acme".to_string(),
            provider_type: "workable".to_string(),
            provider_config: json!({}),
            is_enabled: true,
            last_fetched_at: None,
        });
        assert_eq!(source.provider_type, "workable");
        assert!(matches!(source.provider(), Err(IngestError::Configuration(_))));
    }
}
