use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A repository imported into an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type", default)]
    pub project_type: String,
    #[serde(default)]
    pub integration_provider: String,
    #[serde(default)]
    pub integration_type: String,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub downloaded: bool,
    #[serde(default)]
    pub added_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub invalid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectImportRequest {
    pub integration_id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
