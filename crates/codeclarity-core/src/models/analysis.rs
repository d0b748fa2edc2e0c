use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::poller::Polled;

/// Lifecycle state of an analysis run.
///
/// Values the client does not know are kept verbatim in `Other` so a new
/// server-side state never fails a decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnalysisStatus {
    Requested,
    Triggered,
    Started,
    Finished,
    Completed,
    Success,
    Failed,
    Other(String),
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AnalysisStatus::Requested => "requested",
            AnalysisStatus::Triggered => "triggered",
            AnalysisStatus::Started => "started",
            AnalysisStatus::Finished => "finished",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Success => "success",
            AnalysisStatus::Failed => "failed",
            AnalysisStatus::Other(s) => s,
        }
    }

    /// No further transition is expected once one of these is observed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnalysisStatus::Success | AnalysisStatus::Completed | AnalysisStatus::Failed
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AnalysisStatus::Failed)
    }
}

impl From<String> for AnalysisStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "requested" => AnalysisStatus::Requested,
            "triggered" => AnalysisStatus::Triggered,
            "started" => AnalysisStatus::Started,
            "finished" => AnalysisStatus::Finished,
            "completed" => AnalysisStatus::Completed,
            "success" => AnalysisStatus::Success,
            "failed" => AnalysisStatus::Failed,
            _ => AnalysisStatus::Other(s),
        }
    }
}

impl From<AnalysisStatus> for String {
    fn from(status: AnalysisStatus) -> Self {
        match status {
            AnalysisStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Polled for AnalysisStatus {
    type Key = AnalysisStatus;

    fn key(&self) -> Self::Key {
        self.clone()
    }

    fn is_terminal(&self) -> bool {
        AnalysisStatus::is_terminal(self)
    }

    fn is_failure(&self) -> bool {
        AnalysisStatus::is_failure(self)
    }
}

/// An analysis run of an analyzer against a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub id: String,
    #[serde(rename = "analyzerId", default)]
    pub analyzer_id: String,
    #[serde(rename = "projectId", default)]
    pub project_id: String,
    #[serde(rename = "organizationId", default)]
    pub organization_id: String,
    pub status: AnalysisStatus,
    #[serde(default)]
    pub stage: i64,
    #[serde(default)]
    pub steps: Vec<Vec<AnalysisStep>>,
    #[serde(default)]
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_scheduled_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
}

/// Transitions are reported per status; stage changes within a status are
/// not a transition.
impl Polled for Analysis {
    type Key = AnalysisStatus;

    fn key(&self) -> Self::Key {
        self.status.clone()
    }

    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    fn progress(&self) -> Option<i64> {
        Some(self.stage)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisStep {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub status: String,
}

/// Body of `POST /org/{org}/projects/{project}/analyses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisCreateRequest {
    pub analyzer_id: String,
    pub config: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_scheduled_run: Option<String>,
    pub is_active: bool,
}

impl AnalysisCreateRequest {
    /// A one-off run of `analyzer_id` on `branch`.
    pub fn once(analyzer_id: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            analyzer_id: analyzer_id.into(),
            config: BTreeMap::new(),
            branch: branch.into(),
            tag: None,
            commit_hash: None,
            languages: Vec::new(),
            schedule_type: Some("once".to_string()),
            next_scheduled_run: None,
            is_active: true,
        }
    }
}
