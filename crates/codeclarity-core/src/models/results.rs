//! Analysis result types: statistics and merged vulnerability records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityStats {
    #[serde(rename = "number_of_vulnerabilities", default)]
    pub total: u64,
    #[serde(rename = "number_of_critical", default)]
    pub critical: u64,
    #[serde(rename = "number_of_high", default)]
    pub high: u64,
    #[serde(rename = "number_of_medium", default)]
    pub medium: u64,
    #[serde(rename = "number_of_low", default)]
    pub low: u64,
    #[serde(rename = "number_of_none", default)]
    pub none: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbomStats {
    #[serde(rename = "number_of_dependencies", default)]
    pub total_dependencies: u64,
    #[serde(rename = "number_of_direct_dependencies", default)]
    pub direct_dependencies: u64,
    #[serde(rename = "number_of_transitive_dependencies", default)]
    pub transitive_dependencies: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_license: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_compliance: BTreeMap<String, u64>,
}

/// A vulnerability merged across the dependencies it affects.
// The results service emits PascalCase keys for this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vulnerability {
    pub id: String,
    #[serde(default)]
    pub affected: Vec<AffectedVuln>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "EPSS", default, skip_serializing_if = "Option::is_none")]
    pub epss: Option<Epss>,
}

impl Vulnerability {
    /// Name and version of the first affected dependency.
    pub fn primary_dependency(&self) -> Option<(&str, &str)> {
        self.affected
            .first()
            .map(|a| (a.affected_dependency.as_str(), a.affected_version.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AffectedVuln {
    #[serde(default)]
    pub affected_dependency: String,
    #[serde(default)]
    pub affected_version: String,
    #[serde(default)]
    pub vulnerability_id: String,
    #[serde(default)]
    pub severity: Severity,
}

/// CVSS severity information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Severity {
    #[serde(default)]
    pub severity: f64,
    #[serde(default)]
    pub severity_class: String,
    #[serde(default)]
    pub severity_type: String,
    #[serde(default)]
    pub vector: String,
}

/// Exploit Prediction Scoring System data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Epss {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub percentile: f64,
}
