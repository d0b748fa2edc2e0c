use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An analyzer: an ordered pipeline of plugin stages run by an analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analyzer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub steps: Vec<Vec<Stage>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_config: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default)]
    pub global: bool,
}

impl Analyzer {
    /// Supported languages joined for display, or "-" when unrestricted.
    pub fn languages_display(&self) -> String {
        if self.supported_languages.is_empty() {
            "-".to_string()
        } else {
            self.supported_languages.join(", ")
        }
    }

    pub fn stage_count(&self) -> usize {
        self.steps.iter().map(Vec::len).sum()
    }
}

/// A single plugin invocation within an analyzer step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerCreateRequest {
    pub name: String,
    pub description: String,
    pub steps: Vec<Vec<Stage>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_config: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyzer_with_nested_steps() {
        let json = r#"{"id":"an-1","name":"Default","description":"JS analyzer","created_on":"2025-03-01T12:00:00Z","steps":[[{"name":"js-sbom","version":"1.0.0","config":{"project":"."}}],[{"name":"vuln-finder","version":"1.0.0"},{"name":"license-finder","version":"1.0.0"}]],"supported_languages":["javascript"],"global":true}"#;
        let analyzer: Analyzer = serde_json::from_str(json).expect("Failed to parse analyzer JSON");
        assert_eq!(analyzer.steps.len(), 2);
        assert_eq!(analyzer.stage_count(), 3);
        assert_eq!(analyzer.languages_display(), "javascript");
        assert!(analyzer.global);
        assert_eq!(
            analyzer.steps[0][0].config.get("project"),
            Some(&serde_json::json!("."))
        );
    }

    #[test]
    fn test_create_request_omits_empty_optionals() {
        let req = AnalyzerCreateRequest {
            name: "minimal".to_string(),
            description: String::new(),
            steps: vec![],
            supported_languages: vec![],
            language_config: None,
            logo: None,
        };
        let value = serde_json::to_value(&req).expect("Failed to serialize request");
        let obj = value.as_object().expect("request should serialize to an object");
        assert!(!obj.contains_key("supported_languages"));
        assert!(!obj.contains_key("logo"));
        assert!(obj.contains_key("steps"));
    }
}
