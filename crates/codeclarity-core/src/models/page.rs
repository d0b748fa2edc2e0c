//! Collection and creation response shapes.
//!
//! Paginated endpoints put the pagination fields next to `data` instead of
//! inside it, so `Paginated` mirrors the whole response body, envelope
//! fields included.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub status: String,
    pub data: Vec<T>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub entry_count: u32,
    #[serde(default)]
    pub entries_per_page: u32,
    #[serde(default)]
    pub total_entries: u64,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub matching_count: u64,
}

impl<T> Paginated<T> {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn has_multiple_pages(&self) -> bool {
        self.total_pages > 1
    }

    /// One-based page summary for display, e.g. "Page 1 of 3 (total: 42)".
    pub fn page_summary(&self) -> String {
        format!(
            "Page {} of {} (total: {})",
            self.page + 1,
            self.total_pages,
            self.total_entries
        )
    }
}

/// Response of the create endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_summary_is_one_based() {
        let page: Paginated<String> = Paginated {
            status_code: 200,
            status: "ok".to_string(),
            data: vec!["a".to_string()],
            page: 0,
            entry_count: 1,
            entries_per_page: 20,
            total_entries: 41,
            total_pages: 3,
            matching_count: 41,
        };
        assert!(page.has_multiple_pages());
        assert_eq!(page.page_summary(), "Page 1 of 3 (total: 41)");
    }
}
