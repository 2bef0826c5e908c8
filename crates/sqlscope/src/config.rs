// Analyzer configuration
//
// Request-independent knobs for the facade. Every field has a default, so a
// partial JSON object (or `{}`) deserializes.

use serde::{Deserialize, Serialize};
use sqlscope_analysis::TableOrder;

/// Message reported when lineage is skipped for an oversized query.
pub const QUERY_TOO_LONG: &str = "query is too long, skipping column lineage analysis";

/// Configuration for an [`crate::Analyzer`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Order of the names returned by table extraction.
    pub table_order: TableOrder,
    /// Longest SQL text (in bytes) lineage analysis will look at.
    pub max_lineage_query_length: Option<usize>,
}

impl AnalyzerConfig {
    #[must_use]
    pub fn with_table_order(mut self, order: TableOrder) -> Self {
        self.table_order = order;
        self
    }

    #[must_use]
    pub fn with_max_lineage_query_length(mut self, max: usize) -> Self {
        self.max_lineage_query_length = Some(max);
        self
    }

    /// Whether lineage should be skipped for a query of `len` bytes.
    #[must_use]
    pub fn lineage_too_long(&self, len: usize) -> bool {
        self.max_lineage_query_length.is_some_and(|max| len > max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let config: AnalyzerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AnalyzerConfig::default());
        assert_eq!(config.table_order, TableOrder::FirstSeen);
        assert!(!config.lineage_too_long(usize::MAX));
    }

    #[test]
    fn partial_object() {
        let config: AnalyzerConfig =
            serde_json::from_str(r#"{"table_order": "sorted", "max_lineage_query_length": 10}"#)
                .unwrap();
        assert_eq!(config.table_order, TableOrder::Sorted);
        assert!(config.lineage_too_long(11));
        assert!(!config.lineage_too_long(10));
    }

    #[test]
    fn builders() {
        let config = AnalyzerConfig::default()
            .with_table_order(TableOrder::Sorted)
            .with_max_lineage_query_length(5);
        assert_eq!(config.table_order, TableOrder::Sorted);
        assert_eq!(config.max_lineage_query_length, Some(5));
    }
}
