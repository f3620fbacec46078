//! Construction-time configuration.

use serde::{Deserialize, Serialize};

/// Converter configuration.
///
/// Every field has a default, so a host can pass a partial JSON object.
///
/// ```
/// use adfmark_engine::ConverterConfig;
///
/// let config: ConverterConfig = serde_json::from_str(r#"{"maxTableRows": 10}"#).unwrap();
/// assert_eq!(config.max_table_rows, 10);
/// assert_eq!(config.cache_size, 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverterConfig {
    /// Number of documents kept in the LRU cache; 0 disables caching.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    /// Table rows kept before a truncation row is emitted.
    #[serde(default = "default_max_table_rows")]
    pub max_table_rows: usize,
    /// List items kept (per list) before a truncation item is emitted.
    #[serde(default = "default_max_list_items")]
    pub max_list_items: usize,
    /// Deepest level of nested block content.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

fn default_cache_size() -> usize {
    256
}

fn default_max_table_rows() -> usize {
    100
}

fn default_max_list_items() -> usize {
    200
}

fn default_max_nesting_depth() -> usize {
    10
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
            max_table_rows: default_max_table_rows(),
            max_list_items: default_max_list_items(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

impl ConverterConfig {
    /// The truncation limits seen by the parser and converter.
    pub fn limits(&self) -> Limits {
        Limits {
            max_table_rows: self.max_table_rows,
            max_list_items: self.max_list_items,
            max_nesting_depth: self.max_nesting_depth,
        }
    }
}

/// Resource bounds applied while building a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Table rows kept before truncation.
    pub max_table_rows: usize,
    /// List items kept before truncation.
    pub max_list_items: usize,
    /// Deepest level of nested block content.
    pub max_nesting_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        ConverterConfig::default().limits()
    }
}
