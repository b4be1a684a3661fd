//! Memory types and configuration.

use serde::{Deserialize, Serialize};

/// One recorded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unix-millis stamp, assigned by the store
    pub timestamp: u64,

    /// Event payload
    pub data: serde_json::Value,

    /// Tags for indexed filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Relative importance; retrieval can set a floor
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    1
}

impl MemoryEntry {
    pub fn new(data: serde_json::Value) -> Self {
        Self {
            timestamp: 0,
            data,
            tags: Vec::new(),
            priority: default_priority(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }
}

/// Retrieval filter: every present field must match.
#[derive(Debug, Clone, Default)]
pub struct MemoryQuery {
    /// Key/value pairs the entry's data object must contain
    pub matches: serde_json::Map<String, serde_json::Value>,

    /// Restrict to entries carrying any of these tags
    pub tags: Vec<String>,

    /// Minimum entry priority
    pub min_priority: u8,

    /// Maximum results returned
    pub limit: usize,
}

impl MemoryQuery {
    pub fn new() -> Self {
        Self {
            limit: 10,
            ..Default::default()
        }
    }

    pub fn matching(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.matches.insert(key.into(), value);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn min_priority(mut self, priority: u8) -> Self {
        self.min_priority = priority;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Configuration for the memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum retained entries; oldest are evicted past this cap
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Default result cap when a query does not set one
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_history() -> usize {
    1000
}

fn default_max_results() -> usize {
    10
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            max_results: default_max_results(),
        }
    }
}
