//! In-process event store with tag indexing.

use crate::types::{MemoryConfig, MemoryEntry, MemoryQuery};
use std::collections::{HashMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::debug;

struct Inner {
    history: VecDeque<MemoryEntry>,

    /// tag -> offsets into `history`, rebuilt on eviction/cleanup
    tag_index: HashMap<String, Vec<usize>>,
}

/// The shared memory store consulted by agents and the coordinator for
/// cross-task context. All mutation happens under a single write lock; store
/// failures at call sites must be logged, never propagated into task
/// execution.
pub struct MemoryStore {
    config: MemoryConfig,
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Inner {
                history: VecDeque::new(),
                tag_index: HashMap::new(),
            }),
        }
    }

    /// Record an event, stamping it and evicting the oldest entries past the
    /// history cap.
    pub async fn store(&self, mut entry: MemoryEntry) -> anyhow::Result<()> {
        entry.timestamp = now_millis();

        let mut inner = self.inner.write().await;
        inner.history.push_back(entry);

        let mut evicted = 0;
        while inner.history.len() > self.config.max_history {
            inner.history.pop_front();
            evicted += 1;
        }

        if evicted > 0 {
            debug!(evicted, "Evicted oldest memory entries past history cap");
            rebuild_tag_index(&mut inner);
        } else {
            let idx = inner.history.len() - 1;
            let tags = inner.history[idx].tags.clone();
            for tag in tags {
                inner.tag_index.entry(tag).or_default().push(idx);
            }
        }

        Ok(())
    }

    /// Retrieve entries matching the query, newest first.
    pub async fn retrieve(&self, query: &MemoryQuery) -> Vec<MemoryEntry> {
        let inner = self.inner.read().await;
        let limit = if query.limit > 0 {
            query.limit
        } else {
            self.config.max_results
        };

        let candidate_indices: Vec<usize> = if query.tags.is_empty() {
            (0..inner.history.len()).collect()
        } else {
            let mut indices: Vec<usize> = query
                .tags
                .iter()
                .filter_map(|tag| inner.tag_index.get(tag))
                .flatten()
                .copied()
                .collect();
            indices.sort_unstable();
            indices.dedup();
            indices
        };

        let mut matches: Vec<MemoryEntry> = candidate_indices
            .into_iter()
            .filter_map(|idx| inner.history.get(idx))
            .filter(|entry| {
                entry.priority >= query.min_priority && matches_query(&entry.data, &query.matches)
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matches.truncate(limit);
        matches
    }

    /// Entries within `[start, end]` unix millis, oldest first.
    pub async fn retrieve_by_timerange(&self, start: u64, end: Option<u64>) -> Vec<MemoryEntry> {
        let end = end.unwrap_or_else(now_millis);
        let inner = self.inner.read().await;
        inner
            .history
            .iter()
            .filter(|entry| entry.timestamp >= start && entry.timestamp <= end)
            .cloned()
            .collect()
    }

    /// Drop entries older than the given stamp and rebuild indexes.
    pub async fn cleanup(&self, older_than: u64) {
        let mut inner = self.inner.write().await;
        let before = inner.history.len();
        inner.history.retain(|entry| entry.timestamp >= older_than);
        if inner.history.len() != before {
            debug!(
                removed = before - inner.history.len(),
                "Cleaned up old memory entries"
            );
            rebuild_tag_index(&mut inner);
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.history.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn rebuild_tag_index(inner: &mut Inner) {
    inner.tag_index.clear();
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, entry) in inner.history.iter().enumerate() {
        for tag in &entry.tags {
            index.entry(tag.clone()).or_default().push(idx);
        }
    }
    inner.tag_index = index;
}

/// Subset match: every queried key must exist in `data` with an equal value.
fn matches_query(
    data: &serde_json::Value,
    matches: &serde_json::Map<String, serde_json::Value>,
) -> bool {
    matches
        .iter()
        .all(|(key, expected)| data.get(key) == Some(expected))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}
