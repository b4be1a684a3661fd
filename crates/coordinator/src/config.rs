//! Configuration for the coordinator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Instance name, used in logs
    #[serde(default = "default_name")]
    pub name: String,

    /// Concurrently running executions allowed
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_tasks: usize,

    /// Per-task wall-clock budget enforced by the dispatch loop
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,

    /// Task queue capacity; arrivals beyond it go through overflow admission
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Periodic cleanup cadence
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    /// How long terminal results are retained before cleanup purges them
    #[serde(default = "default_task_retention")]
    pub task_retention_secs: u64,

    /// Record task outcomes into shared memory
    #[serde(default = "default_memory_enabled")]
    pub memory_enabled: bool,
}

fn default_name() -> String {
    "flotilla".into()
}

fn default_max_concurrent() -> usize {
    5
}

fn default_task_timeout() -> u64 {
    300
}

fn default_max_queue_size() -> usize {
    1000
}

fn default_cleanup_interval() -> u64 {
    3600
}

fn default_task_retention() -> u64 {
    86_400
}

fn default_memory_enabled() -> bool {
    true
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_concurrent_tasks: default_max_concurrent(),
            task_timeout_secs: default_task_timeout(),
            max_queue_size: default_max_queue_size(),
            cleanup_interval_secs: default_cleanup_interval(),
            task_retention_secs: default_task_retention(),
            memory_enabled: default_memory_enabled(),
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
