//! Agent configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Role name; doubles as the agent's registration name
    pub role: String,

    /// What the agent is trying to achieve
    pub goal: String,

    /// Human-readable description, surfaced to the model and to routing
    pub description: String,

    /// Task types this agent is specialized for (routing bonus)
    #[serde(default)]
    pub specializations: Vec<String>,

    /// Capabilities this agent declares; tasks requiring others score zero
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Safety bound on planning iterations per task
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Time budget for a single step (model round-trip or tool call)
    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,

    /// Wall-clock budget for one whole execution attempt
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,

    /// Conversation history ring-buffer cap
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_max_iterations() -> usize {
    10
}

fn default_step_timeout() -> u64 {
    60
}

fn default_task_timeout() -> u64 {
    300
}

fn default_max_history() -> usize {
    100
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            role: "worker".into(),
            goal: "Execute assigned tasks".into(),
            description: "General-purpose task executor".into(),
            specializations: Vec::new(),
            capabilities: Vec::new(),
            max_iterations: default_max_iterations(),
            step_timeout_secs: default_step_timeout(),
            task_timeout_secs: default_task_timeout(),
            max_history: default_max_history(),
        }
    }
}

impl AgentConfig {
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_budgets() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.step_timeout_secs, 60);
        assert_eq!(config.task_timeout_secs, 300);
        assert_eq!(config.max_history, 100);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: AgentConfig = serde_json::from_str(
            r#"{"role": "researcher", "goal": "find things", "description": "digs"}"#,
        )
        .unwrap();
        assert_eq!(config.role, "researcher");
        assert_eq!(config.max_iterations, 10);
        assert!(config.specializations.is_empty());
    }
}
