//! Manager-agent override surface.
//!
//! A [`Manager`] lets a supervising agent take over the coordinator's
//! decision points: submission decomposition, execution strategy, agent
//! selection, and result evaluation. Every method has a pass-through default
//! so implementations only override what they actually supervise.

use async_trait::async_trait;
use flotilla_common::{Agent, Task, TaskResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How the dispatch loop runs a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// Execute and wait before popping the next queue item.
    Sequential,
    /// Spawn an independent execution unit and keep popping.
    Parallel,
}

/// What a submitted task turns into.
#[derive(Debug)]
pub enum Submission {
    /// Queue the task as-is.
    Single,
    /// Fan out into subtasks; the parent is marked DELEGATED and tracked by
    /// id references only.
    Decomposed(Vec<Task>),
}

/// The closed set of fields a retry may override. Anything else about the
/// task is immutable across attempts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryOverrides {
    /// Replace the task's tool selection for the retry attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,

    /// Prefer this agent role for the retry attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// Verdict over an execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// Whether the result satisfies the task's requirements
    pub approved: bool,

    /// Demand one modified re-execution before recording the outcome
    pub requires_retry: bool,

    #[serde(default)]
    pub overrides: RetryOverrides,

    #[serde(default)]
    pub reasoning: String,
}

impl Evaluation {
    /// Default evaluation: trust the agent-reported outcome.
    pub fn pass_through(result: &TaskResult) -> Self {
        Self {
            approved: result.success,
            requires_retry: false,
            overrides: RetryOverrides::default(),
            reasoning: result
                .error
                .clone()
                .unwrap_or_else(|| "agent-reported outcome accepted".into()),
        }
    }
}

#[async_trait]
pub trait Manager: Send + Sync {
    /// Decide whether a submission needs decomposition.
    async fn analyze_submission(&self, _task: &Task) -> Submission {
        Submission::Single
    }

    /// Override the dispatch strategy. The default defers to the
    /// coordinator's concurrency-limit heuristic.
    async fn determine_strategy(&self, _task: &Task) -> Option<ExecutionStrategy> {
        None
    }

    /// Pick an agent role for the task; `None` falls back to the router.
    async fn select_agent(&self, _task: &Task, _agents: &[Arc<dyn Agent>]) -> Option<String> {
        None
    }

    /// Judge an attempt's result.
    async fn evaluate_result(&self, _task: &Task, result: &TaskResult) -> Evaluation {
        Evaluation::pass_through(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_through_mirrors_result() {
        let ok = TaskResult::ok(serde_json::Value::Null, 0.1);
        let evaluation = Evaluation::pass_through(&ok);
        assert!(evaluation.approved);
        assert!(!evaluation.requires_retry);

        let failed = TaskResult::err("nope", 0.1);
        let evaluation = Evaluation::pass_through(&failed);
        assert!(!evaluation.approved);
        assert_eq!(evaluation.reasoning, "nope");
    }

    #[test]
    fn overrides_serialize_sparsely() {
        let overrides = RetryOverrides::default();
        assert_eq!(serde_json::to_string(&overrides).unwrap(), "{}");

        let overrides = RetryOverrides {
            tools: Some(vec!["search".into()]),
            agent: None,
        };
        assert_eq!(
            serde_json::to_string(&overrides).unwrap(),
            r#"{"tools":["search"]}"#
        );
    }
}
