//! Core agent and tool traits.
//!
//! These traits are defined in `flotilla-common` so that both the coordinator
//! and agent crates can reference them without circular dependencies.

use crate::error::Result;
use crate::result::TaskResult;
use crate::task::{DependencySnapshot, Task};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Runtime status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Busy,
    Error,
    Stopped,
}

/// Point-in-time snapshot of an agent's state, consumed by the router's
/// load-penalty computation and by operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentHealth {
    pub id: String,
    pub status: AgentStatus,

    /// Tasks currently accepted by this agent
    pub active_tasks: usize,

    /// Lifetime counters
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    pub timeout_tasks: u64,

    /// Named resource locks currently held by in-flight executions
    pub held_locks: Vec<String>,
}

/// An executor that runs a plan/act/evaluate loop against a task.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Unique agent identifier.
    fn id(&self) -> &str;

    /// The agent's role, used as its registration name.
    fn role(&self) -> &str;

    /// Task types this agent is specialized for.
    fn specializations(&self) -> &[String];

    /// Transition to IDLE and begin accepting tasks.
    async fn start(&self) -> Result<()>;

    /// Transition to STOPPED; subsequent submissions are rejected.
    async fn stop(&self) -> Result<()>;

    /// Heuristic fit score in [0, 1]: baseline, specialization bonus, load
    /// penalty; a required-capability mismatch short-circuits to zero.
    fn evaluate_suitability(&self, task: &Task) -> f64;

    /// Execute one task attempt. Execution faults are absorbed into a failed
    /// [`TaskResult`]; only submission-level problems (double submission,
    /// stopped agent) surface as errors.
    async fn execute_task(&self, task: &Task, deps: &DependencySnapshot) -> Result<TaskResult>;

    /// Current health snapshot.
    async fn health(&self) -> AgentHealth;
}

/// A named capability an agent can invoke during a step. Tool access is
/// serialized per name through the agent's resource lock table.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn execute(&self, input: serde_json::Value) -> Result<serde_json::Value>;
}

/// Callback invoked by the coordinator once a task reaches a terminal record.
#[async_trait]
pub trait TaskCallback: Send + Sync {
    async fn on_complete(&self, task: &Task, result: &TaskResult);
}
