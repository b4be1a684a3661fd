//! Task lifecycle types for agent coordination.
//!
//! A [`Task`] moves forward through a fixed state machine:
//!
//! ```text
//! PENDING ──> IN_PROGRESS ──> { COMPLETED | FAILED | RETRY | CANCELLED | TIMEOUT }
//!    ▲                                        │
//!    └────────── prepare_retry ◄──────────────┘   (coordinator-driven)
//! ```
//!
//! `RETRY` is terminal in form only: the coordinator turns it back into a new
//! attempt via [`Task::prepare_retry`] while the retry budget and deadline
//! allow, and finalizes it as `FAILED` otherwise.

use crate::error::{FlotillaError, Result};
use crate::result::{ResourceSet, TaskResult};
use crate::time::{elapsed_secs, now_millis};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Priority level for tasks. Ordering matters: the queue's overflow policy
/// evicts the minimum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Current status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Delegated,
    Retry,
    Cancelled,
    Timeout,
}

impl TaskStatus {
    /// Terminal statuses produce exactly one retrievable record and never
    /// transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled | TaskStatus::Timeout
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Delegated => "delegated",
            TaskStatus::Retry => "retry",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Immutable view of dependency statuses, handed to agents so they can
/// validate a task without access to the coordinator's task map.
#[derive(Debug, Clone, Default)]
pub struct DependencySnapshot {
    statuses: HashMap<String, TaskStatus>,
}

impl DependencySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task_id: impl Into<String>, status: TaskStatus) {
        self.statuses.insert(task_id.into(), status);
    }

    pub fn status_of(&self, task_id: &str) -> Option<TaskStatus> {
        self.statuses.get(task_id).copied()
    }

    pub fn is_completed(&self, task_id: &str) -> bool {
        self.status_of(task_id) == Some(TaskStatus::Completed)
    }
}

impl FromIterator<(String, TaskStatus)> for DependencySnapshot {
    fn from_iter<I: IntoIterator<Item = (String, TaskStatus)>>(iter: I) -> Self {
        Self {
            statuses: iter.into_iter().collect(),
        }
    }
}

/// A unit of work submitted for execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID
    pub id: String,

    /// Goal description. May contain `{placeholder}` tokens resolved against
    /// `context` by [`Task::render_description`].
    pub description: String,

    /// Current status
    pub status: TaskStatus,

    /// Queue priority
    pub priority: TaskPriority,

    /// Explicit urgency flag; forces CRITICAL classification
    #[serde(default)]
    pub urgent: bool,

    /// Declared task type, matched against agent specializations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,

    /// Estimated complexity, 1..=10
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u8>,

    /// Retry budget
    pub max_retries: u32,

    /// Failed attempts so far; monotonically increasing
    pub retry_count: u32,

    /// Optional absolute deadline (unix millis); in the future at creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<u64>,

    /// Ids of tasks that must be COMPLETED before this one runs
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Capabilities an executing agent must declare
    #[serde(default)]
    pub required_capabilities: Vec<String>,

    /// Tool names this task may use
    #[serde(default)]
    pub tools: Vec<String>,

    /// Placeholder substitution values for the description
    #[serde(default)]
    pub context: HashMap<String, String>,

    /// Parent task (for decomposed subtasks)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,

    /// Subtask ids (for delegated parents)
    #[serde(default)]
    pub subtasks: Vec<String>,

    /// Creation timestamp (unix millis)
    pub created_at: u64,

    /// Set exactly once, at the PENDING -> IN_PROGRESS transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,

    /// Set exactly once, at the transition out of IN_PROGRESS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,

    /// Attached once terminal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,

    #[serde(skip)]
    resources: Arc<Mutex<ResourceSet>>,
}

impl Task {
    /// Create a plain task with default settings. Fails on an empty
    /// description.
    pub fn new(description: impl Into<String>) -> Result<Self> {
        Self::builder(description).build()
    }

    pub fn builder(description: impl Into<String>) -> TaskBuilder {
        TaskBuilder::new(description)
    }

    /// Description with `{placeholder}` tokens substituted from `context`.
    /// Unknown placeholders are left intact.
    pub fn render_description(&self) -> String {
        let mut rendered = self.description.clone();
        for (key, value) in &self.context {
            rendered = rendered.replace(&format!("{{{key}}}"), value);
        }
        rendered
    }

    /// Check the invariants an agent requires before executing: description,
    /// dependency completion, and a live deadline.
    pub fn validate(&self, deps: &DependencySnapshot) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(FlotillaError::Validation(
                "task description cannot be empty".into(),
            ));
        }
        for dep in &self.dependencies {
            match deps.status_of(dep) {
                None => {
                    return Err(FlotillaError::Validation(format!(
                        "unknown dependency task {dep}"
                    )))
                }
                Some(TaskStatus::Completed) => {}
                Some(status) => {
                    return Err(FlotillaError::Validation(format!(
                        "dependency task {dep} is {status}, not completed"
                    )))
                }
            }
        }
        if self.is_expired() {
            return Err(FlotillaError::Validation(format!(
                "task {} deadline has already passed",
                self.id
            )));
        }
        Ok(())
    }

    /// True iff a deadline exists and has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| now_millis() > d)
    }

    /// Alias for [`Task::is_expired`].
    pub fn is_overdue(&self) -> bool {
        self.is_expired()
    }

    /// Retry eligibility: budget left and deadline not passed.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries && !self.is_expired()
    }

    /// Wall-clock seconds of the last attempt, defined only once both
    /// timestamps are set.
    pub fn duration(&self) -> Option<f64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(elapsed_secs(start, end)),
            _ => None,
        }
    }

    /// PENDING -> IN_PROGRESS. Any other starting state is an error.
    pub fn mark_started(&mut self) -> Result<()> {
        if self.status != TaskStatus::Pending {
            return Err(FlotillaError::Lifecycle(format!(
                "cannot start task {} in {} status",
                self.id, self.status
            )));
        }
        self.status = TaskStatus::InProgress;
        self.started_at = Some(now_millis());
        Ok(())
    }

    /// Attach an attempt result. A failed result on a retry-eligible task
    /// transitions to RETRY and consumes one unit of budget; otherwise the
    /// task becomes COMPLETED or FAILED.
    pub fn mark_completed(&mut self, result: TaskResult) {
        if !result.success && self.can_retry() {
            self.status = TaskStatus::Retry;
            self.retry_count += 1;
        } else if result.success {
            self.status = TaskStatus::Completed;
        } else {
            self.status = TaskStatus::Failed;
        }
        self.completed_at = Some(now_millis());
        self.result = Some(result);
    }

    /// Force-transition to FAILED for non-retryable faults, synthesizing a
    /// failed result from the start timestamp.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        let completed = now_millis();
        let execution_time = self
            .started_at
            .map(|s| elapsed_secs(s, completed))
            .unwrap_or(0.0);
        self.status = TaskStatus::Failed;
        self.completed_at = Some(completed);
        self.result = Some(TaskResult::err(error, execution_time));
        self.retry_count += 1;
    }

    /// Force-transition to CANCELLED with a synthesized failed result
    /// carrying the reason.
    pub fn mark_cancelled(&mut self, reason: impl Into<String>) {
        let completed = now_millis();
        let execution_time = self
            .started_at
            .map(|s| elapsed_secs(s, completed))
            .unwrap_or(0.0);
        self.status = TaskStatus::Cancelled;
        self.completed_at = Some(completed);
        self.result = Some(TaskResult::err(
            format!("cancelled: {}", reason.into()),
            execution_time,
        ));
    }

    /// Force-transition to TIMEOUT after the per-task budget elapsed.
    pub fn mark_timed_out(&mut self, timeout_secs: f64) {
        self.status = TaskStatus::Timeout;
        self.completed_at = Some(now_millis());
        self.result = Some(TaskResult::err("task execution timed out", timeout_secs));
    }

    /// Mark a decomposed parent as DELEGATED to the given subtasks.
    pub fn mark_delegated(&mut self, subtask_ids: Vec<String>) -> Result<()> {
        if self.status != TaskStatus::Pending {
            return Err(FlotillaError::Lifecycle(format!(
                "cannot delegate task {} in {} status",
                self.id, self.status
            )));
        }
        self.status = TaskStatus::Delegated;
        self.subtasks = subtask_ids;
        Ok(())
    }

    /// Re-arm a RETRY task for a fresh attempt. Only the coordinator calls
    /// this; the per-attempt timestamps are cleared so `mark_started` and
    /// `mark_completed` stamp exactly once per attempt, while `retry_count`
    /// is preserved.
    pub fn prepare_retry(&mut self) -> Result<()> {
        if self.status != TaskStatus::Retry {
            return Err(FlotillaError::Lifecycle(format!(
                "cannot re-arm task {} in {} status",
                self.id, self.status
            )));
        }
        self.status = TaskStatus::Pending;
        self.started_at = None;
        self.completed_at = None;
        self.result = None;
        Ok(())
    }

    /// Register an open file handle for cleanup.
    pub fn register_file_handle(&self, handle: File) {
        self.resources.lock().unwrap().register_file_handle(handle);
    }

    /// Register a temp file for cleanup.
    pub fn register_temp_file(&self, path: impl Into<PathBuf>) {
        self.resources.lock().unwrap().register_temp_file(path.into());
    }

    /// Release every tracked resource, including the attached result's.
    /// Idempotent; individual failures are swallowed.
    pub fn cleanup_resources(&self) {
        self.resources.lock().unwrap().release();
        if let Some(result) = &self.result {
            result.release_resources();
        }
    }
}

/// Builder for [`Task`]; `build` is where construction-time validation
/// happens.
#[derive(Debug, Default)]
pub struct TaskBuilder {
    description: String,
    priority: TaskPriority,
    urgent: bool,
    task_type: Option<String>,
    complexity: Option<u8>,
    max_retries: u32,
    deadline: Option<u64>,
    dependencies: Vec<String>,
    required_capabilities: Vec<String>,
    tools: Vec<String>,
    context: HashMap<String, String>,
    parent_task_id: Option<String>,
    dependency_graph: HashMap<String, Vec<String>>,
}

impl TaskBuilder {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            max_retries: 3,
            ..Default::default()
        }
    }

    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn urgent(mut self, urgent: bool) -> Self {
        self.urgent = urgent;
        self
    }

    pub fn task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }

    pub fn complexity(mut self, complexity: u8) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Absolute deadline as unix millis.
    pub fn deadline_at(mut self, deadline_millis: u64) -> Self {
        self.deadline = Some(deadline_millis);
        self
    }

    /// Deadline relative to now.
    pub fn deadline_in(mut self, duration: std::time::Duration) -> Self {
        self.deadline = Some(now_millis() + duration.as_millis() as u64);
        self
    }

    pub fn dependency(mut self, task_id: impl Into<String>) -> Self {
        self.dependencies.push(task_id.into());
        self
    }

    pub fn dependencies(mut self, task_ids: impl IntoIterator<Item = String>) -> Self {
        self.dependencies.extend(task_ids);
        self
    }

    /// Known (task id -> dependency ids) edges used by cycle detection.
    /// Without it, only direct self-references are detectable.
    pub fn dependency_graph(mut self, graph: HashMap<String, Vec<String>>) -> Self {
        self.dependency_graph = graph;
        self
    }

    pub fn required_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.push(capability.into());
        self
    }

    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.push(tool.into());
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = String>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn context_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn parent_task(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_task_id = Some(parent_id.into());
        self
    }

    pub fn build(self) -> Result<Task> {
        if self.description.trim().is_empty() {
            return Err(FlotillaError::Validation(
                "task description cannot be empty".into(),
            ));
        }
        if let Some(complexity) = self.complexity {
            if !(1..=10).contains(&complexity) {
                return Err(FlotillaError::Validation(format!(
                    "complexity must be between 1 and 10, got {complexity}"
                )));
            }
        }
        if let Some(deadline) = self.deadline {
            if deadline <= now_millis() {
                return Err(FlotillaError::Validation(
                    "deadline cannot be in the past".into(),
                ));
            }
        }

        let id = format!("task_{}", uuid::Uuid::new_v4());
        detect_dependency_cycle(&id, &self.dependencies, &self.dependency_graph)?;

        Ok(Task {
            id,
            description: self.description,
            status: TaskStatus::Pending,
            priority: self.priority,
            urgent: self.urgent,
            task_type: self.task_type,
            complexity: self.complexity,
            max_retries: self.max_retries,
            retry_count: 0,
            deadline: self.deadline,
            dependencies: self.dependencies,
            required_capabilities: self.required_capabilities,
            tools: self.tools,
            context: self.context,
            parent_task_id: self.parent_task_id,
            subtasks: Vec::new(),
            created_at: now_millis(),
            started_at: None,
            completed_at: None,
            result: None,
            resources: Arc::default(),
        })
    }
}

/// Depth-first cycle detection over the new task's edges plus the supplied
/// graph. A cycle anywhere on a path reachable from the new task is a
/// construction-time failure.
fn detect_dependency_cycle(
    task_id: &str,
    dependencies: &[String],
    graph: &HashMap<String, Vec<String>>,
) -> Result<()> {
    fn visit<'a>(
        node: &'a str,
        edges: &HashMap<&'a str, &'a [String]>,
        visiting: &mut HashSet<&'a str>,
        visited: &mut HashSet<&'a str>,
    ) -> Result<()> {
        if visiting.contains(node) {
            return Err(FlotillaError::Validation(format!(
                "circular dependency detected involving task {node}"
            )));
        }
        if visited.contains(node) {
            return Ok(());
        }
        visiting.insert(node);
        if let Some(deps) = edges.get(node) {
            for dep in deps.iter() {
                visit(dep, edges, visiting, visited)?;
            }
        }
        visiting.remove(node);
        visited.insert(node);
        Ok(())
    }

    let mut edges: HashMap<&str, &[String]> = graph
        .iter()
        .map(|(id, deps)| (id.as_str(), deps.as_slice()))
        .collect();
    edges.insert(task_id, dependencies);

    let mut visiting = HashSet::new();
    let mut visited = HashSet::new();
    visit(task_id, &edges, &mut visiting, &mut visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_task_creation() {
        let task = Task::new("Summarize the quarterly report").unwrap();

        assert!(task.id.starts_with("task_"));
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.retry_count, 0);
        assert!(task.started_at.is_none());
        assert!(task.result.is_none());
        assert!(task.created_at > 0);
    }

    #[test]
    fn test_empty_description_rejected() {
        assert!(Task::new("   ").is_err());
        assert!(Task::new("").is_err());
    }

    #[test]
    fn test_complexity_bounds() {
        assert!(Task::builder("t").complexity(0).build().is_err());
        assert!(Task::builder("t").complexity(11).build().is_err());
        assert!(Task::builder("t").complexity(10).build().is_ok());
    }

    #[test]
    fn test_past_deadline_rejected() {
        let err = Task::builder("t").deadline_at(now_millis() - 1000).build();
        assert!(matches!(err, Err(FlotillaError::Validation(_))));
    }

    #[test]
    fn test_future_deadline_accepted() {
        let task = Task::builder("t")
            .deadline_in(Duration::from_secs(60))
            .build()
            .unwrap();
        assert!(!task.is_expired());
        assert!(!task.is_overdue());
    }

    #[test]
    fn test_self_dependency_cycle_rejected() {
        // A task cannot depend on a chain that leads back to itself; the
        // builder id is fresh, so express the cycle through the graph.
        let mut graph = HashMap::new();
        graph.insert("a".to_string(), vec!["b".to_string()]);
        graph.insert("b".to_string(), vec!["a".to_string()]);

        let err = Task::builder("t")
            .dependency("a")
            .dependency_graph(graph)
            .build();
        assert!(matches!(err, Err(FlotillaError::Validation(_))));
    }

    #[test]
    fn test_transitive_cycle_rejected() {
        let mut graph = HashMap::new();
        graph.insert("a".to_string(), vec!["b".to_string()]);
        graph.insert("b".to_string(), vec!["c".to_string()]);
        graph.insert("c".to_string(), vec!["a".to_string()]);

        let err = Task::builder("t")
            .dependency("a")
            .dependency_graph(graph)
            .build();
        assert!(matches!(err, Err(FlotillaError::Validation(_))));
    }

    #[test]
    fn test_acyclic_graph_accepted() {
        let mut graph = HashMap::new();
        graph.insert("a".to_string(), vec!["b".to_string(), "c".to_string()]);
        graph.insert("b".to_string(), vec!["c".to_string()]);

        let task = Task::builder("t")
            .dependency("a")
            .dependency_graph(graph)
            .build()
            .unwrap();
        assert_eq!(task.dependencies, vec!["a"]);
    }

    #[test]
    fn test_mark_started_only_from_pending() {
        let mut task = Task::new("t").unwrap();
        task.mark_started().unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.started_at.is_some());

        let err = task.mark_started();
        assert!(matches!(err, Err(FlotillaError::Lifecycle(_))));
    }

    #[test]
    fn test_successful_completion() {
        let mut task = Task::new("t").unwrap();
        task.mark_started().unwrap();
        task.mark_completed(TaskResult::ok(serde_json::json!("done"), 0.5));

        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.status.is_terminal());
        assert!(task.completed_at.is_some());
        assert!(task.duration().is_some());
    }

    #[test]
    fn test_retry_budget_exhaustion() {
        let mut task = Task::builder("flaky").max_retries(2).build().unwrap();

        // Attempt 1 and 2 fail within budget -> RETRY each time.
        for expected_count in 1..=2u32 {
            task.mark_started().unwrap();
            task.mark_completed(TaskResult::err("boom", 0.1));
            assert_eq!(task.status, TaskStatus::Retry);
            assert_eq!(task.retry_count, expected_count);
            task.prepare_retry().unwrap();
            assert_eq!(task.status, TaskStatus::Pending);
            assert!(task.started_at.is_none());
        }

        // Attempt 3: budget exhausted -> FAILED, count stays at max.
        task.mark_started().unwrap();
        task.mark_completed(TaskResult::err("boom", 0.1));
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.retry_count, 2);
        assert!(task.retry_count <= task.max_retries);
    }

    #[test]
    fn test_prepare_retry_requires_retry_status() {
        let mut task = Task::new("t").unwrap();
        assert!(matches!(
            task.prepare_retry(),
            Err(FlotillaError::Lifecycle(_))
        ));
    }

    #[test]
    fn test_mark_failed_synthesizes_result() {
        let mut task = Task::new("t").unwrap();
        task.mark_started().unwrap();
        task.mark_failed("agent disappeared");

        assert_eq!(task.status, TaskStatus::Failed);
        let result = task.result.as_ref().unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("agent disappeared"));
        assert!(result.execution_time >= 0.0);
        assert_eq!(task.retry_count, 1);
    }

    #[test]
    fn test_mark_cancelled_carries_reason() {
        let mut task = Task::new("t").unwrap();
        task.mark_cancelled("superseded by task_x");

        assert_eq!(task.status, TaskStatus::Cancelled);
        let result = task.result.as_ref().unwrap();
        assert!(result.error.as_deref().unwrap().contains("superseded"));
        assert_eq!(result.execution_time, 0.0);
    }

    #[test]
    fn test_mark_delegated_records_subtasks() {
        let mut task = Task::new("parent").unwrap();
        task.mark_delegated(vec!["task_a".into(), "task_b".into()])
            .unwrap();
        assert_eq!(task.status, TaskStatus::Delegated);
        assert_eq!(task.subtasks.len(), 2);
    }

    #[test]
    fn test_duration_undefined_until_both_stamps() {
        let mut task = Task::new("t").unwrap();
        assert!(task.duration().is_none());
        task.mark_started().unwrap();
        assert!(task.duration().is_none());
    }

    #[test]
    fn test_validate_dependencies() {
        let task = Task::builder("t").dependency("task_dep").build().unwrap();

        let mut deps = DependencySnapshot::new();
        assert!(task.validate(&deps).is_err());

        deps.insert("task_dep", TaskStatus::InProgress);
        assert!(task.validate(&deps).is_err());

        deps.insert("task_dep", TaskStatus::Completed);
        assert!(task.validate(&deps).is_ok());
    }

    #[test]
    fn test_render_description_substitutes_context() {
        let task = Task::builder("Fetch {url} and store under {name}")
            .context_value("url", "https://example.com")
            .context_value("name", "example")
            .build()
            .unwrap();

        assert_eq!(
            task.render_description(),
            "Fetch https://example.com and store under example"
        );
    }

    #[test]
    fn test_render_description_leaves_unknown_placeholders() {
        let task = Task::new("Process {input}").unwrap();
        assert_eq!(task.render_description(), "Process {input}");
    }

    #[test]
    fn test_cleanup_resources_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task-scratch.txt");
        std::fs::write(&path, b"scratch").unwrap();

        let mut task = Task::new("t").unwrap();
        task.register_temp_file(&path);
        task.mark_started().unwrap();
        task.mark_completed(TaskResult::ok(serde_json::Value::Null, 0.1));

        task.cleanup_resources();
        assert!(!path.exists());
        task.cleanup_resources();
        assert!(task.result.as_ref().unwrap().resources_released());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(TaskPriority::Critical > TaskPriority::High);
        assert!(TaskPriority::High > TaskPriority::Medium);
        assert!(TaskPriority::Medium > TaskPriority::Low);
    }

    #[test]
    fn test_status_serialization_roundtrip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Delegated,
            TaskStatus::Retry,
            TaskStatus::Cancelled,
            TaskStatus::Timeout,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            let back: TaskStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn test_task_serialization_roundtrip() {
        let task = Task::builder("Important work")
            .priority(TaskPriority::High)
            .complexity(7)
            .tool("search".to_string())
            .build()
            .unwrap();

        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, task.id);
        assert_eq!(back.priority, TaskPriority::High);
        assert_eq!(back.complexity, Some(7));
        assert_eq!(back.created_at, task.created_at);
    }
}
