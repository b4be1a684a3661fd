//! The task execution loop.
//!
//! [`TaskAgent`] runs one bounded plan/act/evaluate pass per submission:
//! validate, analyze, select tools, acquire resource locks in deterministic
//! order, iterate steps, evaluate, and always come back to a clean IDLE state
//! no matter how the attempt ended.

use crate::config::AgentConfig;
use crate::locks::ResourceLockTable;
use crate::planner::{DirectPlanner, PlanStep, Planner, StepRecord};
use async_trait::async_trait;
use flotilla_common::{
    Agent, AgentHealth, AgentStatus, DependencySnapshot, FlotillaError, Result, Task, TaskResult,
    Tool,
};
use flotilla_llm::{ChatMessage, LlmClient, LlmRequest, ToolSpec};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{timeout, Duration, Instant};
use tracing::{debug, info, warn};

/// An LLM-driven task executor.
pub struct TaskAgent {
    id: String,
    config: AgentConfig,
    planner: Arc<dyn Planner>,
    llm: Option<Arc<dyn LlmClient>>,
    /// Sorted by name so tool iteration order is deterministic
    tools: BTreeMap<String, Arc<dyn Tool>>,
    locks: Arc<ResourceLockTable>,

    status: StdMutex<AgentStatus>,
    current_task: StdMutex<Option<String>>,
    /// Per-task-id locks guarding double submission; entries are removed
    /// when the attempt finishes so the map stays bounded.
    task_locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    active_count: AtomicUsize,
    history: StdMutex<VecDeque<ChatMessage>>,

    completed_count: AtomicU64,
    failed_count: AtomicU64,
    timeout_count: AtomicU64,
}

impl TaskAgent {
    /// Create an agent with its own lock table and the deterministic
    /// [`DirectPlanner`]. Use the `with_*` methods to wire in a model,
    /// planner, tools, or a shared lock table.
    pub fn new(config: AgentConfig) -> Self {
        Self {
            id: format!("agent_{}", uuid::Uuid::new_v4()),
            config,
            planner: Arc::new(DirectPlanner),
            llm: None,
            tools: BTreeMap::new(),
            locks: Arc::new(ResourceLockTable::new()),
            status: StdMutex::new(AgentStatus::Idle),
            current_task: StdMutex::new(None),
            task_locks: StdMutex::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
            history: StdMutex::new(VecDeque::new()),
            completed_count: AtomicU64::new(0),
            failed_count: AtomicU64::new(0),
            timeout_count: AtomicU64::new(0),
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    /// Share a lock table with other agents so tool access is mutually
    /// exclusive across all of them.
    pub fn with_lock_table(mut self, locks: Arc<ResourceLockTable>) -> Self {
        self.locks = locks;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn lock_table(&self) -> Arc<ResourceLockTable> {
        self.locks.clone()
    }

    fn status(&self) -> AgentStatus {
        *self.status.lock().unwrap()
    }

    fn set_status(&self, status: AgentStatus) {
        *self.status.lock().unwrap() = status;
    }

    fn task_lock_entry(&self, task_id: &str) -> Arc<AsyncMutex<()>> {
        self.task_locks
            .lock()
            .unwrap()
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Run the full attempt: validate, analyze, select tools, lock, step,
    /// evaluate. Returns `Ok` only for an attempt that passed evaluation;
    /// the caller absorbs every `Err` into a failed [`TaskResult`].
    async fn run_attempt(&self, task: &Task, deps: &DependencySnapshot) -> Result<TaskResult> {
        let started = Instant::now();

        task.validate(deps)?;

        let analysis = self.planner.analyze(task).await?;
        debug!(
            agent = %self.id,
            task_id = %task.id,
            can_execute = analysis.can_execute,
            "Task analysis completed"
        );
        if !analysis.can_execute {
            return Err(FlotillaError::Execution(format!(
                "cannot execute task: {}",
                analysis.reason.as_deref().unwrap_or("unsuitable")
            )));
        }

        let available: Vec<String> = self.tools.keys().cloned().collect();
        let selected = self.planner.select_tools(task, &available).await?;
        for name in &selected {
            if !self.tools.contains_key(name) {
                return Err(FlotillaError::Execution(format!(
                    "selected tool {name} is not available"
                )));
            }
        }
        debug!(agent = %self.id, task_id = %task.id, tools = ?selected, "Tools selected");

        // Deterministic acquisition order; released in reverse on every
        // exit path below (explicitly on success, by drop on `?`).
        let lock_set = self.locks.acquire_ordered(&self.id, &selected).await;

        let steps = self.run_steps(task, &selected).await?;
        let evaluation = self.planner.evaluate(task, &steps).await?;

        lock_set.release();

        if !evaluation.success {
            return Err(FlotillaError::Execution(format!(
                "task failed evaluation: {}",
                evaluation.reasoning
            )));
        }

        let iterations = steps.len();
        Ok(
            TaskResult::ok(serde_json::to_value(&steps)?, started.elapsed().as_secs_f64())
                .with_metadata("analysis", serde_json::to_value(&analysis)?)
                .with_metadata("tools_used", json!(selected))
                .with_metadata("evaluation", serde_json::to_value(&evaluation)?)
                .with_metadata("iterations", json!(iterations)),
        )
    }

    /// The bounded step loop. Stops when the planner signals completion or
    /// `max_iterations` is reached; reaching the bound is not an error, the
    /// partial step list stands.
    async fn run_steps(&self, task: &Task, selected: &[String]) -> Result<Vec<StepRecord>> {
        let step_budget = Duration::from_secs(self.config.step_timeout_secs);
        let mut completed: Vec<StepRecord> = Vec::new();

        for iteration in 0..self.config.max_iterations {
            let step = self.planner.next_step(task, selected, &completed).await?;
            let action = match step {
                PlanStep::Complete => break,
                PlanStep::Act(action) => action,
            };

            debug!(
                agent = %self.id,
                task_id = %task.id,
                iteration,
                tool = %action.tool,
                requires_llm = action.requires_llm,
                "Executing step"
            );

            let output = match timeout(step_budget, self.execute_step(&action)).await {
                Ok(Ok(output)) => output,
                Ok(Err(e)) if e.is_timeout() => {
                    return Err(FlotillaError::Timeout(format!(
                        "step {iteration} ({}) timed out: {e}",
                        action.tool
                    )))
                }
                Ok(Err(e)) => {
                    return Err(FlotillaError::Execution(format!(
                        "step {iteration} ({}) failed: {e}",
                        action.tool
                    )))
                }
                Err(_) => {
                    return Err(FlotillaError::Timeout(format!(
                        "step {iteration} ({}) exceeded {}s",
                        action.tool, self.config.step_timeout_secs
                    )))
                }
            };

            completed.push(StepRecord {
                step: action,
                output,
            });
        }

        Ok(completed)
    }

    /// Execute one step: either a direct tool call, or a model round-trip
    /// that decides the tool arguments first.
    async fn execute_step(
        &self,
        action: &crate::planner::ActionStep,
    ) -> Result<serde_json::Value> {
        let tool = self.tools.get(&action.tool).ok_or_else(|| {
            FlotillaError::Execution(format!("tool {} is not available", action.tool))
        })?;

        if !action.requires_llm {
            return tool.execute(action.input.clone()).await;
        }

        let llm = self.llm.as_ref().ok_or_else(|| {
            FlotillaError::Execution(format!(
                "step for tool {} requires a model but no LLM client is configured",
                action.tool
            ))
        })?;

        let user_message = ChatMessage::user(serde_json::to_string(&action.input)?);
        let request = LlmRequest::from_messages(vec![user_message.clone()])
            .with_system_prompt(format!(
                "You are {}. Goal: {}. Decide the arguments for the tool call.",
                self.config.role, self.config.goal
            ))
            .with_tools(vec![ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: json!({}),
            }]);

        let response = llm.generate(request).await?;
        self.push_history(vec![
            user_message,
            ChatMessage::assistant(response.content.clone()),
        ]);

        let arguments = response
            .tool_calls
            .first()
            .map(|call| call.arguments.clone())
            .unwrap_or_else(|| action.input.clone());
        tool.execute(arguments).await
    }

    fn push_history(&self, messages: Vec<ChatMessage>) {
        let mut history = self.history.lock().unwrap();
        history.extend(messages);
        while history.len() > self.config.max_history {
            history.pop_front();
        }
    }

    /// Current conversation history (bounded ring buffer).
    pub fn conversation_history(&self) -> Vec<ChatMessage> {
        self.history.lock().unwrap().iter().cloned().collect()
    }
}

/// Restores agent bookkeeping when an attempt finishes, including when the
/// execution future is dropped mid-flight by an outer timeout or abort.
struct ActiveTaskGuard<'a> {
    agent: &'a TaskAgent,
    task_id: String,
}

impl Drop for ActiveTaskGuard<'_> {
    fn drop(&mut self) {
        let mut current = self.agent.current_task.lock().unwrap();
        if current.as_deref() == Some(self.task_id.as_str()) {
            *current = None;
        }
        drop(current);

        self.agent.task_locks.lock().unwrap().remove(&self.task_id);

        if self.agent.active_count.fetch_sub(1, Ordering::SeqCst) == 1
            && self.agent.status() == AgentStatus::Busy
        {
            self.agent.set_status(AgentStatus::Idle);
        }
    }
}

#[async_trait]
impl Agent for TaskAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> &str {
        &self.config.role
    }

    fn specializations(&self) -> &[String] {
        &self.config.specializations
    }

    async fn start(&self) -> Result<()> {
        self.set_status(AgentStatus::Idle);
        info!(agent = %self.id, role = %self.config.role, "Agent started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.set_status(AgentStatus::Stopped);
        info!(agent = %self.id, role = %self.config.role, "Agent stopped");
        Ok(())
    }

    fn evaluate_suitability(&self, task: &Task) -> f64 {
        // Required-capability mismatch short-circuits to zero.
        for capability in &task.required_capabilities {
            if !self.config.capabilities.contains(capability) {
                return 0.0;
            }
        }

        let mut score: f64 = 0.7;

        if let Some(task_type) = &task.task_type {
            if self.config.specializations.contains(task_type) {
                score += 0.3;
            }
        }

        let load = self.active_count.load(Ordering::SeqCst) as f64;
        score -= (load * 0.1).min(0.5);

        score.clamp(0.0, 1.0)
    }

    async fn execute_task(&self, task: &Task, deps: &DependencySnapshot) -> Result<TaskResult> {
        if self.status() == AgentStatus::Stopped {
            return Err(FlotillaError::Lifecycle(format!(
                "agent {} is stopped",
                self.id
            )));
        }

        // Double-submission guard: the per-task lock is held for the whole
        // attempt and its entry deleted afterwards to bound the map.
        let task_lock = self.task_lock_entry(&task.id);
        let _task_guard = task_lock.try_lock_owned().map_err(|_| {
            FlotillaError::Lifecycle(format!(
                "task {} is already active on agent {}",
                task.id, self.id
            ))
        })?;

        self.set_status(AgentStatus::Busy);
        *self.current_task.lock().unwrap() = Some(task.id.clone());
        self.active_count.fetch_add(1, Ordering::SeqCst);
        let _cleanup = ActiveTaskGuard {
            agent: self,
            task_id: task.id.clone(),
        };

        info!(
            agent = %self.id,
            task_id = %task.id,
            timeout_secs = self.config.task_timeout_secs,
            "Executing task"
        );

        let started = Instant::now();
        let budget = Duration::from_secs(self.config.task_timeout_secs);
        let outcome = timeout(budget, self.run_attempt(task, deps)).await;
        let elapsed = started.elapsed().as_secs_f64();

        let result = match outcome {
            Ok(Ok(result)) => {
                self.completed_count.fetch_add(1, Ordering::SeqCst);
                info!(agent = %self.id, task_id = %task.id, "Task completed");
                result
            }
            Ok(Err(e)) => {
                let kind = if e.is_timeout() {
                    self.timeout_count.fetch_add(1, Ordering::SeqCst);
                    "timeout"
                } else {
                    self.failed_count.fetch_add(1, Ordering::SeqCst);
                    "execution"
                };
                warn!(agent = %self.id, task_id = %task.id, error = %e, "Task attempt failed");
                TaskResult::err(e.to_string(), elapsed).with_metadata("error_kind", json!(kind))
            }
            Err(_) => {
                self.timeout_count.fetch_add(1, Ordering::SeqCst);
                warn!(
                    agent = %self.id,
                    task_id = %task.id,
                    timeout_secs = self.config.task_timeout_secs,
                    "Task execution timed out"
                );
                TaskResult::err(
                    format!(
                        "task execution timed out after {}s",
                        self.config.task_timeout_secs
                    ),
                    elapsed,
                )
                .with_metadata("error_kind", json!("timeout"))
            }
        };

        Ok(result)
    }

    async fn health(&self) -> AgentHealth {
        AgentHealth {
            id: self.id.clone(),
            status: self.status(),
            active_tasks: self.active_count.load(Ordering::SeqCst),
            completed_tasks: self.completed_count.load(Ordering::SeqCst),
            failed_tasks: self.failed_count.load(Ordering::SeqCst),
            timeout_tasks: self.timeout_count.load(Ordering::SeqCst),
            held_locks: self.locks.held_locks_by(&self.id),
        }
    }
}
