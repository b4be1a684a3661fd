//! The coordinator: task intake, dispatch, retry, and cleanup.
//!
//! One dispatch loop pops the queue in FIFO order and executes tasks either
//! sequentially or as spawned execution units bounded by the concurrency
//! limit. A second loop periodically purges terminal results past the
//! retention window. Both loops are owned by the coordinator and cancelled
//! through one token; shutdown awaits every cancellation.

use crate::config::CoordinatorConfig;
use crate::manager::{ExecutionStrategy, Manager, Submission};
use crate::queue::{Admission, QueueEntry, TaskQueue};
use crate::router::TaskRouter;
use flotilla_common::time::now_millis;
use flotilla_common::{
    Agent, DependencySnapshot, FlotillaError, Result, Task, TaskCallback, TaskResult, TaskStatus,
};
use flotilla_memory::{MemoryEntry, MemoryStore};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Point-in-time coordinator metrics.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorMetrics {
    pub processed_tasks: u64,
    pub successful_tasks: u64,
    pub failed_tasks: u64,
    pub timeout_tasks: u64,
    pub evicted_tasks: u64,
    pub retried_tasks: u64,
    pub queue_size: usize,
    pub running_tasks: usize,
    pub completed_records: usize,
    pub failed_records: usize,
    pub active_agents: usize,
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    timeouts: AtomicU64,
    evicted: AtomicU64,
    retried: AtomicU64,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    agents: Vec<Arc<dyn Agent>>,
    router: TaskRouter,
    manager: Option<Arc<dyn Manager>>,
    memory: Option<Arc<MemoryStore>>,
    callback: Option<Arc<dyn TaskCallback>>,

    tasks: RwLock<HashMap<String, Task>>,
    queue: TaskQueue,
    running: AsyncMutex<HashMap<String, JoinHandle<()>>>,
    completed: RwLock<HashMap<String, TaskResult>>,
    failed: RwLock<HashMap<String, TaskResult>>,
    /// Per-task execution locks; stale entries are purged by cleanup
    task_locks: AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,

    counters: Counters,
    cancel: CancellationToken,
    started: AtomicBool,
    shutting_down: AtomicBool,
    dispatch_handle: StdMutex<Option<JoinHandle<()>>>,
    cleanup_handle: StdMutex<Option<JoinHandle<()>>>,
}

/// Builder for [`Coordinator`]. At least one agent is required.
pub struct CoordinatorBuilder {
    config: CoordinatorConfig,
    agents: Vec<Arc<dyn Agent>>,
    router: TaskRouter,
    manager: Option<Arc<dyn Manager>>,
    memory: Option<Arc<MemoryStore>>,
    callback: Option<Arc<dyn TaskCallback>>,
}

impl CoordinatorBuilder {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            agents: Vec::new(),
            router: TaskRouter::default(),
            manager: None,
            memory: None,
            callback: None,
        }
    }

    /// Register an agent. Registration order is the router's tie-break
    /// order.
    pub fn agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn router(mut self, router: TaskRouter) -> Self {
        self.router = router;
        self
    }

    pub fn manager(mut self, manager: Arc<dyn Manager>) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn memory(mut self, memory: Arc<MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn callback(mut self, callback: Arc<dyn TaskCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn build(self) -> Result<Coordinator> {
        if self.agents.is_empty() {
            return Err(FlotillaError::Validation(
                "at least one agent must be provided".into(),
            ));
        }
        let max_queue_size = self.config.max_queue_size;
        Ok(Coordinator {
            inner: Arc::new(CoordinatorInner {
                config: self.config,
                agents: self.agents,
                router: self.router,
                manager: self.manager,
                memory: self.memory,
                callback: self.callback,
                tasks: RwLock::new(HashMap::new()),
                queue: TaskQueue::new(max_queue_size),
                running: AsyncMutex::new(HashMap::new()),
                completed: RwLock::new(HashMap::new()),
                failed: RwLock::new(HashMap::new()),
                task_locks: AsyncMutex::new(HashMap::new()),
                counters: Counters::default(),
                cancel: CancellationToken::new(),
                started: AtomicBool::new(false),
                shutting_down: AtomicBool::new(false),
                dispatch_handle: StdMutex::new(None),
                cleanup_handle: StdMutex::new(None),
            }),
        })
    }
}

/// The orchestrator. Cheap to clone; every clone shares the same state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

impl Coordinator {
    pub fn builder(config: CoordinatorConfig) -> CoordinatorBuilder {
        CoordinatorBuilder::new(config)
    }

    /// Start all agents and spawn the dispatch and cleanup loops. Starting
    /// twice is a lifecycle error.
    pub async fn start(&self) -> Result<()> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(FlotillaError::Lifecycle(
                "coordinator is already started".into(),
            ));
        }
        info!(name = %self.inner.config.name, agents = self.inner.agents.len(), "Starting coordinator");

        for agent in &self.inner.agents {
            if let Err(e) = agent.start().await {
                error!(agent = %agent.id(), error = %e, "Failed to start agent");
            }
        }

        let dispatch = {
            let coordinator = self.clone();
            tokio::spawn(async move { coordinator.dispatch_loop().await })
        };
        *self.inner.dispatch_handle.lock().unwrap() = Some(dispatch);

        let cleanup = {
            let coordinator = self.clone();
            tokio::spawn(async move { coordinator.cleanup_loop().await })
        };
        *self.inner.cleanup_handle.lock().unwrap() = Some(cleanup);

        info!("Coordinator started");
        Ok(())
    }

    /// Submit a task. Decomposition (when a manager demands it) fans out
    /// into independently queued subtasks with the parent marked DELEGATED.
    pub async fn add_task(&self, task: Task) -> Result<String> {
        if self.inner.shutting_down.load(Ordering::SeqCst) {
            return Err(FlotillaError::Lifecycle(
                "coordinator is shutting down".into(),
            ));
        }

        let submission = match &self.inner.manager {
            Some(manager) => manager.analyze_submission(&task).await,
            None => Submission::Single,
        };

        match submission {
            Submission::Single => self.enqueue_task(task).await,
            Submission::Decomposed(subtasks) => {
                let mut parent = task;
                let subtask_ids: Vec<String> = subtasks.iter().map(|t| t.id.clone()).collect();
                info!(
                    task_id = %parent.id,
                    subtasks = subtask_ids.len(),
                    "Task decomposed into subtasks"
                );
                parent.mark_delegated(subtask_ids)?;
                let parent_id = parent.id.clone();
                self.inner
                    .tasks
                    .write()
                    .await
                    .insert(parent_id.clone(), parent);

                for mut subtask in subtasks {
                    subtask.parent_task_id = Some(parent_id.clone());
                    self.enqueue_task(subtask).await?;
                }
                Ok(parent_id)
            }
        }
    }

    async fn enqueue_task(&self, task: Task) -> Result<String> {
        let task_id = task.id.clone();
        // Classification only ever raises the queue placement; an explicit
        // priority is never demoted.
        let queue_priority = task.priority.max(TaskRouter::classify_priority(&task));

        self.inner.tasks.write().await.insert(task_id.clone(), task);

        match self.inner.queue.push(task_id.clone(), queue_priority) {
            Ok(Admission::Queued) => {}
            Ok(Admission::QueuedWithEviction(evicted)) => {
                for entry in evicted {
                    self.record_eviction(&entry).await;
                }
            }
            Err(e) => {
                self.inner.tasks.write().await.remove(&task_id);
                return Err(e);
            }
        }

        debug!(task_id = %task_id, priority = ?queue_priority, "Task queued");
        Ok(task_id)
    }

    async fn record_eviction(&self, entry: &QueueEntry) {
        self.inner.counters.evicted.fetch_add(1, Ordering::SeqCst);
        warn!(task_id = %entry.task_id, "Task evicted due to queue overflow");

        let result = {
            let mut tasks = self.inner.tasks.write().await;
            match tasks.get_mut(&entry.task_id) {
                Some(task) => {
                    task.mark_failed("removed due to queue overflow");
                    task.cleanup_resources();
                    task.result.clone()
                }
                None => Some(TaskResult::err("removed due to queue overflow", 0.0)),
            }
        };
        if let Some(result) = result {
            self.inner
                .failed
                .write()
                .await
                .insert(entry.task_id.clone(), result);
        }
    }

    /// Cancel a task that has not finished. Removing it from the known-task
    /// set makes the dispatch loop skip it if it is still queued.
    pub async fn cancel_task(&self, task_id: &str, reason: &str) -> Result<()> {
        let task = self.inner.tasks.write().await.remove(task_id);
        let Some(mut task) = task else {
            return Err(FlotillaError::Validation(format!(
                "unknown task {task_id}"
            )));
        };

        task.mark_cancelled(reason);
        task.cleanup_resources();
        if let Some(result) = task.result.clone() {
            self.inner
                .failed
                .write()
                .await
                .insert(task_id.to_string(), result);
        }
        info!(task_id = %task_id, reason = %reason, "Task cancelled");
        Ok(())
    }

    async fn dispatch_loop(self) {
        info!("Dispatch loop started");
        loop {
            let entry = tokio::select! {
                _ = self.inner.cancel.cancelled() => break,
                entry = self.inner.queue.pop() => match entry {
                    Some(entry) => entry,
                    None => break,
                },
            };

            // Cancelled before dispatch: the id is gone from the task map.
            if !self.inner.tasks.read().await.contains_key(&entry.task_id) {
                debug!(task_id = %entry.task_id, "Skipping task removed before dispatch");
                continue;
            }

            self.prune_finished().await;
            self.inner.counters.processed.fetch_add(1, Ordering::SeqCst);

            match self.strategy_for(&entry.task_id).await {
                ExecutionStrategy::Parallel => {
                    let coordinator = self.clone();
                    let task_id = entry.task_id.clone();
                    let handle =
                        tokio::spawn(
                            async move { coordinator.execute_with_timeout(&task_id).await },
                        );
                    self.inner.running.lock().await.insert(entry.task_id, handle);
                }
                ExecutionStrategy::Sequential => {
                    self.execute_with_timeout(&entry.task_id).await;
                }
            }
        }
        info!("Dispatch loop stopped");
    }

    async fn prune_finished(&self) {
        self.inner
            .running
            .lock()
            .await
            .retain(|_, handle| !handle.is_finished());
    }

    async fn strategy_for(&self, task_id: &str) -> ExecutionStrategy {
        if let Some(manager) = &self.inner.manager {
            let task = self.inner.tasks.read().await.get(task_id).cloned();
            if let Some(task) = task {
                if let Some(strategy) = manager.determine_strategy(&task).await {
                    return strategy;
                }
            }
        }

        let running = self.inner.running.lock().await.len();
        if running < self.inner.config.max_concurrent_tasks {
            ExecutionStrategy::Parallel
        } else {
            ExecutionStrategy::Sequential
        }
    }

    /// One task's full execution under the per-task time budget. Expiry
    /// cancels the in-flight attempt and records a terminal TIMEOUT result;
    /// it never takes the dispatch loop down with it.
    async fn execute_with_timeout(&self, task_id: &str) {
        let budget = Duration::from_secs(self.inner.config.task_timeout_secs);
        if timeout(budget, self.execute_task_to_completion(task_id))
            .await
            .is_ok()
        {
            return;
        }

        self.inner.counters.timeouts.fetch_add(1, Ordering::SeqCst);
        warn!(
            task_id = %task_id,
            timeout_secs = self.inner.config.task_timeout_secs,
            "Task execution timed out"
        );

        let result = {
            let mut tasks = self.inner.tasks.write().await;
            tasks.get_mut(task_id).and_then(|task| {
                task.mark_timed_out(budget.as_secs_f64());
                task.cleanup_resources();
                task.result.clone()
            })
        };
        if let Some(result) = result {
            self.inner
                .failed
                .write()
                .await
                .insert(task_id.to_string(), result);
        }
    }

    /// Route, execute, evaluate, and retry until the task reaches a terminal
    /// state. The RETRY status is re-armed here (never by the task itself)
    /// while the budget and deadline allow.
    async fn execute_task_to_completion(&self, task_id: &str) {
        let task_lock = {
            let mut locks = self.inner.task_locks.lock().await;
            locks
                .entry(task_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let _guard = task_lock.lock().await;

        loop {
            let Some((task, deps)) = self.snapshot(task_id).await else {
                return;
            };

            let Some(agent) = self.select_agent(&task).await else {
                warn!(task_id = %task_id, "No suitable agent found for task");
                self.record_routing_failure(task_id).await;
                return;
            };

            {
                let mut tasks = self.inner.tasks.write().await;
                let Some(entry) = tasks.get_mut(task_id) else {
                    return;
                };
                if let Err(e) = entry.mark_started() {
                    warn!(task_id = %task_id, error = %e, "Refusing to start task");
                    return;
                }
            }

            let mut result = match agent.execute_task(&task, &deps).await {
                Ok(result) => result,
                Err(e) => TaskResult::err(e.to_string(), 0.0),
            };

            if let Some(manager) = &self.inner.manager {
                let evaluation = manager.evaluate_result(&task, &result).await;
                if evaluation.requires_retry {
                    info!(
                        task_id = %task_id,
                        reasoning = %evaluation.reasoning,
                        "Manager demanded a modified re-execution"
                    );
                    self.inner.counters.retried.fetch_add(1, Ordering::SeqCst);
                    if let Some(retried) = self
                        .re_execute(&task, &deps, &agent, evaluation.overrides)
                        .await
                    {
                        result = retried;
                    }
                } else if !evaluation.approved && result.success {
                    result = TaskResult::err(
                        format!("rejected by manager: {}", evaluation.reasoning),
                        result.execution_time,
                    );
                }
            }

            let (retry_again, success) = {
                let mut tasks = self.inner.tasks.write().await;
                let Some(entry) = tasks.get_mut(task_id) else {
                    return;
                };
                entry.mark_completed(result.clone());
                if entry.status == TaskStatus::Retry {
                    match entry.prepare_retry() {
                        Ok(()) => (true, false),
                        Err(e) => {
                            warn!(task_id = %task_id, error = %e, "Failed to re-arm retry");
                            (false, false)
                        }
                    }
                } else {
                    entry.cleanup_resources();
                    (false, entry.status == TaskStatus::Completed)
                }
            };

            if retry_again {
                self.inner.counters.retried.fetch_add(1, Ordering::SeqCst);
                info!(task_id = %task_id, "Task attempt failed, retrying");
                continue;
            }

            if success {
                self.inner
                    .completed
                    .write()
                    .await
                    .insert(task_id.to_string(), result.clone());
                self.inner.counters.successful.fetch_add(1, Ordering::SeqCst);
            } else {
                self.inner
                    .failed
                    .write()
                    .await
                    .insert(task_id.to_string(), result.clone());
                self.inner.counters.failed.fetch_add(1, Ordering::SeqCst);
            }

            self.update_memory(&task, &result).await;
            if let Some(callback) = &self.inner.callback {
                callback.on_complete(&task, &result).await;
            }
            return;
        }
    }

    /// One modified re-execution with the closed override set applied.
    async fn re_execute(
        &self,
        task: &Task,
        deps: &DependencySnapshot,
        current: &Arc<dyn Agent>,
        overrides: crate::manager::RetryOverrides,
    ) -> Option<TaskResult> {
        let mut retry_task = task.clone();
        if let Some(tools) = overrides.tools {
            retry_task.tools = tools;
        }

        let agent = match &overrides.agent {
            Some(role) => self.agent_by_role(role)?,
            None => current.clone(),
        };

        match agent.execute_task(&retry_task, deps).await {
            Ok(result) => Some(result),
            Err(e) => Some(TaskResult::err(e.to_string(), 0.0)),
        }
    }

    async fn select_agent(&self, task: &Task) -> Option<Arc<dyn Agent>> {
        if let Some(manager) = &self.inner.manager {
            if let Some(role) = manager.select_agent(task, &self.inner.agents).await {
                if let Some(agent) = self.agent_by_role(&role) {
                    return Some(agent);
                }
                warn!(role = %role, "Manager selected an unknown agent role");
            }
        }

        let agent_id = self
            .inner
            .router
            .route_task(task, &self.inner.agents)
            .await?;
        self.agent_by_id(&agent_id)
    }

    async fn record_routing_failure(&self, task_id: &str) {
        let result = {
            let mut tasks = self.inner.tasks.write().await;
            match tasks.get_mut(task_id) {
                Some(task) => {
                    task.mark_failed("no suitable agent found for task");
                    task.cleanup_resources();
                    task.result.clone()
                }
                None => None,
            }
        };
        if let Some(result) = result {
            self.inner
                .failed
                .write()
                .await
                .insert(task_id.to_string(), result);
            self.inner.counters.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn agent_by_id(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        self.inner
            .agents
            .iter()
            .find(|agent| agent.id() == agent_id)
            .cloned()
    }

    fn agent_by_role(&self, role: &str) -> Option<Arc<dyn Agent>> {
        self.inner
            .agents
            .iter()
            .find(|agent| agent.role() == role)
            .cloned()
    }

    async fn snapshot(&self, task_id: &str) -> Option<(Task, DependencySnapshot)> {
        let tasks = self.inner.tasks.read().await;
        let task = tasks.get(task_id)?.clone();
        let deps: DependencySnapshot = task
            .dependencies
            .iter()
            .filter_map(|dep| tasks.get(dep).map(|t| (dep.clone(), t.status)))
            .collect();
        Some((task, deps))
    }

    async fn update_memory(&self, task: &Task, result: &TaskResult) {
        if !self.inner.config.memory_enabled {
            return;
        }
        let Some(memory) = &self.inner.memory else {
            return;
        };

        let entry = MemoryEntry::new(json!({
            "type": "task_execution",
            "task_id": task.id,
            "description": task.description,
            "success": result.success,
            "execution_time": result.execution_time,
        }))
        .with_tags(vec!["tasks".into()]);

        // Memory trouble must never abort task handling.
        if let Err(e) = memory.store(entry).await {
            error!(task_id = %task.id, error = %e, "Failed to update memory");
        }
    }

    async fn cleanup_loop(self) {
        let interval = Duration::from_secs(self.inner.config.cleanup_interval_secs);
        info!(interval_secs = interval.as_secs(), "Cleanup loop started");
        loop {
            tokio::select! {
                _ = self.inner.cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    self.cleanup_now().await;
                }
            }
        }
        info!("Cleanup loop stopped");
    }

    /// One cleanup pass: purge terminal results past the retention window
    /// and per-task locks whose task no longer exists. Runs cooperatively;
    /// problems are logged and the next tick proceeds regardless.
    pub async fn cleanup_now(&self) {
        let cutoff = now_millis().saturating_sub(self.inner.config.task_retention_secs * 1000);
        let mut purged = 0usize;

        for map in [&self.inner.completed, &self.inner.failed] {
            let stale: Vec<TaskResult> = {
                let mut records = map.write().await;
                let ids: Vec<String> = records
                    .iter()
                    .filter(|(_, result)| result.completed_at < cutoff)
                    .map(|(id, _)| id.clone())
                    .collect();
                ids.into_iter().filter_map(|id| records.remove(&id)).collect()
            };
            purged += stale.len();
            for result in stale {
                result.release_resources();
            }
        }

        let stale_locks = {
            let tasks = self.inner.tasks.read().await;
            let mut locks = self.inner.task_locks.lock().await;
            let before = locks.len();
            locks.retain(|id, _| tasks.contains_key(id));
            before - locks.len()
        };

        debug!(purged, stale_locks, "Cleanup pass finished");
    }

    /// Stop the loops, cancel running work, and stop every agent.
    /// Idempotent; every cancellation is awaited.
    pub async fn stop(&self) -> Result<()> {
        if self.inner.shutting_down.swap(true, Ordering::SeqCst) {
            debug!("Coordinator stop called more than once");
            return Ok(());
        }
        info!(name = %self.inner.config.name, "Stopping coordinator");

        self.inner.cancel.cancel();
        self.inner.queue.close();

        let dispatch = self.inner.dispatch_handle.lock().unwrap().take();
        if let Some(handle) = dispatch {
            let _ = handle.await;
        }
        let cleanup = self.inner.cleanup_handle.lock().unwrap().take();
        if let Some(handle) = cleanup {
            let _ = handle.await;
        }

        let running: Vec<(String, JoinHandle<()>)> =
            self.inner.running.lock().await.drain().collect();
        for (task_id, handle) in running {
            handle.abort();
            match handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {
                    debug!(task_id = %task_id, "Cancelled running task")
                }
                Err(e) => {
                    error!(task_id = %task_id, error = %e, "Running task panicked during shutdown")
                }
            }
        }

        // Give every unfinished submission a terminal record.
        let orphaned: Vec<(String, TaskResult)> = {
            let mut tasks = self.inner.tasks.write().await;
            tasks
                .iter_mut()
                .filter(|(_, task)| {
                    !task.status.is_terminal() && task.status != TaskStatus::Delegated
                })
                .filter_map(|(id, task)| {
                    task.mark_cancelled("coordinator shutdown");
                    task.cleanup_resources();
                    task.result.clone().map(|result| (id.clone(), result))
                })
                .collect()
        };
        if !orphaned.is_empty() {
            let mut failed = self.inner.failed.write().await;
            for (id, result) in orphaned {
                failed.insert(id, result);
            }
        }

        for agent in &self.inner.agents {
            if let Err(e) = agent.stop().await {
                error!(agent = %agent.id(), error = %e, "Failed to stop agent");
            }
        }

        self.inner.task_locks.lock().await.clear();

        info!("Coordinator stopped");
        Ok(())
    }

    /// Terminal result for a task id, if one has been recorded.
    pub async fn get_result(&self, task_id: &str) -> Option<TaskResult> {
        if let Some(result) = self.inner.completed.read().await.get(task_id) {
            return Some(result.clone());
        }
        self.inner.failed.read().await.get(task_id).cloned()
    }

    /// Poll for a terminal result, up to `budget`.
    pub async fn wait_for_result(&self, task_id: &str, budget: Duration) -> Option<TaskResult> {
        let poll = async {
            loop {
                if let Some(result) = self.get_result(task_id).await {
                    return result;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        timeout(budget, poll).await.ok()
    }

    pub async fn get_task(&self, task_id: &str) -> Option<Task> {
        self.inner.tasks.read().await.get(task_id).cloned()
    }

    pub fn agents(&self) -> &[Arc<dyn Agent>] {
        &self.inner.agents
    }

    pub async fn metrics(&self) -> CoordinatorMetrics {
        CoordinatorMetrics {
            processed_tasks: self.inner.counters.processed.load(Ordering::SeqCst),
            successful_tasks: self.inner.counters.successful.load(Ordering::SeqCst),
            failed_tasks: self.inner.counters.failed.load(Ordering::SeqCst),
            timeout_tasks: self.inner.counters.timeouts.load(Ordering::SeqCst),
            evicted_tasks: self.inner.counters.evicted.load(Ordering::SeqCst),
            retried_tasks: self.inner.counters.retried.load(Ordering::SeqCst),
            queue_size: self.inner.queue.len(),
            running_tasks: self.inner.running.lock().await.len(),
            completed_records: self.inner.completed.read().await.len(),
            failed_records: self.inner.failed.read().await.len(),
            active_agents: self.inner.agents.len(),
        }
    }
}
