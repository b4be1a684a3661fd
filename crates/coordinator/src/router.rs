//! Agent routing: score candidates against a task and pick the best fit.

use flotilla_common::{Agent, AgentStatus, Task, TaskPriority};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TaskRouter {
    /// Candidates scoring below this are discarded
    pub min_score_threshold: f64,

    /// Candidates whose load penalty exceeds this are skipped outright
    pub max_load_penalty: f64,
}

impl Default for TaskRouter {
    fn default() -> Self {
        Self {
            min_score_threshold: 0.5,
            max_load_penalty: 0.5,
        }
    }
}

impl TaskRouter {
    /// Load penalty as a capped, monotonic function of queue depth.
    pub fn load_penalty(active_tasks: usize) -> f64 {
        (active_tasks as f64 * 0.1).min(0.5)
    }

    /// Pick the best-scoring agent id, or `None` when no candidate clears
    /// the threshold. Ties break stably: the first agent (registration
    /// order) with the maximum score wins, keeping routing deterministic.
    pub async fn route_task(&self, task: &Task, agents: &[Arc<dyn Agent>]) -> Option<String> {
        let mut best: Option<(f64, String)> = None;

        for agent in agents {
            let health = agent.health().await;
            if matches!(health.status, AgentStatus::Stopped | AgentStatus::Error) {
                continue;
            }
            if Self::load_penalty(health.active_tasks) > self.max_load_penalty {
                continue;
            }

            let score = agent.evaluate_suitability(task);
            if score < self.min_score_threshold {
                continue;
            }

            match &best {
                Some((best_score, _)) if score <= *best_score => {}
                _ => best = Some((score, agent.id().to_string())),
            }
        }

        if let Some((score, agent_id)) = &best {
            debug!(task_id = %task.id, agent = %agent_id, score, "Routed task");
        } else {
            debug!(task_id = %task.id, "No suitable agent for task");
        }
        best.map(|(_, agent_id)| agent_id)
    }

    /// Queue-placement priority: explicit urgency wins, then complexity and
    /// dependency-count heuristics. Never affects agent scoring.
    pub fn classify_priority(task: &Task) -> TaskPriority {
        if task.urgent {
            return TaskPriority::Critical;
        }

        let complexity = task.complexity.unwrap_or(1);
        let dependencies = task.dependencies.len();

        if complexity > 8 || dependencies > 5 {
            TaskPriority::High
        } else if complexity > 5 || dependencies > 3 {
            TaskPriority::Medium
        } else {
            TaskPriority::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flotilla_common::{AgentHealth, DependencySnapshot, Result, TaskResult};

    /// Candidate with a fixed score and load for routing tests.
    struct FixedAgent {
        id: String,
        score: f64,
        active: usize,
        status: AgentStatus,
    }

    impl FixedAgent {
        fn new(id: &str, score: f64) -> Self {
            Self {
                id: id.into(),
                score,
                active: 0,
                status: AgentStatus::Idle,
            }
        }
    }

    #[async_trait]
    impl Agent for FixedAgent {
        fn id(&self) -> &str {
            &self.id
        }
        fn role(&self) -> &str {
            &self.id
        }
        fn specializations(&self) -> &[String] {
            &[]
        }
        async fn start(&self) -> Result<()> {
            Ok(())
        }
        async fn stop(&self) -> Result<()> {
            Ok(())
        }
        fn evaluate_suitability(&self, _task: &Task) -> f64 {
            self.score
        }
        async fn execute_task(
            &self,
            _task: &Task,
            _deps: &DependencySnapshot,
        ) -> Result<TaskResult> {
            Ok(TaskResult::ok(serde_json::Value::Null, 0.0))
        }
        async fn health(&self) -> AgentHealth {
            AgentHealth {
                id: self.id.clone(),
                status: self.status,
                active_tasks: self.active,
                completed_tasks: 0,
                failed_tasks: 0,
                timeout_tasks: 0,
                held_locks: vec![],
            }
        }
    }

    fn agents(list: Vec<FixedAgent>) -> Vec<Arc<dyn Agent>> {
        list.into_iter()
            .map(|a| Arc::new(a) as Arc<dyn Agent>)
            .collect()
    }

    #[tokio::test]
    async fn highest_score_wins() {
        let router = TaskRouter::default();
        let candidates = agents(vec![
            FixedAgent::new("a", 0.6),
            FixedAgent::new("b", 0.9),
            FixedAgent::new("c", 0.7),
        ]);
        let task = Task::new("t").unwrap();
        assert_eq!(router.route_task(&task, &candidates).await.unwrap(), "b");
    }

    #[tokio::test]
    async fn tie_breaks_to_registration_order() {
        let router = TaskRouter::default();
        let candidates = agents(vec![
            FixedAgent::new("first", 0.8),
            FixedAgent::new("second", 0.8),
        ]);
        let task = Task::new("t").unwrap();
        assert_eq!(
            router.route_task(&task, &candidates).await.unwrap(),
            "first"
        );
    }

    #[tokio::test]
    async fn below_threshold_yields_none() {
        let router = TaskRouter::default();
        let candidates = agents(vec![
            FixedAgent::new("a", 0.2),
            FixedAgent::new("b", 0.4),
        ]);
        let task = Task::new("t").unwrap();
        assert!(router.route_task(&task, &candidates).await.is_none());
    }

    #[tokio::test]
    async fn overloaded_and_stopped_agents_are_skipped() {
        let router = TaskRouter::default();
        let mut overloaded = FixedAgent::new("overloaded", 0.9);
        overloaded.active = 10;
        let mut stopped = FixedAgent::new("stopped", 0.9);
        stopped.status = AgentStatus::Stopped;
        let candidates = agents(vec![overloaded, stopped, FixedAgent::new("ok", 0.6)]);

        let task = Task::new("t").unwrap();
        assert_eq!(router.route_task(&task, &candidates).await.unwrap(), "ok");
    }

    #[test]
    fn load_penalty_is_capped() {
        assert_eq!(TaskRouter::load_penalty(0), 0.0);
        assert!((TaskRouter::load_penalty(3) - 0.3).abs() < 1e-9);
        assert_eq!(TaskRouter::load_penalty(100), 0.5);
    }

    #[test]
    fn priority_classification_table() {
        let urgent = Task::builder("u").urgent(true).build().unwrap();
        assert_eq!(TaskRouter::classify_priority(&urgent), TaskPriority::Critical);

        let complex = Task::builder("c").complexity(9).build().unwrap();
        assert_eq!(TaskRouter::classify_priority(&complex), TaskPriority::High);

        let many_deps = Task::builder("d")
            .dependencies((0..6).map(|n| format!("task_{n}")))
            .build()
            .unwrap();
        assert_eq!(TaskRouter::classify_priority(&many_deps), TaskPriority::High);

        let medium = Task::builder("m").complexity(6).build().unwrap();
        assert_eq!(TaskRouter::classify_priority(&medium), TaskPriority::Medium);

        let plain = Task::new("p").unwrap();
        assert_eq!(TaskRouter::classify_priority(&plain), TaskPriority::Low);
    }
}
