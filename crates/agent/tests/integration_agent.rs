//! Integration tests driving a TaskAgent through the LLM-backed planner
//! with a scripted model, end to end.

use async_trait::async_trait;
use flotilla_agent::{AgentConfig, LlmPlanner, TaskAgent};
use flotilla_common::{Agent, DependencySnapshot, Result, Task, Tool};
use flotilla_llm::{LlmClient, LlmRequest, LlmResponse, Role};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Replays a fixed list of model replies in order.
struct ScriptedLlm {
    replies: Vec<String>,
    cursor: AtomicUsize,
}

impl ScriptedLlm {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: replies.iter().map(|r| r.to_string()).collect(),
            cursor: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse> {
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
        let content = self
            .replies
            .get(idx)
            .cloned()
            .unwrap_or_else(|| r#"{"task_complete": true}"#.to_string());
        Ok(LlmResponse {
            content,
            role: Role::Assistant,
            tool_calls: vec![],
            model: "scripted".into(),
            usage: None,
            finish_reason: Some("stop".into()),
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

struct SearchTool;

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }
    fn description(&self) -> &str {
        "Searches a corpus"
    }
    async fn execute(&self, input: serde_json::Value) -> Result<serde_json::Value> {
        Ok(json!({ "results": ["hit-1", "hit-2"], "query": input["query"] }))
    }
}

#[tokio::test]
async fn llm_planner_drives_a_full_attempt() {
    let llm = Arc::new(ScriptedLlm::new(&[
        // analyze
        r#"{"can_execute": true, "reason": "well within scope"}"#,
        // select_tools
        r#"{"tools": ["search"]}"#,
        // next_step 1
        r#"{"tool": "search", "input": {"query": "rust orchestration"}, "requires_llm": false}"#,
        // next_step 2 -> done
        r#"{"task_complete": true}"#,
        // evaluate
        r#"{"success": true, "reasoning": "found relevant results"}"#,
    ]));

    let config = AgentConfig {
        role: "researcher".into(),
        goal: "Find information".into(),
        description: "Searches and summarizes".into(),
        ..Default::default()
    };
    let planner = Arc::new(LlmPlanner::new(llm.clone(), &config));
    let agent = TaskAgent::new(config)
        .with_planner(planner)
        .with_llm(llm)
        .with_tool(Arc::new(SearchTool));

    let task = Task::new("Research rust orchestration frameworks").unwrap();
    let result = agent
        .execute_task(&task, &DependencySnapshot::new())
        .await
        .unwrap();

    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(result.metadata["iterations"], json!(1));
    let steps = result.output.as_array().unwrap();
    assert_eq!(steps[0]["output"]["results"], json!(["hit-1", "hit-2"]));
}

#[tokio::test]
async fn fenced_model_replies_are_tolerated() {
    let llm = Arc::new(ScriptedLlm::new(&[
        "Sure! Here's my analysis:\n```json\n{\"can_execute\": true}\n```",
        "```json\n{\"tools\": [\"search\"]}\n```",
        "```json\n{\"task_complete\": true}\n```",
        "```json\n{\"success\": true, \"reasoning\": \"nothing to do\"}\n```",
    ]));

    let config = AgentConfig::with_role("tolerant");
    let planner = Arc::new(LlmPlanner::new(llm.clone(), &config));
    let agent = TaskAgent::new(config)
        .with_planner(planner)
        .with_tool(Arc::new(SearchTool));

    let task = Task::new("Trivial").unwrap();
    let result = agent
        .execute_task(&task, &DependencySnapshot::new())
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.metadata["iterations"], json!(0));
}

#[tokio::test]
async fn malformed_model_reply_fails_the_attempt_not_the_agent() {
    let llm = Arc::new(ScriptedLlm::new(&["this is not json at all"]));

    let config = AgentConfig::with_role("confused");
    let planner = Arc::new(LlmPlanner::new(llm.clone(), &config));
    let agent = TaskAgent::new(config)
        .with_planner(planner)
        .with_tool(Arc::new(SearchTool));

    let task = Task::new("Doomed").unwrap();
    let result = agent
        .execute_task(&task, &DependencySnapshot::new())
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.error.is_some());

    // The agent is reusable after the failure.
    let health = agent.health().await;
    assert_eq!(health.failed_tasks, 1);
    assert_eq!(health.active_tasks, 0);
}
