//! Step planning: decide what an agent does next for a task.
//!
//! The [`Planner`] trait is the seam between the execution loop and the
//! model. [`LlmPlanner`] drives every decision through an LLM;
//! [`DirectPlanner`] is the deterministic fallback used when no model is
//! wired in (one direct step per selected tool, then done).

use crate::config::AgentConfig;
use async_trait::async_trait;
use flotilla_common::{FlotillaError, Result, Task};
use flotilla_llm::{extract_json_object, ChatMessage, LlmClient, LlmRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Feasibility verdict for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAnalysis {
    pub can_execute: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// One concrete action: which tool, with what input, and whether a model
/// round-trip mediates the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionStep {
    pub tool: String,
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default)]
    pub requires_llm: bool,
}

/// Planner output for "what next".
#[derive(Debug, Clone)]
pub enum PlanStep {
    /// The task is done; stop the loop.
    Complete,
    Act(ActionStep),
}

/// A finished step with its output, accumulated as loop context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: ActionStep,
    pub output: serde_json::Value,
}

/// Quality verdict over the accumulated steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEvaluation {
    pub success: bool,
    #[serde(default)]
    pub reasoning: String,
}

#[async_trait]
pub trait Planner: Send + Sync {
    /// Judge feasibility before any work happens.
    async fn analyze(&self, task: &Task) -> Result<TaskAnalysis>;

    /// Pick the tool subset this task will use, from `available`.
    async fn select_tools(&self, task: &Task, available: &[String]) -> Result<Vec<String>>;

    /// Decide the next step given everything completed so far.
    async fn next_step(
        &self,
        task: &Task,
        selected_tools: &[String],
        completed: &[StepRecord],
    ) -> Result<PlanStep>;

    /// Judge the final result of the step loop.
    async fn evaluate(&self, task: &Task, steps: &[StepRecord]) -> Result<StepEvaluation>;
}

/// No-model fallback: every task is feasible, task-declared tools (or all
/// available ones) are selected, and each gets exactly one direct call.
#[derive(Debug, Default)]
pub struct DirectPlanner;

#[async_trait]
impl Planner for DirectPlanner {
    async fn analyze(&self, _task: &Task) -> Result<TaskAnalysis> {
        Ok(TaskAnalysis {
            can_execute: true,
            reason: None,
        })
    }

    async fn select_tools(&self, task: &Task, available: &[String]) -> Result<Vec<String>> {
        if task.tools.is_empty() {
            return Ok(available.to_vec());
        }
        Ok(task
            .tools
            .iter()
            .filter(|t| available.contains(t))
            .cloned()
            .collect())
    }

    async fn next_step(
        &self,
        task: &Task,
        selected_tools: &[String],
        completed: &[StepRecord],
    ) -> Result<PlanStep> {
        match selected_tools.get(completed.len()) {
            Some(tool) => Ok(PlanStep::Act(ActionStep {
                tool: tool.clone(),
                input: serde_json::json!({ "task": task.render_description() }),
                requires_llm: false,
            })),
            None => Ok(PlanStep::Complete),
        }
    }

    async fn evaluate(&self, _task: &Task, _steps: &[StepRecord]) -> Result<StepEvaluation> {
        Ok(StepEvaluation {
            success: true,
            reasoning: "all planned steps executed".into(),
        })
    }
}

/// LLM-driven planner. Prompts are compact and every reply must contain a
/// JSON object (tolerantly extracted).
pub struct LlmPlanner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn LlmClient>, config: &AgentConfig) -> Self {
        let system_prompt = format!(
            "You are {role}. Goal: {goal}. {description}\n\
             Always reply with a single JSON object and nothing else.",
            role = config.role,
            goal = config.goal,
            description = config.description,
        );
        Self { llm, system_prompt }
    }

    async fn ask(&self, prompt: String, context: &str) -> Result<serde_json::Value> {
        let request = LlmRequest::from_messages(vec![ChatMessage::user(prompt)])
            .with_system_prompt(self.system_prompt.clone());
        let response = self
            .llm
            .generate(request)
            .await
            .map_err(|e| FlotillaError::Execution(format!("model call for {context} failed: {e}")))?;
        extract_json_object(&response.content)
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn analyze(&self, task: &Task) -> Result<TaskAnalysis> {
        let value = self
            .ask(
                format!(
                    "Analyze this task and decide whether you can execute it.\n\
                     Task: {}\n\
                     Reply as {{\"can_execute\": bool, \"reason\": string}}.",
                    task.render_description()
                ),
                "task analysis",
            )
            .await?;
        serde_json::from_value(value).map_err(FlotillaError::from)
    }

    async fn select_tools(&self, task: &Task, available: &[String]) -> Result<Vec<String>> {
        if available.is_empty() {
            return Ok(Vec::new());
        }
        let value = self
            .ask(
                format!(
                    "Select the tools needed for this task.\n\
                     Task: {}\nAvailable tools: {}\n\
                     Reply as {{\"tools\": [string]}}.",
                    task.render_description(),
                    available.join(", ")
                ),
                "tool selection",
            )
            .await?;

        #[derive(Deserialize)]
        struct Selection {
            #[serde(default)]
            tools: Vec<String>,
        }
        let selection: Selection = serde_json::from_value(value)?;
        // Models invent tool names; keep only real ones.
        Ok(selection
            .tools
            .into_iter()
            .filter(|t| available.contains(t))
            .collect())
    }

    async fn next_step(
        &self,
        task: &Task,
        selected_tools: &[String],
        completed: &[StepRecord],
    ) -> Result<PlanStep> {
        let value = self
            .ask(
                format!(
                    "Plan the next step for this task.\n\
                     Task: {}\nSelected tools: {}\nCompleted steps: {}\n\
                     Reply as {{\"task_complete\": true}} when done, else\n\
                     {{\"tool\": string, \"input\": object, \"requires_llm\": bool}}.",
                    task.render_description(),
                    selected_tools.join(", "),
                    serde_json::to_string(completed)?
                ),
                "step planning",
            )
            .await?;

        if value
            .get("task_complete")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
        {
            return Ok(PlanStep::Complete);
        }
        let action: ActionStep = serde_json::from_value(value)?;
        Ok(PlanStep::Act(action))
    }

    async fn evaluate(&self, task: &Task, steps: &[StepRecord]) -> Result<StepEvaluation> {
        let value = self
            .ask(
                format!(
                    "Evaluate whether the executed steps satisfy the task.\n\
                     Task: {}\nSteps: {}\n\
                     Reply as {{\"success\": bool, \"reasoning\": string}}.",
                    task.render_description(),
                    serde_json::to_string(steps)?
                ),
                "result evaluation",
            )
            .await?;
        serde_json::from_value(value).map_err(FlotillaError::from)
    }
}
