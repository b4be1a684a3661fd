//! Task-executing agents for Flotilla.
//!
//! An agent wraps an LLM call loop: given a task it analyzes feasibility,
//! selects tools, acquires named resource locks in a deterministic order,
//! iterates plan/act steps under per-step and per-task time budgets, and
//! evaluates the outcome. Every execution fault is absorbed into a failed
//! [`flotilla_common::TaskResult`] so the coordinator never sees a panic or a
//! stray error from inside an attempt.
//!
//! The moving parts:
//!
//! - [`TaskAgent`]: the execution loop ([`flotilla_common::Agent`] impl)
//! - [`Planner`]: the decision seam ([`LlmPlanner`] or [`DirectPlanner`])
//! - [`ResourceLockTable`]: shared named locks with ordered acquisition
//! - [`AgentTypeRegistry`]: explicit type-name -> constructor mapping

pub mod config;
pub mod executor;
pub mod locks;
pub mod planner;
pub mod registry;

pub use config::AgentConfig;
pub use executor::TaskAgent;
pub use locks::{LockEvent, LockSet, ResourceLockTable};
pub use planner::{
    ActionStep, DirectPlanner, LlmPlanner, PlanStep, Planner, StepEvaluation, StepRecord,
    TaskAnalysis,
};
pub use registry::{AgentConstructor, AgentTypeRegistry};
