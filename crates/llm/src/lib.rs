//! LLM call interface for Flotilla.
//!
//! The orchestration core treats a model as a single async call:
//! `generate(messages) -> {content, role, tool_calls?, usage}`. This crate
//! defines that contract plus the decorators the core relies on:
//!
//! - [`RetryingClient`]: bounded retry with exponential or linear backoff
//! - [`RateLimitedClient`]: sliding requests-per-minute window and a bound
//!   on concurrent in-flight calls
//!
//! Provider implementations live outside this workspace; hosts wire one in
//! behind the [`LlmClient`] trait.

pub mod client;
pub mod json;
pub mod rate_limit;
pub mod retry;

pub use client::{
    ChatMessage, LlmClient, LlmRequest, LlmResponse, Role, TokenUsage, ToolCall, ToolSpec,
};
pub use json::extract_json_object;
pub use rate_limit::{RateLimitConfig, RateLimitedClient};
pub use retry::{BackoffKind, RetryConfig, RetryingClient};
