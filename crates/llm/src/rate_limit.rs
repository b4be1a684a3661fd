//! Request-rate and concurrency limits for LLM calls.

use async_trait::async_trait;
use flotilla_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per sliding minute; None disables the window.
    pub max_rpm: Option<u32>,

    /// Concurrent in-flight calls allowed.
    pub max_concurrent: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_rpm: None,
            max_concurrent: 5,
        }
    }
}

use crate::client::{LlmClient, LlmRequest, LlmResponse};

/// Wraps an [`LlmClient`] with a sliding one-minute request window and a
/// bound on concurrent calls. When the window is saturated the caller waits
/// until the oldest call ages out; it never errors on saturation.
pub struct RateLimitedClient<T: LlmClient> {
    inner: T,
    config: RateLimitConfig,
    window: Mutex<VecDeque<Instant>>,
    semaphore: Semaphore,
}

impl<T: LlmClient> RateLimitedClient<T> {
    pub fn new(inner: T, config: RateLimitConfig) -> Self {
        let permits = config.max_concurrent.max(1);
        Self {
            inner,
            config,
            window: Mutex::new(VecDeque::new()),
            semaphore: Semaphore::new(permits),
        }
    }

    /// Wait until the sliding window has room, then record the call.
    async fn reserve_slot(&self) {
        let Some(max_rpm) = self.config.max_rpm else {
            return;
        };

        loop {
            let wait_for = {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                while window
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= Duration::from_secs(60))
                {
                    window.pop_front();
                }

                if (window.len() as u32) < max_rpm {
                    window.push_back(now);
                    return;
                }

                // Window full: sleep until the oldest entry ages out.
                match window.front() {
                    Some(oldest) => (*oldest + Duration::from_secs(60)).duration_since(now),
                    None => continue,
                }
            };

            debug!(wait_ms = wait_for.as_millis() as u64, "Rate limit window full, waiting");
            tokio::time::sleep(wait_for).await;
        }
    }
}

#[async_trait]
impl<T: LlmClient> LlmClient for RateLimitedClient<T> {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        self.reserve_slot().await;
        // Semaphore is never closed, so acquire cannot fail.
        let _permit = self.semaphore.acquire().await.expect("semaphore closed");
        self.inner.generate(request).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
