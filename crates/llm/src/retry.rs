use async_trait::async_trait;
use flotilla_common::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::{LlmClient, LlmRequest, LlmResponse};

/// Delay growth between attempts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// delay = initial * multiplier^attempt
    Exponential,
    /// delay = initial * (attempt + 1)
    Linear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff: BackoffKind,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff: BackoffKind::Exponential,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn linear(max_retries: u32, delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay_ms: delay_ms,
            backoff: BackoffKind::Linear,
            ..Default::default()
        }
    }
}

/// Wraps an [`LlmClient`] with bounded retry-with-backoff on transient
/// failures. Timeouts always count as transient.
pub struct RetryingClient<T: LlmClient> {
    inner: T,
    config: RetryConfig,
}

impl<T: LlmClient> RetryingClient<T> {
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    fn is_retryable(error: &flotilla_common::FlotillaError) -> bool {
        if error.is_timeout() {
            return true;
        }
        let lower = error.to_string().to_lowercase();
        lower.contains("429")
            || lower.contains("rate limit")
            || lower.contains("500")
            || lower.contains("502")
            || lower.contains("503")
            || lower.contains("504")
            || lower.contains("server error")
            || lower.contains("bad gateway")
            || lower.contains("service unavailable")
            || lower.contains("gateway timeout")
            || lower.contains("connection reset")
    }

    fn parse_retry_after(error_msg: &str) -> Option<u64> {
        let lower = error_msg.to_lowercase();
        let pos = lower.find("retry-after")?;
        for word in error_msg[pos..].split_whitespace().skip(1) {
            let cleaned = word.trim_end_matches(|c: char| !c.is_ascii_digit());
            if let Ok(secs) = cleaned.parse::<u64>() {
                return Some(secs * 1000);
            }
        }
        None
    }

    fn compute_delay(&self, attempt: u32) -> u64 {
        let base = match self.config.backoff {
            BackoffKind::Exponential => {
                self.config.initial_delay_ms as f64
                    * self.config.backoff_multiplier.powi(attempt as i32)
            }
            BackoffKind::Linear => self.config.initial_delay_ms as f64 * (attempt + 1) as f64,
        };
        let jitter = (base * 0.1 * deterministic_jitter(attempt)) as u64;
        (base as u64).saturating_add(jitter).min(self.config.max_delay_ms)
    }
}

/// Attempt-keyed pseudo-random jitter; keeps the crate free of a rand
/// dependency while still spreading synchronized retries.
fn deterministic_jitter(attempt: u32) -> f64 {
    let x = attempt.wrapping_mul(2654435761);
    (x % 100) as f64 / 100.0
}

#[async_trait]
impl<T: LlmClient> LlmClient for RetryingClient<T> {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.inner.generate(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempt == self.config.max_retries || !Self::is_retryable(&e) {
                        return Err(e);
                    }

                    let delay = Self::parse_retry_after(&e.to_string())
                        .unwrap_or_else(|| self.compute_delay(attempt));

                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay,
                        error = %e,
                        "Retrying LLM request"
                    );

                    tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap())
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Role;
    use flotilla_common::FlotillaError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn default_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay_ms, 500);
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn retryable_error_detection() {
        assert!(RetryingClient::<FlakyClient>::is_retryable(
            &FlotillaError::Execution("API error 429 Too Many Requests: rate limit".into())
        ));
        assert!(RetryingClient::<FlakyClient>::is_retryable(
            &FlotillaError::Execution("502 bad gateway".into())
        ));
        assert!(RetryingClient::<FlakyClient>::is_retryable(
            &FlotillaError::Timeout("request deadline exceeded".into())
        ));
        assert!(!RetryingClient::<FlakyClient>::is_retryable(
            &FlotillaError::Execution("API error 401 Unauthorized".into())
        ));
    }

    #[test]
    fn parse_retry_after_from_error() {
        let delay =
            RetryingClient::<FlakyClient>::parse_retry_after("429 Too Many, Retry-After: 5");
        assert_eq!(delay, Some(5000));
    }

    #[test]
    fn compute_delay_respects_max() {
        let client = RetryingClient {
            inner: FlakyClient::new(0),
            config: RetryConfig {
                max_retries: 5,
                initial_delay_ms: 500,
                max_delay_ms: 2000,
                backoff: BackoffKind::Exponential,
                backoff_multiplier: 10.0,
            },
        };
        assert!(client.compute_delay(5) <= 2000);
    }

    #[test]
    fn linear_backoff_grows_linearly() {
        let client = RetryingClient {
            inner: FlakyClient::new(0),
            config: RetryConfig::linear(3, 100),
        };
        // Jitter adds at most 10%, so consecutive delays stay ordered.
        assert!(client.compute_delay(0) < client.compute_delay(1));
        assert!(client.compute_delay(1) < client.compute_delay(2));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let client = RetryingClient::new(
            FlakyClient {
                failures: 2,
                calls: calls.clone(),
            },
            RetryConfig::default(),
        );

        let response = client
            .generate(LlmRequest::default())
            .await
            .expect("third attempt succeeds");
        assert_eq!(response.content, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let client = RetryingClient::new(
            FlakyClient {
                failures: u32::MAX,
                calls: calls.clone(),
            },
            RetryConfig {
                max_retries: 2,
                ..Default::default()
            },
        );

        let err = client.generate(LlmRequest::default()).await.unwrap_err();
        assert!(err.to_string().contains("503"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    struct FlakyClient {
        failures: u32,
        calls: Arc<AtomicU32>,
    }

    impl FlakyClient {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    #[async_trait]
    impl LlmClient for FlakyClient {
        async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(FlotillaError::Execution("503 Service Unavailable".into()));
            }
            Ok(LlmResponse {
                content: "ok".into(),
                role: Role::Assistant,
                tool_calls: vec![],
                model: "flaky".into(),
                usage: None,
                finish_reason: Some("stop".into()),
            })
        }
        fn model_name(&self) -> &str {
            "flaky"
        }
    }
}
