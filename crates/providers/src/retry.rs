//! Bounded retry with exponential backoff around a single provider.
//!
//! Transient model-service failures (network, timeout, rate limit, 5xx) are
//! retried up to `max_retries` times, waiting `base_delay * 2^attempt`
//! between attempts. Permanent failures are returned immediately.

use async_trait::async_trait;
use logdetective_config::AgentConfig;
use logdetective_core::error::ProviderError;
use logdetective_core::event::{EventBus, RunEvent};
use logdetective_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// How many times to retry and how long to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound on a single attempt
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt + 1`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }

    /// Retry settings from the `[agent]` configuration section.
    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(
            config.model_retries,
            Duration::from_millis(config.retry_base_delay_ms),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(180),
        }
    }
}

/// A provider that retries its inner provider on transient failures.
pub struct RetryingProvider {
    inner: Arc<dyn logdetective_core::Provider>,
    policy: RetryPolicy,
    events: Option<Arc<EventBus>>,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn logdetective_core::Provider>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            events: None,
        }
    }

    /// Publish a `ModelRetry` event before every retry.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }
}

#[async_trait]
impl logdetective_core::Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(
                self.policy.attempt_timeout,
                self.inner.complete(request.clone()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(format!(
                    "'{}' did not answer within {}s",
                    self.inner.name(),
                    self.policy.attempt_timeout.as_secs()
                ))),
            };

            let error = match result {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= self.policy.max_retries {
                return Err(error);
            }

            let mut delay = self.policy.delay_for(attempt);
            if let ProviderError::RateLimited { retry_after_secs } = &error {
                delay = delay.max(Duration::from_secs(*retry_after_secs));
            }
            attempt += 1;

            warn!(
                provider = %self.inner.name(),
                attempt,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Model call failed, retrying"
            );
            if let Some(events) = &self.events {
                events.publish(RunEvent::ModelRetry {
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                    error_message: error.to_string(),
                    timestamp: chrono::Utc::now(),
                });
            }

            tokio::time::sleep(delay).await;
        }
    }
}
