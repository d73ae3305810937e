//! crates/study_plan_core/src/retry.rs
//!
//! A `GenerationBackend` decorator that retries rate-limited calls with
//! exponential backoff and full jitter. Other failures pass straight through.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::ports::{GenerationBackend, GenerationConfig, UpstreamError, UpstreamErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first call. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Upper bound of the sleep before retry number `retry` (0-based).
    fn ceiling(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Full jitter: a uniform draw in `[0, ceiling]`.
    fn jittered_delay(&self, retry: u32) -> Duration {
        let ceiling = self.ceiling(retry).as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling))
    }
}

pub struct RetryingBackend {
    inner: Arc<dyn GenerationBackend>,
    policy: RetryPolicy,
}

impl RetryingBackend {
    pub fn new(inner: Arc<dyn GenerationBackend>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl GenerationBackend for RetryingBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, UpstreamError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut retry = 0;
        loop {
            match self.inner.generate(prompt, config).await {
                Err(e) if e.kind == UpstreamErrorKind::RateLimited && retry + 1 < attempts => {
                    let delay = self.policy.jittered_delay(retry);
                    warn!(
                        backend = self.inner.name(),
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Generation backend rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                other => return other,
            }
        }
    }
}
