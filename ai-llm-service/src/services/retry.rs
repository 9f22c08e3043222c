//! Retry/backoff decorator for gateways.
//!
//! Gateways never retry by themselves. Wrapping one in [`RetryingGateway`]
//! repeats calls that failed with a retryable error
//! ([`AiLlmError::is_retryable`]) with exponential backoff. An optional
//! per-attempt deadline turns a hanging attempt into a retryable
//! [`AiLlmError::BackendTimeout`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::{
    chat::{CompletionResult, EmbeddingVector, Turn},
    error_handler::{AiLlmError, Result, env_opt_u32, env_opt_u64},
    gateway::{EmbeddingGateway, ModelGateway},
};

const MAX_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; doubled after each attempt.
    pub initial_delay: Duration,
    /// Deadline for a single attempt. `None` leaves it to the inner gateway.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(500),
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Reads `LLM_MAX_RETRIES` and `LLM_RETRY_DELAY_MS`.
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            max_retries: env_opt_u32("LLM_MAX_RETRIES")?.unwrap_or(d.max_retries),
            initial_delay: env_opt_u64("LLM_RETRY_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(d.initial_delay),
            attempt_timeout: None,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Worst-case wall time of one call when every attempt takes
    /// `per_attempt`: all attempts plus the backoff sleeps between them.
    pub fn budget(&self, per_attempt: Duration) -> Duration {
        let mut total = per_attempt;
        let mut delay = self.initial_delay;
        for _ in 0..self.max_retries {
            total += delay + per_attempt;
            delay = (delay * 2).min(MAX_DELAY);
        }
        total
    }

    async fn attempt<T, Fut>(&self, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>> + Send,
    {
        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .unwrap_or_else(|_| Err(AiLlmError::BackendTimeout(limit))),
            None => fut.await,
        }
    }

    async fn run<T, F, Fut>(&self, op_name: &'static str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        let mut attempt = 0;
        let mut delay = self.initial_delay;

        loop {
            match self.attempt(op()).await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        op = op_name,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "backend call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_DELAY);
                }
                Err(e) => {
                    if attempt > 0 {
                        error!(op = op_name, attempts = attempt + 1, error = %e, "giving up");
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Decorates a gateway with a [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryingGateway<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G> RetryingGateway<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: ModelGateway> ModelGateway for RetryingGateway<G> {
    fn model(&self) -> &str {
        ModelGateway::model(&self.inner)
    }

    async fn chat(&self, messages: &[Turn]) -> Result<CompletionResult> {
        self.policy.run("chat", || self.inner.chat(messages)).await
    }
}

#[async_trait]
impl<G: EmbeddingGateway> EmbeddingGateway for RetryingGateway<G> {
    fn model(&self) -> &str {
        EmbeddingGateway::model(&self.inner)
    }

    async fn embeddings(&self, input: &str) -> Result<EmbeddingVector> {
        self.policy
            .run("embeddings", || self.inner.embeddings(input))
            .await
    }
}
