//! Retry and timeout wrapper around any model gateway.
//!
//! Retry policy lives here, at the adapter boundary: the engine never
//! retries. Each attempt is bounded by `tokio::time::timeout`; only
//! retryable failures (rate limit, transport) get another attempt, with
//! a fixed backoff between attempts. A timeout or malformed reply fails
//! the exchange immediately.

use async_trait::async_trait;
use heliolab_core::error::GatewayError;
use heliolab_core::gateway::{GatewayReply, GatewayRequest, ModelGateway};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// A gateway that wraps another with bounded retry and per-attempt timeout.
pub struct RetryGateway {
    name: String,
    inner: Arc<dyn ModelGateway>,
    max_retries: u32,
    backoff: Duration,
    timeout: Duration,
}

impl RetryGateway {
    pub fn new(inner: Arc<dyn ModelGateway>, max_retries: u32, timeout: Duration) -> Self {
        Self {
            name: format!("retry({})", inner.name()),
            inner,
            max_retries,
            backoff: Duration::from_millis(500),
            timeout,
        }
    }

    /// Build from application configuration.
    pub fn from_config(
        inner: Arc<dyn ModelGateway>,
        config: &heliolab_config::GatewayConfig,
    ) -> Self {
        Self::new(
            inner,
            config.max_retries,
            Duration::from_secs(config.timeout_secs),
        )
        .with_backoff(Duration::from_millis(config.retry_backoff_ms))
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl ModelGateway for RetryGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: GatewayRequest) -> Result<GatewayReply, GatewayError> {
        let attempts = self.max_retries + 1;

        for attempt in 1..=attempts {
            let outcome = tokio::time::timeout(self.timeout, self.inner.complete(request.clone()))
                .await
                .unwrap_or(Err(GatewayError::Timeout {
                    elapsed_secs: self.timeout.as_secs(),
                }));

            match outcome {
                Ok(reply) => return Ok(reply),
                Err(error) if error.is_retryable() && attempt < attempts => {
                    warn!(
                        gateway = %self.inner.name(),
                        attempt,
                        total = attempts,
                        error = %error,
                        "Gateway attempt failed, retrying"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                Err(error) => return Err(error),
            }
        }

        // attempts >= 1, so the loop always returns
        unreachable!("retry loop exits by return")
    }
}
