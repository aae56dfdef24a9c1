// src/provider/retry.rs — Retry with exponential backoff for generation services
//
// Wraps any GenerationService with automatic retry on transient failures.
// Retries: rate limits (429), server errors (5xx), timeouts, connection resets.
// Does NOT retry: malformed responses, bad request (400), auth errors (401, 403).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{
    Completion, GenerationRequest, GenerationService, GroundedResponse, Reflection,
    SearchQueryList,
};
use crate::infra::errors::ResearchError;

const MAX_RETRIES: u32 = 2;
const INITIAL_DELAY_MS: u64 = 1_000;
const BACKOFF_FACTOR: f64 = 2.0;
const MAX_DELAY_MS: u64 = 30_000;
const JITTER_FRACTION: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_delay: Duration::from_millis(INITIAL_DELAY_MS),
            backoff_factor: BACKOFF_FACTOR,
            max_delay: Duration::from_millis(MAX_DELAY_MS),
            jitter_fraction: JITTER_FRACTION,
        }
    }
}

/// A service wrapper that adds retry with exponential backoff to every call shape.
pub struct RetryService {
    inner: Arc<dyn GenerationService>,
    config: RetryConfig,
}

impl RetryService {
    pub fn new(inner: Arc<dyn GenerationService>) -> Self {
        Self {
            inner,
            config: RetryConfig::default(),
        }
    }

    pub fn with_config(inner: Arc<dyn GenerationService>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Calculate the delay for a given retry attempt (0-indexed).
    fn delay_for_attempt(&self, attempt: u32, rate_limit_delay: Option<Duration>) -> Duration {
        if let Some(rl_delay) = rate_limit_delay {
            return rl_delay + Duration::from_millis(100);
        }

        let base_ms = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.config.max_delay.as_millis() as f64);

        let jitter = deterministic_jitter(attempt, self.config.jitter_fraction);
        let final_ms = (capped_ms * jitter).max(100.0);

        Duration::from_millis(final_ms as u64)
    }

    async fn with_retry<T, F, Fut>(&self, call: &'static str, mut op: F) -> Result<T, ResearchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ResearchError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !should_retry(&e) || attempt >= self.config.max_retries {
                        return Err(e);
                    }

                    let delay = self.delay_for_attempt(attempt, rate_limit_delay(&e));
                    tracing::warn!(
                        provider = self.inner.id(),
                        call,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {}",
                        e
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn should_retry(error: &ResearchError) -> bool {
    error.is_retriable()
}

fn rate_limit_delay(error: &ResearchError) -> Option<Duration> {
    match error {
        ResearchError::RateLimited { retry_after_ms, .. } if *retry_after_ms > 0 => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

/// Deterministic jitter for a given attempt to keep retries reproducible in tests.
/// Returns a multiplier in [1 - fraction, 1 + fraction].
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = (attempt.wrapping_mul(2654435761)) as f64 / u32::MAX as f64;
    1.0 + fraction * (2.0 * hash - 1.0)
}

#[async_trait]
impl GenerationService for RetryService {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn generate_queries(
        &self,
        request: &GenerationRequest,
    ) -> Result<SearchQueryList, ResearchError> {
        self.with_retry("generate_queries", || self.inner.generate_queries(request))
            .await
    }

    async fn grounded_search(
        &self,
        request: &GenerationRequest,
        result_count: u32,
    ) -> Result<GroundedResponse, ResearchError> {
        self.with_retry("grounded_search", || {
            self.inner.grounded_search(request, result_count)
        })
        .await
    }

    async fn reflect(&self, request: &GenerationRequest) -> Result<Reflection, ResearchError> {
        self.with_retry("reflect", || self.inner.reflect(request)).await
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<Completion, ResearchError> {
        self.with_retry("complete", || self.inner.complete(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_should_retry_rate_limited() {
        let err = ResearchError::RateLimited {
            provider: "test".into(),
            retry_after_ms: 5000,
        };
        assert!(should_retry(&err));
    }

    #[test]
    fn test_should_retry_retriable_provider() {
        let err = ResearchError::Provider {
            provider: "test".into(),
            message: "HTTP 500".into(),
            retriable: true,
        };
        assert!(should_retry(&err));
    }

    #[test]
    fn test_should_not_retry_malformed() {
        let err = ResearchError::MalformedResponse {
            provider: "test".into(),
            message: "not json".into(),
        };
        assert!(!should_retry(&err));
    }

    #[test]
    fn test_should_not_retry_no_provider() {
        assert!(!should_retry(&ResearchError::NoProvider));
    }

    #[test]
    fn test_rate_limit_delay_zero() {
        let err = ResearchError::RateLimited {
            provider: "test".into(),
            retry_after_ms: 0,
        };
        assert!(rate_limit_delay(&err).is_none());
    }

    #[test]
    fn test_delay_for_attempt_exponential() {
        let service = RetryService::new(Arc::new(FlakyService::new(0)));
        let d0 = service.delay_for_attempt(0, None);
        let d1 = service.delay_for_attempt(1, None);
        // d0 ≈ 1000ms, d1 ≈ 2000ms
        assert!(d0.as_millis() >= 750 && d0.as_millis() <= 1250);
        assert!(d1.as_millis() >= 1500 && d1.as_millis() <= 2500);
    }

    #[test]
    fn test_delay_uses_rate_limit_hint() {
        let service = RetryService::new(Arc::new(FlakyService::new(0)));
        let d = service.delay_for_attempt(0, Some(Duration::from_millis(10_000)));
        assert_eq!(d.as_millis(), 10_100);
    }

    #[test]
    fn test_deterministic_jitter_range() {
        for attempt in 0..20 {
            let j = deterministic_jitter(attempt, 0.2);
            assert!(
                (0.8..=1.2).contains(&j),
                "jitter {} out of range for attempt {}",
                j,
                attempt
            );
        }
    }

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let inner = Arc::new(FlakyService::new(2));
        let service = RetryService::with_config(inner.clone(), fast_config(2));
        let result = service
            .complete(&GenerationRequest::new("m", "p"))
            .await
            .unwrap();
        assert_eq!(result.text, "ok");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let inner = Arc::new(FlakyService::new(10));
        let service = RetryService::with_config(inner.clone(), fast_config(2));
        let result = service.complete(&GenerationRequest::new("m", "p")).await;
        assert!(result.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_malformed_not_retried() {
        let inner = Arc::new(FlakyService::new(0));
        let service = RetryService::with_config(inner.clone(), fast_config(5));
        let result = service.reflect(&GenerationRequest::new("m", "p")).await;
        assert!(matches!(
            result,
            Err(ResearchError::MalformedResponse { .. })
        ));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    /// Fails `failures` times with a retriable error, then succeeds.
    /// `reflect` always returns a malformed payload.
    struct FlakyService {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyService {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }

        fn attempt(&self) -> Result<(), ResearchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(ResearchError::Provider {
                    provider: "flaky".into(),
                    message: "HTTP 503".into(),
                    retriable: true,
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl GenerationService for FlakyService {
        fn id(&self) -> &str {
            "flaky"
        }
        async fn generate_queries(
            &self,
            _req: &GenerationRequest,
        ) -> Result<SearchQueryList, ResearchError> {
            self.attempt().map(|_| SearchQueryList::default())
        }
        async fn grounded_search(
            &self,
            _req: &GenerationRequest,
            _result_count: u32,
        ) -> Result<GroundedResponse, ResearchError> {
            self.attempt().map(|_| GroundedResponse::default())
        }
        async fn reflect(&self, _req: &GenerationRequest) -> Result<Reflection, ResearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ResearchError::MalformedResponse {
                provider: "flaky".into(),
                message: "not json".into(),
            })
        }
        async fn complete(&self, _req: &GenerationRequest) -> Result<Completion, ResearchError> {
            self.attempt().map(|_| Completion {
                text: "ok".into(),
                ..Default::default()
            })
        }
    }
}
