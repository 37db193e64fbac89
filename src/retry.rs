// Bounded retry with exponential backoff around the supplier fetch contract

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::SupplierResult;
use crate::supplier::SupplierGateway;

// Retry configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    // Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    // A single attempt, no waiting
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

// Exponential backoff with jitter, never above `max_backoff_ms`
pub fn calculate_backoff(retry_attempt: u32, config: &RetryConfig) -> Duration {
    let base_backoff_ms = (config.initial_backoff_ms as f64
        * config.backoff_multiplier.powf(retry_attempt as f64))
    .min(config.max_backoff_ms as f64);

    // Jitter spans +/- jitter_factor/2 around the base delay
    let jitter = rand::random::<f64>() * config.jitter_factor * base_backoff_ms;
    let backoff_ms = (base_backoff_ms * (1.0 - config.jitter_factor / 2.0) + jitter)
        .min(config.max_backoff_ms as f64);

    Duration::from_millis(backoff_ms as u64)
}

// Wraps any gateway so that a failed `fetch` is retried up to
// `max_attempts` times. Probes are passed through untouched: health asks
// whether the supplier answers right now.
pub struct RetryingSupplier<S> {
    inner: S,
    config: RetryConfig,
}

impl<S: SupplierGateway> RetryingSupplier<S> {
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: SupplierGateway> SupplierGateway for RetryingSupplier<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, city: &str) -> SupplierResult {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let result = self.inner.fetch(city).await;
            attempt += 1;

            if result.succeeded {
                if attempt > 1 {
                    debug!(supplier = self.inner.name(), attempt, "Supplier fetch succeeded after retry");
                }
                return result;
            }

            if attempt >= max_attempts {
                warn!(
                    supplier = self.inner.name(),
                    attempts = attempt,
                    error = result.error_detail.as_deref().unwrap_or_default(),
                    "Supplier fetch failed, giving up"
                );
                return result;
            }

            let backoff = calculate_backoff(attempt - 1, &self.config);
            debug!(supplier = self.inner.name(), attempt, backoff_ms = backoff.as_millis() as u64, "Retrying supplier fetch");
            tokio::time::sleep(backoff).await;
        }
    }

    async fn probe(&self, city: &str) -> bool {
        self.inner.probe(city).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{seed_supplier_a, MockSupplier};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = RetryConfig {
            jitter_factor: 0.0,
            ..RetryConfig::default()
        };

        assert_eq!(calculate_backoff(0, &config), Duration::from_millis(1000));
        assert_eq!(calculate_backoff(1, &config), Duration::from_millis(2000));
        assert_eq!(calculate_backoff(2, &config), Duration::from_millis(4000));
        assert_eq!(calculate_backoff(3, &config), Duration::from_millis(8000));
        assert_eq!(calculate_backoff(4, &config), Duration::from_millis(10000));
        assert_eq!(calculate_backoff(10, &config), Duration::from_millis(10000));
    }

    #[test]
    fn test_jitter_stays_within_ceiling() {
        let config = RetryConfig::default();

        for attempt in 0..8 {
            let backoff = calculate_backoff(attempt, &config);
            assert!(backoff <= Duration::from_millis(config.max_backoff_ms));
            assert!(backoff >= Duration::from_millis(900));
        }
    }

    #[tokio::test]
    async fn test_recovers_from_transient_failures() {
        let mock = MockSupplier::new("Supplier A", seed_supplier_a());
        mock.fail_next(2);
        let supplier = RetryingSupplier::new(mock, fast_config(3));

        let result = supplier.fetch("delhi").await;

        assert!(result.succeeded);
        assert_eq!(result.offers.len(), 5);
        assert_eq!(supplier.inner().request_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mock = MockSupplier::new("Supplier A", seed_supplier_a());
        mock.set_available(false);
        let supplier = RetryingSupplier::new(mock, fast_config(3));

        let result = supplier.fetch("delhi").await;

        assert!(!result.succeeded);
        assert!(result.offers.is_empty());
        assert!(result.error_detail.is_some());
        assert_eq!(supplier.inner().request_count(), 3);
    }

    #[tokio::test]
    async fn test_success_is_not_retried() {
        let supplier = RetryingSupplier::new(
            MockSupplier::new("Supplier A", seed_supplier_a()),
            fast_config(3),
        );

        assert!(supplier.fetch("delhi").await.succeeded);
        assert_eq!(supplier.inner().request_count(), 1);
    }

    #[tokio::test]
    async fn test_probe_is_not_retried() {
        let mock = MockSupplier::new("Supplier A", seed_supplier_a());
        mock.set_available(false);
        let supplier = RetryingSupplier::new(mock, fast_config(3));

        assert!(!supplier.probe("delhi").await);
        assert_eq!(supplier.inner().request_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_calls_once() {
        let supplier = RetryingSupplier::new(
            MockSupplier::new("Supplier A", seed_supplier_a()),
            fast_config(0),
        );

        assert!(supplier.fetch("delhi").await.succeeded);
        assert_eq!(supplier.inner().request_count(), 1);
    }
}
