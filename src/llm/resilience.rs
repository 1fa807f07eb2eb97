//! LLM resilience wrapper with retries and circuit breaking.

use super::LlmProvider;
use crate::config::LlmConfig;
use crate::{Error, Result};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Resilience configuration for LLM calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResilienceConfig {
    /// Maximum number of retries for transient failures.
    pub max_retries: u32,
    /// Backoff unit between retries in milliseconds; attempt `n` waits `n` units.
    pub retry_backoff_ms: u64,
    /// Consecutive failures before opening the circuit (0 disables the breaker).
    pub breaker_failure_threshold: u32,
    /// How long to keep the circuit open before a trial call.
    pub breaker_reset_timeout_ms: u64,
}

impl Default for LlmResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_backoff_ms: 200,
            breaker_failure_threshold: 3,
            breaker_reset_timeout_ms: 30_000,
        }
    }
}

impl LlmResilienceConfig {
    /// Takes retry and breaker settings from the LLM configuration.
    #[must_use]
    pub const fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            breaker_failure_threshold: config.breaker_failure_threshold,
            breaker_reset_timeout_ms: config.breaker_reset_ms,
        }
    }
}

/// Circuit breaker state machine.
#[derive(Debug)]
enum BreakerState {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    HalfOpen,
}

#[derive(Debug)]
struct CircuitBreaker {
    state: BreakerState,
    failure_threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    fn new(config: &LlmResilienceConfig) -> Self {
        Self {
            state: BreakerState::Closed { failures: 0 },
            failure_threshold: config.breaker_failure_threshold,
            reset_timeout: Duration::from_millis(config.breaker_reset_timeout_ms),
        }
    }

    /// Returns whether a call may proceed, moving Open to `HalfOpen` once the
    /// reset timeout has elapsed. Only one trial call runs while half-open.
    fn allow(&mut self) -> bool {
        match self.state {
            BreakerState::Closed { .. } => true,
            BreakerState::Open { opened_at } if opened_at.elapsed() >= self.reset_timeout => {
                self.state = BreakerState::HalfOpen;
                true
            },
            BreakerState::Open { .. } | BreakerState::HalfOpen => false,
        }
    }

    const fn on_success(&mut self) {
        self.state = BreakerState::Closed { failures: 0 };
    }

    const fn on_non_transient(&mut self) {
        if matches!(self.state, BreakerState::HalfOpen) {
            self.state = BreakerState::Closed { failures: 0 };
        }
    }

    /// Records a failure; returns true if this failure opened the circuit.
    fn on_failure(&mut self) -> bool {
        if self.failure_threshold == 0 {
            return false;
        }
        match self.state {
            BreakerState::Closed { ref mut failures } => {
                *failures += 1;
                if *failures >= self.failure_threshold {
                    self.state = BreakerState::Open {
                        opened_at: Instant::now(),
                    };
                    return true;
                }
            },
            BreakerState::HalfOpen => {
                self.state = BreakerState::Open {
                    opened_at: Instant::now(),
                };
                return true;
            },
            BreakerState::Open { .. } => {},
        }
        false
    }

    const fn state_value(&self) -> u8 {
        match self.state {
            BreakerState::Closed { .. } => 0,
            BreakerState::Open { .. } => 1,
            BreakerState::HalfOpen => 2,
        }
    }
}

/// LLM provider wrapper that retries transient failures and stops calling a
/// backend that keeps failing.
///
/// Only [`Error::BackendUnavailable`] is retried or counted by the breaker.
/// Configuration and local errors pass straight through.
pub struct ResilientLlmProvider<P: LlmProvider> {
    inner: P,
    config: LlmResilienceConfig,
    breaker: Mutex<CircuitBreaker>,
}

impl<P: LlmProvider> ResilientLlmProvider<P> {
    /// Creates a new resilient LLM provider wrapper.
    #[must_use]
    pub fn new(inner: P, config: LlmResilienceConfig) -> Self {
        let breaker = CircuitBreaker::new(&config);
        Self {
            inner,
            config,
            breaker: Mutex::new(breaker),
        }
    }

    /// Returns the wrapped provider.
    #[must_use]
    pub const fn inner(&self) -> &P {
        &self.inner
    }

    fn execute<T, F>(&self, operation: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let provider: &'static str = self.inner.name();
        let span = tracing::info_span!(
            "llm.request",
            provider = provider,
            operation = operation,
            status = tracing::field::Empty
        );
        let _enter = span.enter();

        let mut breaker = self.breaker.lock().unwrap_or_else(PoisonError::into_inner);
        if !breaker.allow() {
            drop(breaker);
            span.record("status", "circuit_open");
            metrics::counter!(
                "llm_requests_total",
                "provider" => provider,
                "status" => "circuit_open"
            )
            .increment(1);
            return Err(Error::unavailable(provider, "circuit breaker open"));
        }
        drop(breaker);

        let max_attempts = self.config.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let start = Instant::now();
            let result = call();
            let elapsed = start.elapsed();

            match result {
                Ok(value) => {
                    Self::record_attempt(provider, "success", elapsed);
                    self.set_breaker(CircuitBreaker::on_success);
                    span.record("status", "success");
                    return Ok(value);
                },
                Err(err) if !err.is_retryable() => {
                    Self::record_attempt(provider, "error", elapsed);
                    // Not a health signal; only releases a pending half-open trial.
                    self.set_breaker(CircuitBreaker::on_non_transient);
                    span.record("status", "error");
                    return Err(err);
                },
                Err(err) => {
                    Self::record_attempt(provider, "unavailable", elapsed);
                    let tripped = self.set_breaker(CircuitBreaker::on_failure);
                    if tripped {
                        metrics::counter!("llm_circuit_breaker_trips_total", "provider" => provider)
                            .increment(1);
                        tracing::warn!(provider, "LLM circuit breaker opened");
                    }

                    if attempt >= max_attempts || tripped {
                        span.record("status", "unavailable");
                        return Err(err);
                    }

                    tracing::warn!(
                        provider,
                        attempt,
                        error = %err,
                        "Retrying LLM call"
                    );
                    metrics::counter!("llm_retries_total", "provider" => provider).increment(1);
                    if self.config.retry_backoff_ms > 0 {
                        std::thread::sleep(Duration::from_millis(
                            self.config.retry_backoff_ms * u64::from(attempt),
                        ));
                    }
                },
            }
        }
    }

    /// Applies a breaker transition and publishes the resulting state.
    fn set_breaker<R>(&self, transition: impl FnOnce(&mut CircuitBreaker) -> R) -> R {
        let mut breaker = self.breaker.lock().unwrap_or_else(PoisonError::into_inner);
        let out = transition(&mut breaker);
        let state = breaker.state_value();
        drop(breaker);
        metrics::gauge!("llm_circuit_breaker_state", "provider" => self.inner.name())
            .set(f64::from(state));
        out
    }

    fn record_attempt(provider: &'static str, status: &'static str, elapsed: Duration) {
        metrics::counter!(
            "llm_requests_total",
            "provider" => provider,
            "status" => status
        )
        .increment(1);
        metrics::histogram!("llm_request_duration_ms", "provider" => provider)
            .record(elapsed.as_secs_f64() * 1000.0);
    }
}

impl<P: LlmProvider> LlmProvider for ResilientLlmProvider<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        self.execute("complete", || self.inner.complete(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with the given error for the first `failures` calls.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        error: fn() -> Error,
    }

    impl Flaky {
        fn new(failures: u32, error: fn() -> Error) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                error,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl LlmProvider for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn complete(&self, _prompt: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err((self.error)())
            } else {
                Ok("ok".to_string())
            }
        }
    }

    fn unavailable() -> Error {
        Error::unavailable("flaky", "connect error")
    }

    fn misconfigured() -> Error {
        Error::configuration("flaky", "missing key")
    }

    fn config(max_retries: u32, threshold: u32) -> LlmResilienceConfig {
        LlmResilienceConfig {
            max_retries,
            retry_backoff_ms: 0,
            breaker_failure_threshold: threshold,
            breaker_reset_timeout_ms: 60_000,
        }
    }

    #[test]
    fn test_retries_transient_failures() {
        let provider = ResilientLlmProvider::new(Flaky::new(2, unavailable), config(2, 0));
        assert_eq!(provider.complete("q").unwrap(), "ok");
        assert_eq!(provider.inner().calls(), 3);
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let provider = ResilientLlmProvider::new(Flaky::new(10, unavailable), config(1, 0));
        let err = provider.complete("q").unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(provider.inner().calls(), 2);
    }

    #[test]
    fn test_configuration_error_not_retried() {
        let provider = ResilientLlmProvider::new(Flaky::new(10, misconfigured), config(3, 1));
        let err = provider.complete("q").unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(provider.inner().calls(), 1);

        // Configuration errors do not trip the breaker.
        let err = provider.complete("q").unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(provider.inner().calls(), 2);
    }

    #[test]
    fn test_breaker_opens_and_rejects() {
        let provider = ResilientLlmProvider::new(Flaky::new(10, unavailable), config(0, 2));
        assert!(provider.complete("q").is_err());
        assert!(provider.complete("q").is_err());
        assert_eq!(provider.inner().calls(), 2);

        let err = provider.complete("q").unwrap_err();
        assert!(err.to_string().contains("circuit breaker open"));
        assert_eq!(provider.inner().calls(), 2);
    }

    #[test]
    fn test_breaker_half_open_trial_closes_on_success() {
        let mut cfg = config(0, 1);
        cfg.breaker_reset_timeout_ms = 0;
        let provider = ResilientLlmProvider::new(Flaky::new(1, unavailable), cfg);

        assert!(provider.complete("q").is_err());
        // Reset timeout of zero lets the next call through as a trial.
        assert_eq!(provider.complete("q").unwrap(), "ok");
        assert_eq!(provider.complete("q").unwrap(), "ok");
        assert_eq!(provider.inner().calls(), 3);
    }

    #[test]
    fn test_config_from_llm_config() {
        let llm = LlmConfig {
            max_retries: 5,
            retry_backoff_ms: 10,
            breaker_failure_threshold: 7,
            breaker_reset_ms: 99,
            ..LlmConfig::default()
        };
        let cfg = LlmResilienceConfig::from_config(&llm);
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.breaker_failure_threshold, 7);
        assert_eq!(cfg.breaker_reset_timeout_ms, 99);
    }
}
