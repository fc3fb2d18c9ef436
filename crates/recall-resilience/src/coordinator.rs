// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Recovery Coordinator.
//!
//! One coordinator is constructed per engine and shared by reference
//! (`Arc<RecoveryCoordinator>`). It owns the attempt counters for every
//! retry key, so backoff state for one memory never leaks into another.

use std::fmt;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::BoxFuture;
use recall_core::RecallError;
use tracing::{debug, info, warn};

use crate::strategy::{strategy_for, RecoveryStrategy};

/// Default maximum retries per key.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base backoff delay.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Largest exponent applied to the base delay.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Retry closure supplied by the failing operation.
pub type RetryFn<'a, T> =
    Box<dyn Fn() -> BoxFuture<'a, Result<T, RecallError>> + Send + Sync + 'a>;

/// Identifies the operation being recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryContext {
    /// Operation name, e.g. `store_memory`.
    pub operation: String,
    /// Memory the operation targets, if any.
    pub memory_id: Option<String>,
}

impl RecoveryContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            memory_id: None,
        }
    }

    pub fn for_memory(operation: impl Into<String>, memory_id: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            memory_id: Some(memory_id.into()),
        }
    }

    /// Key under which attempts are counted.
    pub fn retry_key(&self) -> String {
        match &self.memory_id {
            Some(id) => format!("{}:{id}", self.operation),
            None => self.operation.clone(),
        }
    }
}

impl fmt::Display for RecoveryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.retry_key())
    }
}

/// What the caller offers the coordinator to recover with.
pub struct RecoveryOptions<'a, T> {
    /// Value substituted when the strategy allows a fallback.
    pub fallback_value: Option<T>,
    /// Closure re-running the operation (possibly against another resource).
    pub retry_fn: Option<RetryFn<'a, T>>,
    /// Per-call override of the coordinator's `max_retries`.
    pub max_retries: Option<u32>,
}

impl<T> Default for RecoveryOptions<'_, T> {
    fn default() -> Self {
        Self {
            fallback_value: None,
            retry_fn: None,
            max_retries: None,
        }
    }
}

impl<'a, T> RecoveryOptions<'a, T> {
    pub fn with_fallback(mut self, value: T) -> Self {
        self.fallback_value = Some(value);
        self
    }

    pub fn with_retry<F>(mut self, retry: F) -> Self
    where
        F: Fn() -> BoxFuture<'a, Result<T, RecallError>> + Send + Sync + 'a,
    {
        self.retry_fn = Some(Box::new(retry));
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// Outcome of a recovery attempt.
#[derive(Debug, Clone)]
pub struct RecoveryResult<T> {
    /// Whether a usable value was produced.
    pub success: bool,
    /// The recovered value, present when `success` is true.
    pub result: Option<T>,
    /// Whether `result` is the caller's fallback rather than a retried result.
    pub fallback_used: bool,
    /// Human-readable note describing the degradation, if any.
    pub warning: Option<String>,
    /// The error that could not be recovered, present when `success` is false.
    pub error: Option<RecallError>,
    /// Retry attempts made while handling this error.
    pub attempts: u32,
}

impl<T> RecoveryResult<T> {
    fn recovered(value: T, attempts: u32) -> Self {
        Self {
            success: true,
            result: Some(value),
            fallback_used: false,
            warning: None,
            error: None,
            attempts,
        }
    }

    fn fallback(value: T, warning: String, attempts: u32) -> Self {
        Self {
            success: true,
            result: Some(value),
            fallback_used: true,
            warning: Some(warning),
            error: None,
            attempts,
        }
    }

    fn failed(error: RecallError, warning: Option<String>, attempts: u32) -> Self {
        Self {
            success: false,
            result: None,
            fallback_used: false,
            warning,
            error: Some(error),
            attempts,
        }
    }

    /// Convert into a `Result`, surfacing the unrecovered error on failure.
    pub fn into_result(self) -> Result<T, RecallError> {
        match (self.result, self.error) {
            (Some(value), _) => Ok(value),
            (None, Some(error)) => Err(error),
            (None, None) => Err(RecallError::Internal(
                "recovery produced neither a value nor an error".to_string(),
            )),
        }
    }
}

/// Dispatches errors to recovery strategies and tracks retry attempts.
pub struct RecoveryCoordinator {
    attempts: DashMap<String, u32>,
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RecoveryCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}

impl RecoveryCoordinator {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            attempts: DashMap::new(),
            max_retries,
            base_delay,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Attempts currently recorded for a retry key.
    pub fn attempts_for(&self, key: &str) -> u32 {
        self.attempts.get(key).map(|a| *a).unwrap_or(0)
    }

    /// Number of keys with outstanding retry attempts.
    pub fn pending_keys(&self) -> usize {
        self.attempts.len()
    }

    /// Delay before retry number `attempt` (zero-based): `base * 2^attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(MAX_BACKOFF_EXPONENT);
        self.base_delay.saturating_mul(factor)
    }

    /// Claim the next zero-based attempt number for `key`, or `None` once
    /// `max_retries` attempts are recorded. The read and the increment happen
    /// under one shard lock.
    fn claim_attempt(&self, key: &str, max_retries: u32) -> Option<u32> {
        let mut recorded = self.attempts.entry(key.to_string()).or_insert(0);
        if *recorded >= max_retries {
            return None;
        }
        let attempt = *recorded;
        *recorded += 1;
        Some(attempt)
    }

    /// Attempt to recover from `error` using the strategy for its variant.
    pub async fn handle<'a, T: Send + 'a>(
        &self,
        error: RecallError,
        context: &RecoveryContext,
        options: RecoveryOptions<'a, T>,
    ) -> RecoveryResult<T> {
        let strategy = strategy_for(&error);
        metrics::counter!("recall_recovery_attempts_total", "code" => error.code()).increment(1);
        debug!(
            context = %context,
            code = error.code(),
            category = %error.category(),
            ?strategy,
            "handling error"
        );

        match strategy {
            RecoveryStrategy::NonRecoverable => {
                warn!(context = %context, error = %error, "non-recoverable error");
                RecoveryResult::failed(error, None, 0)
            }
            RecoveryStrategy::SubstituteFallback => {
                self.substitute_fallback(error, context, options).await
            }
            RecoveryStrategy::RetryWithAlternative => {
                self.retry_with_alternative(error, context, options).await
            }
            RecoveryStrategy::ExponentialBackoff => {
                self.retry_with_backoff(error, context, options).await
            }
        }
    }

    async fn substitute_fallback<'a, T: Send + 'a>(
        &self,
        error: RecallError,
        context: &RecoveryContext,
        options: RecoveryOptions<'a, T>,
    ) -> RecoveryResult<T> {
        if let Some(value) = options.fallback_value {
            let warning = format!("{context}: using fallback after {error}");
            info!(context = %context, code = error.code(), "substituted fallback value");
            return RecoveryResult::fallback(value, warning, 0);
        }
        match options.retry_fn {
            Some(retry) => match retry().await {
                Ok(value) => RecoveryResult::recovered(value, 1),
                Err(retry_error) => {
                    warn!(context = %context, error = %retry_error, "retry after fallback miss failed");
                    RecoveryResult::failed(retry_error, None, 1)
                }
            },
            None => RecoveryResult::failed(
                error,
                Some(format!("{context}: no fallback value available")),
                0,
            ),
        }
    }

    async fn retry_with_alternative<'a, T: Send + 'a>(
        &self,
        error: RecallError,
        context: &RecoveryContext,
        options: RecoveryOptions<'a, T>,
    ) -> RecoveryResult<T> {
        let mut last_error = error;
        let mut attempts = 0;

        if let Some(retry) = options.retry_fn {
            attempts = 1;
            match retry().await {
                Ok(value) => {
                    info!(context = %context, "recovered with alternative resource");
                    return RecoveryResult::recovered(value, attempts);
                }
                Err(retry_error) => {
                    warn!(context = %context, error = %retry_error, "alternative resource failed");
                    last_error = retry_error;
                }
            }
        }

        match options.fallback_value {
            Some(value) => {
                let warning = format!("{context}: using fallback after {last_error}");
                RecoveryResult::fallback(value, warning, attempts)
            }
            None => RecoveryResult::failed(last_error, None, attempts),
        }
    }

    async fn retry_with_backoff<'a, T: Send + 'a>(
        &self,
        error: RecallError,
        context: &RecoveryContext,
        options: RecoveryOptions<'a, T>,
    ) -> RecoveryResult<T> {
        let key = context.retry_key();
        let max_retries = options.max_retries.unwrap_or(self.max_retries);

        let Some(retry) = options.retry_fn else {
            return RecoveryResult::failed(
                error,
                Some(format!("{context}: no retry function supplied")),
                0,
            );
        };

        let mut last_error = error;
        let mut made = 0;
        loop {
            let Some(attempt) = self.claim_attempt(&key, max_retries) else {
                let attempts = self
                    .attempts
                    .remove(&key)
                    .map(|(_, a)| a)
                    .unwrap_or(max_retries);
                warn!(context = %context, attempts, error = %last_error, "retries exhausted");
                return RecoveryResult::failed(
                    last_error,
                    Some(format!("{context}: gave up after {attempts} attempts")),
                    made,
                );
            };

            let delay = self.backoff_delay(attempt);
            made += 1;
            debug!(context = %context, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "backing off");
            tokio::time::sleep(delay).await;

            match retry().await {
                Ok(value) => {
                    self.attempts.remove(&key);
                    return RecoveryResult::recovered(value, made);
                }
                Err(retry_error) => {
                    if strategy_for(&retry_error) != RecoveryStrategy::ExponentialBackoff {
                        self.attempts.remove(&key);
                        warn!(context = %context, error = %retry_error, "retry failed with a different error");
                        return RecoveryResult::failed(retry_error, None, made);
                    }
                    last_error = retry_error;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_key_includes_memory_id() {
        assert_eq!(RecoveryContext::new("stats").retry_key(), "stats");
        assert_eq!(
            RecoveryContext::for_memory("retrieve_memory", "m1").retry_key(),
            "retrieve_memory:m1"
        );
    }

    #[test]
    fn backoff_doubles_each_attempt() {
        let coordinator = RecoveryCoordinator::new(3, Duration::from_millis(100));
        assert_eq!(coordinator.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(coordinator.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(coordinator.backoff_delay(2), Duration::from_millis(400));
    }

    #[test]
    fn concurrent_claims_never_share_an_attempt() {
        let coordinator = RecoveryCoordinator::new(1_000, Duration::from_millis(1));
        let claimed: Vec<u32> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        (0..100)
                            .filter_map(|_| coordinator.claim_attempt("retrieve_memory:m1", 1_000))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|w| w.join().unwrap())
                .collect()
        });

        assert_eq!(claimed.len(), 800);
        let distinct: std::collections::BTreeSet<u32> = claimed.into_iter().collect();
        assert_eq!(distinct.len(), 800);
        assert_eq!(coordinator.attempts_for("retrieve_memory:m1"), 800);
    }

    #[test]
    fn claims_stop_at_max_retries() {
        let coordinator = RecoveryCoordinator::new(2, Duration::from_millis(1));
        assert_eq!(coordinator.claim_attempt("k", 2), Some(0));
        assert_eq!(coordinator.claim_attempt("k", 2), Some(1));
        assert_eq!(coordinator.claim_attempt("k", 2), None);
        assert_eq!(coordinator.attempts_for("k"), 2);
    }

    #[test]
    fn backoff_exponent_is_capped() {
        let coordinator = RecoveryCoordinator::default();
        assert_eq!(coordinator.backoff_delay(40), coordinator.backoff_delay(16));
    }

    #[test]
    fn into_result_surfaces_error() {
        let result: RecoveryResult<u32> =
            RecoveryResult::failed(RecallError::Internal("x".into()), None, 0);
        assert_eq!(result.into_result(), Err(RecallError::Internal("x".into())));
    }
}
