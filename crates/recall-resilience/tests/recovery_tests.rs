// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Recovery Coordinator.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use futures::FutureExt;
use recall_core::RecallError;
use recall_resilience::{RecoveryContext, RecoveryCoordinator, RecoveryOptions};
use tokio::time::Instant;

fn conflict(id: &str) -> RecallError {
    RecallError::ConcurrentAccess {
        memory_id: id.to_string(),
        operation: "retrieve_memory".to_string(),
    }
}

#[tokio::test]
async fn dimension_mismatch_substitutes_fallback() {
    let coordinator = RecoveryCoordinator::default();
    let ctx = RecoveryContext::for_memory("similarity", "m1");
    let result = coordinator
        .handle(
            RecallError::DimensionMismatch {
                expected: 384,
                actual: 3,
            },
            &ctx,
            RecoveryOptions::<f64>::default().with_fallback(0.42),
        )
        .await;

    assert!(result.success);
    assert!(result.fallback_used);
    assert_eq!(result.result, Some(0.42));
    let warning = result.warning.expect("fallback carries a warning");
    assert!(warning.contains("dimension mismatch"), "got: {warning}");
}

#[tokio::test]
async fn non_recoverable_error_never_retries() {
    let coordinator = RecoveryCoordinator::default();
    let calls = AtomicU32::new(0);
    let ctx = RecoveryContext::for_memory("retrieve_memory", "ghost");

    let result = coordinator
        .handle(
            RecallError::MemoryNotFound {
                memory_id: "ghost".into(),
            },
            &ctx,
            RecoveryOptions::<u32>::default()
                .with_fallback(1)
                .with_retry(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(2) }.boxed()
                }),
        )
        .await;

    assert!(!result.success);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(matches!(
        result.error,
        Some(RecallError::MemoryNotFound { ref memory_id }) if memory_id == "ghost"
    ));
}

#[tokio::test(start_paused = true)]
async fn concurrent_access_backs_off_exponentially() {
    let coordinator = RecoveryCoordinator::new(3, Duration::from_secs(1));
    let calls = AtomicU32::new(0);
    let ctx = RecoveryContext::for_memory("retrieve_memory", "m1");
    let started = Instant::now();

    let result = coordinator
        .handle(
            conflict("m1"),
            &ctx,
            RecoveryOptions::<u32>::default().with_retry(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { if n < 2 { Err(conflict("m1")) } else { Ok(n) } }.boxed()
            }),
        )
        .await;

    assert!(result.success);
    assert!(!result.fallback_used);
    assert_eq!(result.result, Some(2));
    assert_eq!(result.attempts, 2);
    // 1s before the first retry, 2s before the second
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(coordinator.attempts_for(&ctx.retry_key()), 0);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_returns_structured_failure() {
    let coordinator = RecoveryCoordinator::new(3, Duration::from_millis(100));
    let calls = AtomicU32::new(0);
    let ctx = RecoveryContext::for_memory("retrieve_memory", "m1");
    let started = Instant::now();

    let result = coordinator
        .handle(
            conflict("m1"),
            &ctx,
            RecoveryOptions::<u32>::default().with_retry(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(conflict("m1")) }.boxed()
            }),
        )
        .await;

    assert!(!result.success);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(result.attempts, 3);
    assert!(result.warning.as_deref().unwrap_or_default().contains("gave up"));
    // 100 + 200 + 400 ms
    assert!(started.elapsed() >= Duration::from_millis(700));
    assert_eq!(coordinator.pending_keys(), 0);
}

#[tokio::test(start_paused = true)]
async fn per_call_max_retries_override() {
    let coordinator = RecoveryCoordinator::new(3, Duration::from_millis(10));
    let calls = AtomicU32::new(0);
    let ctx = RecoveryContext::new("cleanup");

    let result = coordinator
        .handle(
            RecallError::Internal("flaky".into()),
            &ctx,
            RecoveryOptions::<()>::default()
                .with_max_retries(1)
                .with_retry(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(RecallError::Internal("still flaky".into())) }.boxed()
                }),
        )
        .await;

    assert!(!result.success);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.into_result(), Err(RecallError::Internal("still flaky".into())));
}

#[tokio::test(start_paused = true)]
async fn backoff_stops_when_retry_fails_differently() {
    let coordinator = RecoveryCoordinator::new(5, Duration::from_millis(10));
    let calls = AtomicU32::new(0);
    let ctx = RecoveryContext::for_memory("retrieve_memory", "m9");

    let result = coordinator
        .handle(
            conflict("m9"),
            &ctx,
            RecoveryOptions::<u32>::default().with_retry(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(RecallError::MemoryNotFound {
                        memory_id: "m9".into(),
                    })
                }
                .boxed()
            }),
        )
        .await;

    assert!(!result.success);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.pending_keys(), 0);
}

#[tokio::test]
async fn embedding_failure_falls_back_after_alternative_fails() {
    let coordinator = RecoveryCoordinator::default();
    let ctx = RecoveryContext::new("store_memory");

    let result = coordinator
        .handle(
            RecallError::EmbeddingGeneration {
                model: "primary".into(),
                reason: "timeout".into(),
            },
            &ctx,
            RecoveryOptions::<Vec<f32>>::default()
                .with_fallback(vec![0.0, 1.0])
                .with_retry(|| {
                    async {
                        Err(RecallError::EmbeddingGeneration {
                            model: "secondary".into(),
                            reason: "offline".into(),
                        })
                    }
                    .boxed()
                }),
        )
        .await;

    assert!(result.success);
    assert!(result.fallback_used);
    assert_eq!(result.attempts, 1);
    assert!(result.warning.unwrap_or_default().contains("secondary"));
}

#[tokio::test]
async fn embedding_failure_recovers_with_alternative() {
    let coordinator = RecoveryCoordinator::default();
    let ctx = RecoveryContext::new("store_memory");

    let result = coordinator
        .handle(
            RecallError::EmbeddingGeneration {
                model: "primary".into(),
                reason: "timeout".into(),
            },
            &ctx,
            RecoveryOptions::<Vec<f32>>::default().with_retry(|| async { Ok(vec![1.0]) }.boxed()),
        )
        .await;

    assert!(result.success);
    assert!(!result.fallback_used);
    assert_eq!(result.result, Some(vec![1.0]));
}

#[tokio::test(start_paused = true)]
async fn retry_keys_are_isolated_per_memory() {
    let coordinator = RecoveryCoordinator::new(2, Duration::from_millis(50));
    let ctx_a = RecoveryContext::for_memory("retrieve_memory", "a");
    let ctx_b = RecoveryContext::for_memory("retrieve_memory", "b");

    let (a, b) = tokio::join!(
        coordinator.handle(
            conflict("a"),
            &ctx_a,
            RecoveryOptions::<&str>::default().with_retry(|| async { Ok("a") }.boxed()),
        ),
        coordinator.handle(
            conflict("b"),
            &ctx_b,
            RecoveryOptions::<&str>::default().with_retry(|| async { Ok("b") }.boxed()),
        ),
    );

    assert_eq!(a.result, Some("a"));
    assert_eq!(b.result, Some("b"));
    assert_eq!(a.attempts, 1);
    assert_eq!(b.attempts, 1);
    assert_eq!(coordinator.pending_keys(), 0);
}
