// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `DeadlockProne`.

use std::time::Duration;

use stampede::{AcquisitionStrategy, CallerClass, DEFAULT_KEY, DeadlockProne, Error, LockPair, StampedeOptions};
use tokio::time::Instant;

const HOLD: Duration = Duration::from_millis(150);
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

fn options() -> StampedeOptions {
    StampedeOptions::builder()
        .item_count(2)
        .item_delay(Duration::from_millis(10))
        .hold_delay(HOLD)
        .build()
        .unwrap()
}

/// Each test gets its own lock pair so tests running in parallel cannot interfere.
fn isolated(options: &StampedeOptions) -> DeadlockProne {
    DeadlockProne::new(options).with_locks(Box::leak(Box::new(LockPair::new())))
}

#[tokio::test(start_paused = true)]
async fn lone_caller_completes() {
    let strategy = isolated(&options());

    let batch = strategy.acquire_within(DEFAULT_KEY, TEST_TIMEOUT).await.unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(strategy.generator().generated_batches(), 1);
}

#[tokio::test(start_paused = true)]
async fn same_class_callers_serialize_but_complete() {
    let strategy = isolated(&options());

    let (a, b) = tokio::join!(
        strategy.acquire_as(CallerClass::A, DEFAULT_KEY),
        strategy.acquire_as(CallerClass::A, DEFAULT_KEY),
    );

    assert!(!a.unwrap().same_batch(&b.unwrap()));
    assert_eq!(strategy.generator().generated_batches(), 2);
}

#[tokio::test(start_paused = true)]
async fn opposite_classes_never_complete() {
    let strategy = isolated(&options());

    let started = Instant::now();
    let (first, second) = tokio::join!(
        strategy.acquire_within(DEFAULT_KEY, TEST_TIMEOUT),
        strategy.acquire_within(DEFAULT_KEY, TEST_TIMEOUT),
    );

    assert!(started.elapsed() >= TEST_TIMEOUT);
    assert!(started.elapsed() > 2 * (HOLD + HOLD));
    for outcome in [first, second] {
        let error = outcome.unwrap_err();
        assert!(matches!(error, Error::TimedOut { .. }), "deadlock must surface as a timeout, got {error}");
    }
    assert_eq!(strategy.generator().generated_batches(), 0);
}

#[tokio::test(start_paused = true)]
async fn abandoned_callers_release_their_locks() {
    let strategy = isolated(&options());

    let (first, second) = tokio::join!(
        strategy.acquire_within(DEFAULT_KEY, TEST_TIMEOUT),
        strategy.acquire_within(DEFAULT_KEY, TEST_TIMEOUT),
    );
    assert!(first.unwrap_err().is_timeout());
    assert!(second.unwrap_err().is_timeout());

    let batch = strategy.acquire_as(CallerClass::B, DEFAULT_KEY).await.unwrap();
    assert_eq!(batch.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn explicit_classes_deadlock_regardless_of_tickets() {
    let strategy = isolated(&options());

    let outcome = tokio::time::timeout(TEST_TIMEOUT, async {
        tokio::join!(
            strategy.acquire_as(CallerClass::B, DEFAULT_KEY),
            strategy.acquire_as(CallerClass::A, DEFAULT_KEY),
        )
    })
    .await;

    assert!(outcome.is_err());
}

#[tokio::test(start_paused = true)]
async fn process_wide_locks_serve_a_lone_caller() {
    let strategy = DeadlockProne::new(&options());

    let batch = strategy.acquire_within(DEFAULT_KEY, TEST_TIMEOUT).await.unwrap();

    assert_eq!(batch.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_refuses_acquisitions() {
    let strategy = isolated(&options());

    strategy.shutdown();

    assert!(matches!(
        strategy.acquire_within(DEFAULT_KEY, TEST_TIMEOUT).await,
        Err(Error::ShutDown)
    ));
}
