// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Drives every strategy through the shared `AcquisitionStrategy` contract.

use std::time::Duration;

use futures_util::future::join_all;
use stampede::{AcquisitionStrategy, DEFAULT_KEY, DeadlockProne, Error, LockPair, StampedeOptions, Strategy, StrategyKind};

fn options() -> StampedeOptions {
    StampedeOptions::builder()
        .item_count(3)
        .item_delay(Duration::from_millis(20))
        .hold_delay(Duration::from_millis(30))
        .build()
        .unwrap()
}

/// Builds `kind`, giving the deadlock-prone strategy a private lock pair so parallel tests cannot collide.
fn build(kind: StrategyKind) -> Strategy {
    match kind {
        StrategyKind::DeadlockProne => {
            Strategy::DeadlockProne(DeadlockProne::new(&options()).with_locks(Box::leak(Box::new(LockPair::new()))))
        }
        _ => Strategy::new(kind, &options()),
    }
}

/// Generic driver: issues `callers` concurrent acquisitions and reports how many succeeded.
async fn drive<S: AcquisitionStrategy>(strategy: &S, callers: usize, timeout: Duration) -> (usize, usize) {
    let outcomes = join_all((0..callers).map(|_| strategy.acquire_within(DEFAULT_KEY, timeout))).await;
    let succeeded = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let timed_out = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(Error::TimedOut { .. })))
        .count();
    (succeeded, timed_out)
}

#[tokio::test(start_paused = true)]
async fn every_strategy_serves_a_lone_caller() {
    for kind in StrategyKind::ALL {
        let strategy = build(kind);
        let (succeeded, _) = drive(&strategy, 1, Duration::from_secs(5)).await;
        assert_eq!(succeeded, 1, "{kind}");
    }
}

#[tokio::test(start_paused = true)]
async fn only_the_deadlock_prone_strategy_hangs_under_concurrency() {
    for kind in [StrategyKind::Unprotected, StrategyKind::RacyCached, StrategyKind::SingleFlightCached] {
        let strategy = build(kind);
        assert_eq!(drive(&strategy, 4, Duration::from_secs(5)).await, (4, 0), "{kind}");
    }

    let strategy = build(StrategyKind::DeadlockProne);
    let (succeeded, timed_out) = drive(&strategy, 2, Duration::from_secs(5)).await;
    assert_eq!((succeeded, timed_out), (0, 2));
}

#[tokio::test(start_paused = true)]
async fn shutdown_is_uniform() {
    for kind in StrategyKind::ALL {
        let strategy = build(kind);
        strategy.shutdown();
        assert!(matches!(strategy.acquire().await, Err(Error::ShutDown)), "{kind}");
    }
}
