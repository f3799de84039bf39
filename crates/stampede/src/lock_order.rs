// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Two locks acquired in opposite orders by two classes of callers.
//!
//! Class A takes L1 then L2, class B takes L2 then L1, each pausing while holding the first
//! lock. Run one caller of each class concurrently and both end up holding the lock the other
//! is waiting for: a circular wait that never resolves on its own. The only way out is for the
//! caller to give up, at which point dropping its future releases whatever it held.
//!
//! Nothing here orders the locks consistently, detects the cycle or retries. The hang is the
//! behavior being demonstrated.

use std::{fmt, sync::LazyLock, time::Duration};

use tokio::sync::Mutex;

use crate::telemetry::{self, SOURCE_LOCKS, Severity};

static GLOBAL_LOCKS: LazyLock<LockPair> = LazyLock::new(LockPair::new);

/// Which lock order a caller follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallerClass {
    /// Takes L1, then L2.
    A,
    /// Takes L2, then L1.
    B,
}

impl CallerClass {
    /// Partitions callers by the parity of a caller-assigned ticket: even tickets are class A.
    #[must_use]
    pub fn from_ticket(ticket: u64) -> Self {
        if ticket.is_multiple_of(2) { Self::A } else { Self::B }
    }
}

impl fmt::Display for CallerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

/// The pair of exclusion locks used by the lock-ordering demo.
#[derive(Debug, Default)]
pub struct LockPair {
    l1: Mutex<()>,
    l2: Mutex<()>,
}

impl LockPair {
    /// Creates an independent pair of locks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide pair shared by every caller that does not bring its own.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL_LOCKS
    }

    /// Takes both locks in the order dictated by `class`, holding the first for `hold`
    /// before requesting the second, then runs `body` with both held.
    ///
    /// Never completes while a caller of the other class holds its first lock.
    pub async fn hold_both<F, Fut, T>(&self, class: CallerClass, hold: Duration, body: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let ((first, first_name), (second, second_name)) = match class {
            CallerClass::A => ((&self.l1, "L1"), (&self.l2, "L2")),
            CallerClass::B => ((&self.l2, "L2"), (&self.l1, "L1")),
        };

        let _first = first.lock().await;
        telemetry::emit(Severity::Info, SOURCE_LOCKS, false, format_args!("class {class} holds {first_name}"));

        tokio::time::sleep(hold).await;

        telemetry::emit(
            Severity::Warning,
            SOURCE_LOCKS,
            true,
            format_args!("class {class} holds {first_name} and waits for {second_name}"),
        );
        let _second = second.lock().await;
        telemetry::emit(Severity::Info, SOURCE_LOCKS, false, format_args!("class {class} holds {first_name} and {second_name}"));

        body().await
    }
}
