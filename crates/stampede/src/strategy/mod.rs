// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The four resource-acquisition strategies and the contract they share.
//!
//! | Strategy                 | Cache | Coordination          | Generations for N concurrent misses |
//! |--------------------------|-------|-----------------------|-------------------------------------|
//! | [`Unprotected`]          | no    | none                  | N                                   |
//! | [`DeadlockProne`]        | no    | two locks, mixed order| hangs when both classes run         |
//! | [`RacyCached`]           | yes   | none                  | between 1 and N                     |
//! | [`SingleFlightCached`]   | yes   | per-key token         | exactly 1                           |

mod deadlock_prone;
mod racy_cached;
mod single_flight_cached;
mod unprotected;

use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

pub use deadlock_prone::DeadlockProne;
pub use racy_cached::RacyCached;
pub use single_flight_cached::SingleFlightCached;
pub use unprotected::Unprotected;

use crate::{
    Error, ResourceBatch, Result, StampedeOptions,
    telemetry::{self, SOURCE_STRATEGY, Severity},
};

/// Key used by [`AcquisitionStrategy::acquire`].
pub const DEFAULT_KEY: &str = "resources";

/// The capability every strategy provides, so a driver can swap one for another.
pub trait AcquisitionStrategy: Send + Sync {
    /// Identifies the strategy.
    fn kind(&self) -> StrategyKind;

    /// Acquires the batch for `key`.
    fn acquire_key(&self, key: &str) -> impl Future<Output = Result<ResourceBatch>> + Send;

    /// Acquires the batch for [`DEFAULT_KEY`].
    fn acquire(&self) -> impl Future<Output = Result<ResourceBatch>> + Send {
        self.acquire_key(DEFAULT_KEY)
    }

    /// Acquires the batch for `key`, giving up once `timeout` elapses.
    ///
    /// Giving up drops the in-progress acquisition, which releases any token or lock it held;
    /// other callers are unaffected.
    fn acquire_within(&self, key: &str, timeout: Duration) -> impl Future<Output = Result<ResourceBatch>> + Send {
        let kind = self.kind();
        let acquisition = self.acquire_key(key);

        async move {
            match tokio::time::timeout(timeout, acquisition).await {
                Ok(outcome) => outcome,
                Err(_elapsed) => {
                    telemetry::emit(
                        Severity::Warning,
                        SOURCE_STRATEGY,
                        true,
                        format_args!("{kind} gave up on '{key}' after {timeout:?}"),
                    );
                    Err(Error::timed_out(key, timeout))
                }
            }
        }
    }

    /// Invalidates whatever is cached for `key`. A no-op for strategies without a cache.
    fn clear(&self, key: &str);

    /// Releases cached state and refuses further acquisitions with [`Error::ShutDown`].
    fn shutdown(&self);
}

/// Names the four strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// See [`Unprotected`].
    Unprotected,
    /// See [`DeadlockProne`].
    DeadlockProne,
    /// See [`RacyCached`].
    RacyCached,
    /// See [`SingleFlightCached`].
    SingleFlightCached,
}

impl StrategyKind {
    /// Every strategy, baseline first.
    pub const ALL: [Self; 4] = [Self::Unprotected, Self::DeadlockProne, Self::RacyCached, Self::SingleFlightCached];

    /// The kebab-case name used by [`Display`](fmt::Display) and [`FromStr`].
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Unprotected => "unprotected",
            Self::DeadlockProne => "deadlock-prone",
            Self::RacyCached => "racy-cached",
            Self::SingleFlightCached => "single-flight-cached",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| Error::invalid_config(format!("unknown strategy '{s}'")))
    }
}

/// Any one of the four strategies, chosen at runtime.
///
/// # Examples
///
/// ```
/// use stampede::{AcquisitionStrategy, StampedeOptions, Strategy, StrategyKind};
///
/// let kind: StrategyKind = "single-flight-cached".parse()?;
/// let strategy = Strategy::new(kind, &StampedeOptions::default());
/// assert_eq!(strategy.kind(), StrategyKind::SingleFlightCached);
/// # Ok::<(), stampede::Error>(())
/// ```
#[derive(Debug)]
pub enum Strategy {
    /// See [`Unprotected`].
    Unprotected(Unprotected),
    /// See [`DeadlockProne`].
    DeadlockProne(DeadlockProne),
    /// See [`RacyCached`].
    RacyCached(RacyCached),
    /// See [`SingleFlightCached`].
    SingleFlightCached(SingleFlightCached),
}

impl Strategy {
    /// Builds the strategy named by `kind` around a fresh resource generator.
    #[must_use]
    pub fn new(kind: StrategyKind, options: &StampedeOptions) -> Self {
        match kind {
            StrategyKind::Unprotected => Self::Unprotected(Unprotected::new(options)),
            StrategyKind::DeadlockProne => Self::DeadlockProne(DeadlockProne::new(options)),
            StrategyKind::RacyCached => Self::RacyCached(RacyCached::new(options)),
            StrategyKind::SingleFlightCached => Self::SingleFlightCached(SingleFlightCached::new(options)),
        }
    }
}

impl AcquisitionStrategy for Strategy {
    fn kind(&self) -> StrategyKind {
        match self {
            Self::Unprotected(strategy) => strategy.kind(),
            Self::DeadlockProne(strategy) => strategy.kind(),
            Self::RacyCached(strategy) => strategy.kind(),
            Self::SingleFlightCached(strategy) => strategy.kind(),
        }
    }

    async fn acquire_key(&self, key: &str) -> Result<ResourceBatch> {
        match self {
            Self::Unprotected(strategy) => strategy.acquire_key(key).await,
            Self::DeadlockProne(strategy) => strategy.acquire_key(key).await,
            Self::RacyCached(strategy) => strategy.acquire_key(key).await,
            Self::SingleFlightCached(strategy) => strategy.acquire_key(key).await,
        }
    }

    fn clear(&self, key: &str) {
        match self {
            Self::Unprotected(strategy) => strategy.clear(key),
            Self::DeadlockProne(strategy) => strategy.clear(key),
            Self::RacyCached(strategy) => strategy.clear(key),
            Self::SingleFlightCached(strategy) => strategy.clear(key),
        }
    }

    fn shutdown(&self) {
        match self {
            Self::Unprotected(strategy) => strategy.shutdown(),
            Self::DeadlockProne(strategy) => strategy.shutdown(),
            Self::RacyCached(strategy) => strategy.shutdown(),
            Self::SingleFlightCached(strategy) => strategy.shutdown(),
        }
    }
}

/// Open/shut-down state shared by every strategy.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    shut_down: AtomicBool,
}

impl Lifecycle {
    pub(crate) fn is_open(&self) -> bool {
        !self.shut_down.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::ShutDown)
        }
    }

    /// Returns `true` for the call that actually shut down.
    pub(crate) fn shut_down(&self, kind: StrategyKind) -> bool {
        let first = !self.shut_down.swap(true, Ordering::SeqCst);
        if first {
            telemetry::emit(Severity::Info, SOURCE_STRATEGY, false, format_args!("{kind} shut down"));
        }
        first
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_its_name() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.to_string().parse::<StrategyKind>().unwrap(), kind);
        }
    }

    #[test]
    fn kind_parsing_is_lenient_about_case_and_separators() {
        assert_eq!("Single_Flight_Cached".parse::<StrategyKind>().unwrap(), StrategyKind::SingleFlightCached);
        assert_eq!(" racy-cached ".parse::<StrategyKind>().unwrap(), StrategyKind::RacyCached);
    }

    #[test]
    fn unknown_kind_is_a_config_error() {
        let error = "lru".parse::<StrategyKind>().unwrap_err();
        assert!(matches!(error, Error::InvalidConfig(message) if message.contains("lru")));
    }

    #[test]
    fn strategy_reports_its_kind() {
        let options = StampedeOptions::default();
        for kind in StrategyKind::ALL {
            assert_eq!(Strategy::new(kind, &options).kind(), kind);
        }
    }

    #[test]
    fn lifecycle_shuts_down_once() {
        let lifecycle = Lifecycle::default();
        assert!(lifecycle.ensure_open().is_ok());

        assert!(lifecycle.shut_down(StrategyKind::Unprotected));
        assert!(!lifecycle.shut_down(StrategyKind::Unprotected));
        assert!(matches!(lifecycle.ensure_open(), Err(Error::ShutDown)));
    }
}
