// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use crate::{
    AcquisitionStrategy, CallerClass, Generate, LockPair, ResourceBatch, ResourceGenerator, Result, StampedeOptions,
    StrategyKind, Unprotected,
};

/// Runs the unprotected generation inside the lock-ordering dance of a [`LockPair`].
///
/// Acquisitions alternate between [`CallerClass::A`] and [`CallerClass::B`]. Two overlapping
/// acquisitions of different classes deadlock and stay deadlocked until the caller abandons
/// them, for example through [`AcquisitionStrategy::acquire_within`].
#[derive(Debug)]
pub struct DeadlockProne<G = ResourceGenerator> {
    inner: Unprotected<G>,
    locks: &'static LockPair,
    hold_delay: Duration,
    tickets: AtomicU64,
}

impl DeadlockProne {
    /// Creates the strategy around a [`ResourceGenerator`], using the process-wide lock pair.
    #[must_use]
    pub fn new(options: &StampedeOptions) -> Self {
        Self::with_generator(ResourceGenerator::new(options), options)
    }
}

impl<G: Generate> DeadlockProne<G> {
    /// Creates the strategy around a custom generator, using the process-wide lock pair.
    #[must_use]
    pub fn with_generator(generator: G, options: &StampedeOptions) -> Self {
        Self {
            inner: Unprotected::with_generator(generator),
            locks: LockPair::global(),
            hold_delay: options.hold_delay(),
            tickets: AtomicU64::new(0),
        }
    }

    /// Uses `locks` instead of the process-wide pair.
    #[must_use]
    pub fn with_locks(mut self, locks: &'static LockPair) -> Self {
        self.locks = locks;
        self
    }

    /// The generator called once both locks are held.
    #[must_use]
    pub fn generator(&self) -> &G {
        self.inner.generator()
    }

    /// Acquires `key` following the lock order of `class`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShutDown`](crate::Error::ShutDown) after shutdown, or the generator's error.
    pub async fn acquire_as(&self, class: CallerClass, key: &str) -> Result<ResourceBatch> {
        self.inner.lifecycle().ensure_open()?;
        self.locks
            .hold_both(class, self.hold_delay, || self.inner.acquire_key(key))
            .await
    }
}

impl<G: Generate> AcquisitionStrategy for DeadlockProne<G> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DeadlockProne
    }

    async fn acquire_key(&self, key: &str) -> Result<ResourceBatch> {
        let class = CallerClass::from_ticket(self.tickets.fetch_add(1, Ordering::Relaxed));
        self.acquire_as(class, key).await
    }

    fn clear(&self, _key: &str) {}

    fn shutdown(&self) {
        self.inner.shutdown();
    }
}
