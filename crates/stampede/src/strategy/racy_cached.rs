// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use crate::{
    AcquisitionStrategy, CacheStore, Generate, ResourceBatch, ResourceGenerator, Result, StampedeOptions, StrategyKind,
    strategy::Lifecycle,
    telemetry::{self, SOURCE_CACHE, Severity},
};

/// Caches batches but lets every caller that misses generate its own.
///
/// Check-then-act without exclusion: concurrent misses each run the generator and the last
/// one to store its batch wins. Once warm it behaves like a cache; the herd only forms while
/// the key is missing.
#[derive(Debug)]
pub struct RacyCached<G = ResourceGenerator> {
    generator: G,
    store: CacheStore,
    ttl: Duration,
    lifecycle: Lifecycle,
}

impl RacyCached {
    /// Creates the strategy around a [`ResourceGenerator`] configured by `options`.
    #[must_use]
    pub fn new(options: &StampedeOptions) -> Self {
        Self::with_generator(ResourceGenerator::new(options), options)
    }
}

impl<G: Generate> RacyCached<G> {
    /// Creates the strategy around a custom generator.
    #[must_use]
    pub fn with_generator(generator: G, options: &StampedeOptions) -> Self {
        Self {
            generator,
            store: CacheStore::new(),
            ttl: options.ttl(),
            lifecycle: Lifecycle::default(),
        }
    }

    /// The generator called on a miss.
    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// The store batches are cached in.
    #[must_use]
    pub fn store(&self) -> &CacheStore {
        &self.store
    }
}

impl<G: Generate> AcquisitionStrategy for RacyCached<G> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RacyCached
    }

    async fn acquire_key(&self, key: &str) -> Result<ResourceBatch> {
        self.lifecycle.ensure_open()?;

        if let Some(batch) = self.store.try_get(key) {
            telemetry::emit(Severity::Debug, SOURCE_CACHE, false, format_args!("hit on '{key}'"));
            return Ok(batch);
        }

        telemetry::emit(Severity::Info, SOURCE_CACHE, false, format_args!("miss on '{key}', generating without coordination"));
        let batch = self.generator.generate(key).await?;

        // A generation that outlives shutdown hands its batch back but leaves the store empty.
        if self.lifecycle.is_open() {
            self.store.set(key, batch.clone(), self.ttl);
            if !self.lifecycle.is_open() {
                self.store.remove_batch(key, &batch);
            }
        }

        Ok(batch)
    }

    fn clear(&self, key: &str) {
        self.store.remove(key);
    }

    fn shutdown(&self) {
        if self.lifecycle.shut_down(self.kind()) {
            self.store.clear();
        }
    }
}
