// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{
    AcquisitionStrategy, Generate, ResourceBatch, ResourceGenerator, Result, SingleFlightGate, StampedeOptions,
    StrategyKind, strategy::Lifecycle,
};

/// Caches batches and lets exactly one caller per key generate while the rest wait.
///
/// All acquisitions go through a [`SingleFlightGate`], so N concurrent callers on a cold key
/// pay for one generation and receive the same batch.
#[derive(Debug)]
pub struct SingleFlightCached<G = ResourceGenerator> {
    generator: G,
    gate: SingleFlightGate,
    lifecycle: Lifecycle,
}

impl SingleFlightCached {
    /// Creates the strategy around a [`ResourceGenerator`] configured by `options`.
    #[must_use]
    pub fn new(options: &StampedeOptions) -> Self {
        Self::with_generator(ResourceGenerator::new(options), options)
    }
}

impl<G: Generate> SingleFlightCached<G> {
    /// Creates the strategy around a custom generator.
    #[must_use]
    pub fn with_generator(generator: G, options: &StampedeOptions) -> Self {
        Self {
            generator,
            gate: SingleFlightGate::new(options.ttl()),
            lifecycle: Lifecycle::default(),
        }
    }

    /// The generator called by the caller holding a key's token.
    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// The gate arbitrating population.
    #[must_use]
    pub fn gate(&self) -> &SingleFlightGate {
        &self.gate
    }
}

impl<G: Generate> AcquisitionStrategy for SingleFlightCached<G> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SingleFlightCached
    }

    async fn acquire_key(&self, key: &str) -> Result<ResourceBatch> {
        self.lifecycle.ensure_open()?;
        self.gate.run_exclusive(key, || self.generator.generate(key)).await
    }

    fn clear(&self, key: &str) {
        self.gate.clear(key);
    }

    fn shutdown(&self) {
        if self.lifecycle.shut_down(self.kind()) {
            self.gate.close();
        }
    }
}
