// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{
    AcquisitionStrategy, Generate, ResourceBatch, ResourceGenerator, Result, StampedeOptions, StrategyKind,
    strategy::Lifecycle,
};

/// Calls the generator on every acquisition; no cache, no coordination.
///
/// The baseline the other strategies are measured against: N concurrent callers pay for N
/// generations.
#[derive(Debug)]
pub struct Unprotected<G = ResourceGenerator> {
    generator: G,
    lifecycle: Lifecycle,
}

impl Unprotected {
    /// Creates the strategy around a [`ResourceGenerator`] configured by `options`.
    #[must_use]
    pub fn new(options: &StampedeOptions) -> Self {
        Self::with_generator(ResourceGenerator::new(options))
    }
}

impl<G: Generate> Unprotected<G> {
    /// Creates the strategy around a custom generator.
    #[must_use]
    pub fn with_generator(generator: G) -> Self {
        Self {
            generator,
            lifecycle: Lifecycle::default(),
        }
    }

    /// The generator every acquisition calls.
    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub(crate) fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

impl<G: Generate> AcquisitionStrategy for Unprotected<G> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Unprotected
    }

    async fn acquire_key(&self, key: &str) -> Result<ResourceBatch> {
        self.lifecycle.ensure_open()?;
        self.generator.generate(key).await
    }

    fn clear(&self, _key: &str) {}

    fn shutdown(&self) {
        self.lifecycle.shut_down(self.kind());
    }
}
