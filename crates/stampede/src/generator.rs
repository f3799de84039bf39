// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The expensive backing operation whose cost the strategies try to avoid repeating.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::time::Instant;

use crate::{
    ITEM_NAMES, ResourceBatch, ResourceItem, Result, StampedeOptions,
    telemetry::{self, SOURCE_GENERATOR, Severity},
};

/// Produces a [`ResourceBatch`] for a key.
///
/// Strategies are generic over this trait so that alternative backends (or test doubles that
/// fail for selected keys) can be injected in place of [`ResourceGenerator`].
pub trait Generate: Send + Sync {
    /// Produces a fresh batch for `key`.
    fn generate(&self, key: &str) -> impl Future<Output = Result<ResourceBatch>> + Send;
}

impl<G: Generate> Generate for Arc<G> {
    fn generate(&self, key: &str) -> impl Future<Output = Result<ResourceBatch>> + Send {
        (**self).generate(key)
    }
}

/// Produces batches of randomly named items, paying a fixed delay per item.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use stampede::{Generate, ResourceGenerator, StampedeOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> stampede::Result<()> {
/// let options = StampedeOptions::builder()
///     .item_count(3)
///     .item_delay(Duration::from_millis(1))
///     .build()?;
/// let generator = ResourceGenerator::new(&options);
///
/// let batch = generator.generate("resources").await?;
/// assert_eq!(batch.len(), 3);
/// assert_eq!(generator.generated_batches(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ResourceGenerator {
    item_count: usize,
    item_delay: Duration,
    generated: AtomicU64,
}

impl ResourceGenerator {
    /// Creates a generator using the item count and per-item delay from `options`.
    #[must_use]
    pub fn new(options: &StampedeOptions) -> Self {
        Self {
            item_count: options.item_count(),
            item_delay: options.item_delay(),
            generated: AtomicU64::new(0),
        }
    }

    /// Number of items in each batch.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Simulated latency of each item.
    #[must_use]
    pub fn item_delay(&self) -> Duration {
        self.item_delay
    }

    /// Number of generation calls that have run to completion.
    #[must_use]
    pub fn generated_batches(&self) -> u64 {
        self.generated.load(Ordering::Acquire)
    }
}

impl Generate for ResourceGenerator {
    async fn generate(&self, key: &str) -> Result<ResourceBatch> {
        let started = Instant::now();
        telemetry::emit(
            Severity::Info,
            SOURCE_GENERATOR,
            false,
            format_args!("generating {} items for '{key}'", self.item_count),
        );

        let mut items = Vec::with_capacity(self.item_count);
        for index in 0..self.item_count {
            tokio::time::sleep(self.item_delay).await;

            let name = ITEM_NAMES[fastrand::usize(..ITEM_NAMES.len())];
            telemetry::emit(
                Severity::Debug,
                SOURCE_GENERATOR,
                false,
                format_args!("produced item {}/{} '{name}' for '{key}'", index + 1, self.item_count),
            );
            items.push(ResourceItem::new(name));
        }

        let generation = self.generated.fetch_add(1, Ordering::AcqRel) + 1;
        telemetry::emit(
            Severity::Info,
            SOURCE_GENERATOR,
            true,
            format_args!("generation #{generation} for '{key}' finished in {:?}", started.elapsed()),
        );

        Ok(ResourceBatch::new(items))
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    fn options(item_count: usize, item_delay_ms: u64) -> StampedeOptions {
        StampedeOptions::builder()
            .item_count(item_count)
            .item_delay(Duration::from_millis(item_delay_ms))
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn generates_configured_number_of_items() {
        let generator = ResourceGenerator::new(&options(10, 200));

        let started = Instant::now();
        let batch = generator.generate("resources").await.unwrap();

        assert_eq!(batch.len(), 10);
        assert!(batch.iter().all(|item| ITEM_NAMES.contains(&item.name())));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(2100), "elapsed {elapsed:?}");
        assert_eq!(generator.generated_batches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn every_call_produces_a_new_batch() {
        let generator = ResourceGenerator::new(&options(2, 1));

        let first = generator.generate("resources").await.unwrap();
        let second = generator.generate("resources").await.unwrap();

        assert!(!first.same_batch(&second));
        assert_eq!(generator.generated_batches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shared_generator_counts_through_arc() {
        let generator = Arc::new(ResourceGenerator::new(&options(1, 1)));
        let shared = Arc::clone(&generator);

        shared.generate("resources").await.unwrap();

        assert_eq!(generator.generated_batches(), 1);
    }
}
