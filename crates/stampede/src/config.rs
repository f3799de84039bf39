// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Tunables shared by the generator, the cache and the lock-ordering demo.

use std::time::Duration;

use crate::{Error, Result};

/// Number of items in every generated batch unless configured otherwise.
pub const DEFAULT_ITEM_COUNT: usize = 10;

/// Simulated latency of producing a single item unless configured otherwise.
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_millis(200);

/// Lifetime of a cached batch unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// How long a deadlock-demo caller holds its first lock before reaching for the second.
pub const DEFAULT_HOLD_DELAY: Duration = Duration::from_millis(150);

/// Validated options for building acquisition strategies.
///
/// Options can only be obtained through [`StampedeOptions::builder`] or [`Default`], so a
/// strategy built from them never has to re-check its configuration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use stampede::StampedeOptions;
///
/// let options = StampedeOptions::builder()
///     .item_count(5)
///     .item_delay(Duration::from_millis(50))
///     .build()?;
///
/// assert_eq!(options.item_count(), 5);
/// assert_eq!(options.ttl(), Duration::from_secs(600));
/// # Ok::<(), stampede::Error>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StampedeOptions {
    item_count: usize,
    item_delay: Duration,
    ttl: Duration,
    hold_delay: Duration,
}

impl Default for StampedeOptions {
    fn default() -> Self {
        Self {
            item_count: DEFAULT_ITEM_COUNT,
            item_delay: DEFAULT_ITEM_DELAY,
            ttl: DEFAULT_TTL,
            hold_delay: DEFAULT_HOLD_DELAY,
        }
    }
}

impl StampedeOptions {
    /// Creates a builder pre-populated with the defaults.
    #[must_use]
    pub fn builder() -> StampedeOptionsBuilder {
        StampedeOptionsBuilder::default()
    }

    /// Number of items in each generated batch.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Simulated latency per generated item.
    #[must_use]
    pub fn item_delay(&self) -> Duration {
        self.item_delay
    }

    /// Lifetime of a cached batch.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Time a deadlock-demo caller holds its first lock before requesting the second.
    #[must_use]
    pub fn hold_delay(&self) -> Duration {
        self.hold_delay
    }

    /// Expected latency of one full generation call.
    #[must_use]
    pub fn generation_latency(&self) -> Duration {
        self.item_delay.saturating_mul(u32::try_from(self.item_count).unwrap_or(u32::MAX))
    }
}

/// Builder for [`StampedeOptions`].
#[derive(Clone, Debug)]
pub struct StampedeOptionsBuilder {
    options: StampedeOptions,
}

impl Default for StampedeOptionsBuilder {
    fn default() -> Self {
        Self {
            options: StampedeOptions::default(),
        }
    }
}

impl StampedeOptionsBuilder {
    /// Sets the number of items per batch.
    #[must_use]
    pub fn item_count(mut self, item_count: usize) -> Self {
        self.options.item_count = item_count;
        self
    }

    /// Sets the simulated latency per item.
    #[must_use]
    pub fn item_delay(mut self, item_delay: Duration) -> Self {
        self.options.item_delay = item_delay;
        self
    }

    /// Sets the lifetime of cached batches.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.options.ttl = ttl;
        self
    }

    /// Sets how long a deadlock-demo caller holds its first lock.
    #[must_use]
    pub fn hold_delay(mut self, hold_delay: Duration) -> Self {
        self.options.hold_delay = hold_delay;
        self
    }

    /// Validates and returns the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the item count, item delay, TTL or hold delay is zero.
    pub fn build(self) -> Result<StampedeOptions> {
        let options = self.options;

        if options.item_count == 0 {
            return Err(Error::invalid_config("item count must be at least 1"));
        }
        if options.item_delay.is_zero() {
            return Err(Error::invalid_config("item delay must be positive"));
        }
        if options.ttl.is_zero() {
            return Err(Error::invalid_config("ttl must be positive"));
        }
        if options.hold_delay.is_zero() {
            return Err(Error::invalid_config("hold delay must be positive"));
        }

        Ok(options)
    }
}
