// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Strategies for acquiring an expensive, cacheable resource under concurrency.
//!
//! When many callers ask for the same missing cache entry at once, each of them may end up
//! paying to produce it: the stampede, or thundering herd. This crate provides four ways of
//! acquiring a [`ResourceBatch`] that make the problem, and one classic wrong turn, concrete:
//!
//! - [`Unprotected`] generates on every call.
//! - [`DeadlockProne`] guards generation with two locks taken in opposite orders by two classes
//!   of callers, and hangs as soon as both classes overlap.
//! - [`RacyCached`] caches, but lets every caller that misses generate its own batch.
//! - [`SingleFlightCached`] caches through a [`SingleFlightGate`], so concurrent misses on a key
//!   share a single generation.
//!
//! All four implement [`AcquisitionStrategy`], so a driver can swap them freely.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use stampede::{AcquisitionStrategy, SingleFlightCached, StampedeOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> stampede::Result<()> {
//! let options = StampedeOptions::builder()
//!     .item_count(4)
//!     .item_delay(Duration::from_millis(5))
//!     .build()?;
//! let strategy = SingleFlightCached::new(&options);
//!
//! let (a, b, c) = tokio::join!(strategy.acquire(), strategy.acquire(), strategy.acquire());
//! let (a, b, c) = (a?, b?, c?);
//!
//! assert!(a.same_batch(&b) && b.same_batch(&c));
//! assert_eq!(strategy.generator().generated_batches(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Timeouts
//!
//! [`AcquisitionStrategy::acquire_within`] bounds an acquisition. A timed-out caller drops its
//! place in line, releasing any token or lock it held, and receives [`Error::TimedOut`], which
//! is how a deadlock in [`DeadlockProne`] surfaces.
//!
//! # Logging
//!
//! Progress is reported through `tracing` events carrying `source` and `highlighted` fields;
//! see [`telemetry`].

mod config;
pub mod error;
mod gate;
mod generator;
mod lock_order;
mod resource;
mod store;
pub mod strategy;
pub mod telemetry;

#[doc(inline)]
pub use config::{
    DEFAULT_HOLD_DELAY, DEFAULT_ITEM_COUNT, DEFAULT_ITEM_DELAY, DEFAULT_TTL, StampedeOptions, StampedeOptionsBuilder,
};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use gate::SingleFlightGate;
#[doc(inline)]
pub use generator::{Generate, ResourceGenerator};
#[doc(inline)]
pub use lock_order::{CallerClass, LockPair};
#[doc(inline)]
pub use resource::{ITEM_NAMES, ResourceBatch, ResourceItem};
#[doc(inline)]
pub use store::{CacheEntry, CacheStore};
#[doc(inline)]
pub use strategy::{
    AcquisitionStrategy, DEFAULT_KEY, DeadlockProne, RacyCached, SingleFlightCached, Strategy, StrategyKind, Unprotected,
};
