// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-key single-flight population of a [`CacheStore`].
//!
//! The gate follows a strict check → lock → re-check → act → unlock sequence:
//!
//! 1. Read the store without taking any lock. A hit returns immediately.
//! 2. On a miss, obtain the key's token (creating it on first use) and wait for it.
//! 3. With the token held, read the store again. If another caller populated the key while
//!    this one was waiting, return that batch without generating.
//! 4. Otherwise run the population function once, store its result and release the token.
//!
//! Tokens are per key, so populating one key never delays another. A token is an async mutex
//! guard, which is released on every exit path: success, failure, panic, or the caller's
//! future being dropped because its deadline elapsed.
//!
//! [`reset`](SingleFlightGate::reset) and [`close`](SingleFlightGate::close) never take a token
//! away from a caller that holds or waits on it. A population that started before either call
//! still returns its batch to its callers but does not write it to the store.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::{
    CacheStore, Error, ResourceBatch, Result,
    telemetry::{self, SOURCE_GATE, Severity},
};

/// Outcome bookkeeping for one key, guarded by the token.
#[derive(Debug, Default)]
struct Flight {
    /// The most recent failed attempt and the attempt number it ended.
    last_failure: Option<(u64, Error)>,
}

/// The exclusive-access token of a single key.
#[derive(Debug, Default)]
struct Token {
    /// Completed population attempts. Written only while `flight` is locked, read before
    /// locking so a waiter can tell whether an attempt finished while it queued.
    attempts: AtomicU64,
    flight: Mutex<Flight>,
}

/// Guarantees at most one concurrent population per key.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use stampede::{Generate, ResourceGenerator, SingleFlightGate, StampedeOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> stampede::Result<()> {
/// let options = StampedeOptions::builder().item_delay(Duration::from_millis(1)).build()?;
/// let generator = ResourceGenerator::new(&options);
/// let gate = SingleFlightGate::new(options.ttl());
///
/// let first = gate.run_exclusive("resources", || generator.generate("resources")).await?;
/// let second = gate.run_exclusive("resources", || generator.generate("resources")).await?;
///
/// assert!(first.same_batch(&second));
/// assert_eq!(generator.generated_batches(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SingleFlightGate {
    store: CacheStore,
    tokens: DashMap<String, Arc<Token>>,
    ttl: Duration,
    /// Bumped by every reset; a population only publishes into the epoch it started in.
    epoch: AtomicU64,
    closed: AtomicBool,
}

impl SingleFlightGate {
    /// Creates a gate over an empty store; populated batches live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: CacheStore::new(),
            tokens: DashMap::new(),
            ttl,
            epoch: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// The store this gate populates.
    #[must_use]
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Number of keys that have a token.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Returns the batch cached under `key`, running `populate` at most once across all
    /// concurrent callers if it is missing.
    ///
    /// Callers that queued behind a failed attempt receive that attempt's error instead of
    /// retrying it themselves; the next caller to arrive afterwards starts a fresh attempt.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `populate`, whether this caller ran it or waited on it, or
    /// [`Error::ShutDown`] once the gate is closed.
    pub async fn run_exclusive<F, Fut>(&self, key: &str, populate: F) -> Result<ResourceBatch>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResourceBatch>>,
    {
        self.ensure_open()?;

        if let Some(batch) = self.store.try_get(key) {
            return Ok(batch);
        }

        let token = self.token(key);
        let observed = token.attempts.load(Ordering::Acquire);

        telemetry::emit(Severity::Debug, SOURCE_GATE, false, format_args!("miss on '{key}', waiting for token"));
        let mut flight = token.flight.lock().await;
        if self.is_closed() {
            drop(flight);
            self.release(key, token);
            return Err(Error::ShutDown);
        }

        if let Some(batch) = self.store.try_get(key) {
            telemetry::emit(
                Severity::Info,
                SOURCE_GATE,
                true,
                format_args!("'{key}' was populated while waiting, skipping generation"),
            );
            return Ok(batch);
        }

        let attempts = token.attempts.load(Ordering::Acquire);
        if attempts != observed
            && let Some((failed_attempt, error)) = &flight.last_failure
            && *failed_attempt == attempts
        {
            telemetry::emit(
                Severity::Warning,
                SOURCE_GATE,
                false,
                format_args!("sharing failed attempt #{attempts} for '{key}'"),
            );
            return Err(error.clone());
        }

        telemetry::emit(Severity::Info, SOURCE_GATE, true, format_args!("token held for '{key}', generating"));
        let epoch = self.epoch.load(Ordering::SeqCst);
        let outcome = populate().await;
        let attempt = attempts + 1;

        match &outcome {
            Ok(batch) => {
                self.publish(key, batch, epoch);
                flight.last_failure = None;
            }
            Err(error) => {
                telemetry::emit(Severity::Error, SOURCE_GATE, false, format_args!("population of '{key}' failed: {error}"));
                flight.last_failure = Some((attempt, error.clone()));
            }
        }

        token.attempts.store(attempt, Ordering::Release);
        drop(flight);
        self.release(key, token);

        outcome
    }

    /// Invalidates the batch cached under `key`; the next call repopulates it.
    pub fn clear(&self, key: &str) -> bool {
        self.store.remove(key)
    }

    /// Drops every cached batch and every token nobody is holding or waiting on.
    ///
    /// Tokens still in use stay in the map, so a caller arriving after the reset queues behind
    /// the current holder instead of generating alongside it.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.store.clear();
        self.tokens.retain(|_, token| Arc::strong_count(token) > 1);
    }

    /// Resets the gate and refuses every later call with [`Error::ShutDown`].
    ///
    /// Callers queued on a token when the gate closes are refused as soon as they get it.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.reset();
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::ShutDown)
        } else {
            Ok(())
        }
    }

    fn is_stale(&self, epoch: u64) -> bool {
        self.is_closed() || self.epoch.load(Ordering::SeqCst) != epoch
    }

    fn publish(&self, key: &str, batch: &ResourceBatch, epoch: u64) {
        if !self.is_stale(epoch) {
            self.store.set(key, batch.clone(), self.ttl);

            // A reset that bumped the epoch before this write may have cleared the store first.
            if !self.is_stale(epoch) {
                return;
            }
            self.store.remove_batch(key, batch);
        }

        telemetry::emit(
            Severity::Debug,
            SOURCE_GATE,
            false,
            format_args!("'{key}' was reset during generation, batch not cached"),
        );
    }

    /// Gives up this caller's handle; once closed, the last user of a token removes it.
    fn release(&self, key: &str, token: Arc<Token>) {
        drop(token);
        if self.is_closed() {
            self.tokens.remove_if(key, |_, token| Arc::strong_count(token) == 1);
        }
    }

    fn token(&self, key: &str) -> Arc<Token> {
        if let Some(token) = self.tokens.get(key) {
            return Arc::clone(token.value());
        }

        Arc::clone(self.tokens.entry(key.to_owned()).or_default().value())
    }
}
