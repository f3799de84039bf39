// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Keyed storage of generated batches with lazy expiry.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::{
    ResourceBatch,
    telemetry::{self, SOURCE_CACHE, Severity},
};

/// A cached batch together with its lifetime.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    key: String,
    value: ResourceBatch,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn new(key: &str, value: ResourceBatch, ttl: Duration) -> Self {
        Self {
            key: key.to_owned(),
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    /// The key this entry is stored under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The cached batch.
    #[must_use]
    pub fn value(&self) -> &ResourceBatch {
        &self.value
    }

    /// When the entry was stored.
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When the entry stops being served, or `None` if that instant is not representable.
    #[must_use]
    pub fn expires_at(&self) -> Option<Instant> {
        self.created_at.checked_add(self.ttl)
    }

    /// Returns `true` if the entry is no longer served at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.ttl
    }

    /// Consumes the entry and returns the batch.
    #[must_use]
    pub fn into_value(self) -> ResourceBatch {
        self.value
    }
}

/// Holds at most one batch per key, each with an absolute expiry.
///
/// Individual operations are atomic, but a read followed by a write is not: two callers that
/// both miss and then both [`set`](Self::set) will each store their own batch, and the last
/// write wins. Arbitrating that race is the job of the strategy built on top of the store.
///
/// Expiry is evaluated lazily on read; there is no background sweep. Reads never write: an
/// expired entry stays in place until the next [`set`](Self::set) for its key replaces it.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl CacheStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the batch cached under `key`, or `None` if absent or expired.
    #[must_use]
    pub fn try_get(&self, key: &str) -> Option<ResourceBatch> {
        self.entry(key).map(CacheEntry::into_value)
    }

    /// Returns the live entry under `key` including its metadata.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        let now = Instant::now();

        let entry = self.entries.get(key)?;
        if entry.is_expired_at(now) {
            telemetry::emit(Severity::Debug, SOURCE_CACHE, false, format_args!("entry for '{key}' expired"));
            return None;
        }

        Some(entry.clone())
    }

    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set(&self, key: &str, value: ResourceBatch, ttl: Duration) {
        self.entries.insert(key.to_owned(), CacheEntry::new(key, value, ttl));
        telemetry::emit(Severity::Debug, SOURCE_CACHE, false, format_args!("stored '{key}' for {ttl:?}"));
    }

    /// Removes the entry under `key`, returning `true` if there was one.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Removes the entry under `key` only if it still holds `batch`.
    pub(crate) fn remove_batch(&self, key: &str, batch: &ResourceBatch) -> bool {
        self.entries.remove_if(key, |_, entry| entry.value.same_batch(batch)).is_some()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet replaced.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
