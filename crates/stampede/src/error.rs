// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for resource acquisition.

use std::{sync::Arc, time::Duration};

/// A specialized [`Result`] type for acquisition operations
/// that return a [`Error`][enum@Error] on failure.
pub type Result<T> = std::result::Result<T, Error>;

/// An error raised while acquiring a resource batch.
///
/// Generation failures and timeouts are deliberately distinct variants: a timeout is how a
/// liveness failure (such as a lock-order deadlock) becomes visible to a caller, and must
/// never be confused with the backing operation failing.
///
/// The error is cheap to clone so that a single generation failure can be handed to every
/// caller that waited on the same population cycle.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The backing operation could not produce a batch for `key`.
    #[error("generating resources for '{key}' failed: {source}")]
    Generation {
        /// Key whose population failed.
        key: String,
        /// Underlying cause, shared between all callers that observe it.
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// The caller-imposed deadline elapsed before the acquisition completed.
    #[error("acquiring '{key}' did not complete within {after:?}")]
    TimedOut {
        /// Key the caller was acquiring.
        key: String,
        /// The deadline that elapsed.
        after: Duration,
    },

    /// The supplied options are not usable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The strategy has been shut down and no longer serves acquisitions.
    #[error("the acquisition strategy has been shut down")]
    ShutDown,
}

impl Error {
    /// Creates a generation failure for `key` from any error-like cause.
    ///
    /// # Examples
    ///
    /// ```
    /// use stampede::Error;
    ///
    /// let error = Error::generation("resources", "backend unavailable");
    /// assert!(error.is_generation());
    /// ```
    pub fn generation(key: impl Into<String>, cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Generation {
            key: key.into(),
            source: Arc::from(cause.into()),
        }
    }

    pub(crate) fn timed_out(key: &str, after: Duration) -> Self {
        Self::TimedOut {
            key: key.to_owned(),
            after,
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Returns `true` if the backing operation failed.
    #[must_use]
    pub fn is_generation(&self) -> bool {
        matches!(self, Self::Generation { .. })
    }

    /// Returns `true` if the caller's deadline elapsed.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}
