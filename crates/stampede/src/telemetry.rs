// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Log events emitted by the acquisition strategies.
//!
//! Every event carries the fields a display sink needs: a severity, a `source` tag naming the
//! component that raised it and a `highlighted` flag marking the moments worth calling out
//! (a double-check hit, a lock that will never be granted). Events are plain `tracing` events,
//! so any subscriber or layer installed by the host can render or forward them.

use std::fmt;

/// Source tag of events raised by the resource generator.
pub const SOURCE_GENERATOR: &str = "generator";

/// Source tag of events raised by the cache store and cached strategies.
pub const SOURCE_CACHE: &str = "cache";

/// Source tag of events raised by the single-flight gate.
pub const SOURCE_GATE: &str = "gate";

/// Source tag of events raised by the lock-ordering demo.
pub const SOURCE_LOCKS: &str = "locks";

/// Source tag of events raised by the strategy layer.
pub const SOURCE_STRATEGY: &str = "strategy";

/// How important an event is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Fine-grained progress.
    Debug,
    /// Normal operation.
    Info,
    /// Something the caller should look at.
    Warning,
    /// An operation failed.
    Error,
}

impl From<Severity> for tracing::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Debug => Self::DEBUG,
            Severity::Info => Self::INFO,
            Severity::Warning => Self::WARN,
            Severity::Error => Self::ERROR,
        }
    }
}

pub(crate) fn emit(severity: Severity, source: &'static str, highlighted: bool, message: fmt::Arguments<'_>) {
    match severity {
        Severity::Debug => tracing::event!(tracing::Level::DEBUG, source, highlighted, "{message}"),
        Severity::Info => tracing::event!(tracing::Level::INFO, source, highlighted, "{message}"),
        Severity::Warning => tracing::event!(tracing::Level::WARN, source, highlighted, "{message}"),
        Severity::Error => tracing::event!(tracing::Level::ERROR, source, highlighted, "{message}"),
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[test]
    fn severity_maps_to_tracing_level() {
        assert_eq!(tracing::Level::from(Severity::Debug), tracing::Level::DEBUG);
        assert_eq!(tracing::Level::from(Severity::Warning), tracing::Level::WARN);
        assert!(Severity::Error > Severity::Info);
    }

    #[test]
    #[traced_test]
    fn emit_records_source_and_highlight() {
        emit(Severity::Warning, SOURCE_GATE, true, format_args!("waiting for {}", "k1"));

        assert!(logs_contain("waiting for k1"));
        assert!(logs_contain("source=\"gate\""));
        assert!(logs_contain("highlighted=true"));
    }
}
