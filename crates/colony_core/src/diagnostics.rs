//! Batched diagnostics.
//!
//! Problems that could repeat once per unit or once per cell are counted per
//! cause during a tick and emitted as one log line per cause on flush.
//! Configuration inconsistencies are reported once and then suppressed until
//! the condition clears.

use std::collections::{BTreeMap, BTreeSet};

/// Distinct causes of batched diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticCause {
    /// A terrain cell carried a classification code the grid does not know.
    UnknownTerrain,
    /// A unit record carried a state its role does not recognize.
    UnrecognizedState,
    /// A production attempt failed after admission.
    ProductionFailed,
    /// A unit's automaton hit the per-tick transition bound.
    TransitionBound,
    /// A unit record referenced a unit the world no longer has.
    UnitVanished,
}

impl DiagnosticCause {
    /// Human-readable description.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::UnknownTerrain => "unknown terrain classification treated as impassable",
            Self::UnrecognizedState => "unrecognized unit state normalized",
            Self::ProductionFailed => "production failed after admission",
            Self::TransitionBound => "unit hit the per-tick transition bound",
            Self::UnitVanished => "unit record pruned after the unit disappeared",
        }
    }
}

/// Aggregate for one cause within a tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CauseTally {
    /// Number of occurrences.
    pub count: u32,
    /// First few subjects, for context.
    pub examples: Vec<String>,
}

/// Maximum number of example subjects kept per cause.
const MAX_EXAMPLES: usize = 3;

/// Per-tick diagnostic batcher.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pending: BTreeMap<DiagnosticCause, CauseTally>,
    reported_once: BTreeSet<String>,
}

impl Diagnostics {
    /// Create an empty batcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of a cause.
    pub fn record(&mut self, cause: DiagnosticCause, subject: impl Into<String>) {
        self.record_many(cause, 1, subject);
    }

    /// Count several occurrences of a cause at once.
    pub fn record_many(&mut self, cause: DiagnosticCause, count: u32, subject: impl Into<String>) {
        if count == 0 {
            return;
        }
        let tally = self.pending.entry(cause).or_default();
        tally.count += count;
        if tally.examples.len() < MAX_EXAMPLES {
            tally.examples.push(subject.into());
        }
    }

    /// Tally for a cause recorded since the last flush.
    #[must_use]
    pub fn pending(&self, cause: DiagnosticCause) -> Option<&CauseTally> {
        self.pending.get(&cause)
    }

    /// Emit one warning per cause and reset the batch.
    ///
    /// Returns the number of distinct causes emitted.
    pub fn flush(&mut self, tick: u64) -> usize {
        let emitted = self.pending.len();
        for (cause, tally) in std::mem::take(&mut self.pending) {
            tracing::warn!(
                tick,
                count = tally.count,
                examples = ?tally.examples,
                "{}",
                cause.describe()
            );
        }
        emitted
    }

    /// Warn about `key` unless it was already reported.
    ///
    /// Returns `true` when the warning was emitted.
    pub fn warn_once(&mut self, key: impl Into<String>, message: &str) -> bool {
        let key = key.into();
        if self.reported_once.contains(&key) {
            return false;
        }
        tracing::warn!(key = %key, "{message}");
        self.reported_once.insert(key);
        true
    }

    /// Forget a once-only report so it fires again if the problem returns.
    pub fn clear_once(&mut self, key: &str) -> bool {
        self.reported_once.remove(key)
    }

    /// Whether `key` is currently suppressed.
    #[must_use]
    pub fn was_reported(&self, key: &str) -> bool {
        self.reported_once.contains(key)
    }
}
