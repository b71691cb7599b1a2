use std::fmt;

use citewatch_common::{ProblemType, Severity};

/// A problem reported by a detector, before triage.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub problem_type: ProblemType,
    pub severity: Severity,
    pub details: String,
}

/// Result of comparing a source against its reference snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftMeasurement {
    pub similarity: f64,
    pub threshold: f64,
}

impl DriftMeasurement {
    pub fn drifted(&self) -> bool {
        self.similarity < self.threshold
    }
}

/// Stats from one orchestrator run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Citations whose check completed cleanly.
    pub checked: u64,
    /// Findings persisted.
    pub found: u64,
    /// Signals the oracle turned down.
    pub rejected: u64,
    /// Citations whose check errored; left unstamped.
    pub failed: u64,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked={} found={} rejected={} failed={}",
            self.checked, self.found, self.rejected, self.failed,
        )
    }
}
