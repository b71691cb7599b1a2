pub mod allowance;
pub mod checks;
pub mod detector;
pub mod error;
pub mod llm;
pub mod oracle;
pub mod supervisor;
pub mod types;

#[cfg(test)]
mod testing;

pub use detector::Detector;
pub use error::DetectorError;
pub use oracle::{ReviewContext, TriageBackend, TriageOracle, Verdict};
pub use supervisor::Supervisor;
pub use types::{DriftMeasurement, RunStats, Signal};
