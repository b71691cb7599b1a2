pub mod config;
pub mod doi;
pub mod error;
pub mod pacing;
pub mod repository;
pub mod retry;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{
    Config, DriftConfig, HttpConfig, OracleConfig, RemoteApiConfig, ResolverConfig, RunOptions,
    RunParams,
};
pub use doi::Doi;
pub use error::{ConfigError, StoreError};
pub use pacing::RateGate;
pub use repository::{CitationRepository, FindingRepository, RetractionCache};
pub use retry::RetryPolicy;
pub use types::*;
