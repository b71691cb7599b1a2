use citewatch_archive::ArchiveError;
use citewatch_common::StoreError;
use citewatch_retraction::RetractionError;

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Retraction(#[from] RetractionError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Comparison task failed: {0}")]
    Comparison(#[from] tokio::task::JoinError),

    #[error("{0} detector does not support this operation")]
    Unsupported(&'static str),
}

impl DetectorError {
    /// The store cannot be reached; the run must stop.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Store(e) => e.is_unavailable(),
            Self::Retraction(e) => e.is_store_unavailable(),
            _ => false,
        }
    }
}
