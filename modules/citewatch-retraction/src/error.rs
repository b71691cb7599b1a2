use citewatch_common::StoreError;

pub type Result<T> = std::result::Result<T, RetractionError>;

#[derive(Debug, thiserror::Error)]
pub enum RetractionError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Registry parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RetractionError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Http(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The store behind the cache cannot be reached at all.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_unavailable())
    }
}

impl From<reqwest::Error> for RetractionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RetractionError::Timeout(err.to_string())
        } else if err.is_decode() {
            RetractionError::Malformed(err.to_string())
        } else {
            RetractionError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RetractionError {
    fn from(err: serde_json::Error) -> Self {
        RetractionError::Malformed(err.to_string())
    }
}
