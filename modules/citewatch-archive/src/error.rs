/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ArchiveError {
    /// Worth another attempt: timeouts, dropped connections, throttling and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for ArchiveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ArchiveError::Timeout(err.to_string())
        } else if err.is_decode() {
            ArchiveError::Parse(err.to_string())
        } else {
            ArchiveError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(err: serde_json::Error) -> Self {
        ArchiveError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_and_server_errors_are_transient() {
        let status = |status| ArchiveError::Status { status, url: "https://x".to_string() };
        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(404).is_transient());
        assert!(ArchiveError::Timeout("slow".to_string()).is_transient());
        assert!(!ArchiveError::Parse("bad json".to_string()).is_transient());
    }
}
