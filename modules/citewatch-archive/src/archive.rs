use async_trait::async_trait;
use chrono::{DateTime, Utc};
use citewatch_common::Snapshot;
use uuid::Uuid;

/// One archived copy of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedCopy {
    pub archive_url: String,
    pub captured_at: Option<DateTime<Utc>>,
}

impl ArchivedCopy {
    pub fn into_snapshot(self, citation_id: Uuid) -> Snapshot {
        Snapshot {
            citation_id,
            archive_url: self.archive_url,
            captured_at: self.captured_at,
        }
    }
}

/// Web archive service. Every failure is reported as absence; implementations log
/// the cause themselves.
#[async_trait]
pub trait SnapshotArchive: Send + Sync {
    /// Most recent usable archived copy of `url`, if the archive has one.
    async fn find_existing(&self, url: &str) -> Option<ArchivedCopy>;

    /// Ask the archive to capture `url` now.
    async fn request_capture(&self, url: &str) -> Option<ArchivedCopy>;

    /// Raw HTML of an archived copy.
    async fn fetch_content(&self, archive_url: &str) -> Option<String>;
}
