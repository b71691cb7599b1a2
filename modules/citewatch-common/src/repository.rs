// Persistence seams consumed by the verification pipeline. Production wires in the
// Postgres stores from citewatch-store; tests use in-memory doubles.

use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::doi::Doi;
use crate::error::StoreError;
use crate::types::{Citation, CitationFilter, NewFinding, RetractionRecord, Snapshot};

#[async_trait]
pub trait CitationRepository: Send + Sync {
    /// Up to `limit` citations matching `filter` whose last check is older than
    /// `staleness` (or that were never checked), never-checked first, then oldest first.
    async fn citations_due(
        &self,
        filter: CitationFilter,
        staleness: Duration,
        limit: u32,
    ) -> Result<Vec<Citation>, StoreError>;

    /// Every citation carrying a DOI, regardless of when it was last checked.
    async fn citations_with_doi(&self) -> Result<Vec<Citation>, StoreError>;

    /// The snapshot currently stored for a citation, read fresh from the store.
    async fn snapshot_for(&self, citation_id: Uuid) -> Result<Option<Snapshot>, StoreError>;

    /// Record the reference snapshot for a citation.
    async fn attach_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Stamp the citation as checked now.
    async fn mark_checked(&self, citation_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait FindingRepository: Send + Sync {
    /// Persist a finding with `pending` reporting status. Returns its id.
    async fn insert(&self, finding: &NewFinding) -> Result<Uuid, StoreError>;
}

/// Local retraction cache, bulk-synced from the curated registry.
#[async_trait]
pub trait RetractionCache: Send + Sync {
    async fn lookup(&self, doi: &Doi) -> Result<Option<RetractionRecord>, StoreError>;

    async fn upsert(&self, record: &RetractionRecord) -> Result<(), StoreError>;
}
