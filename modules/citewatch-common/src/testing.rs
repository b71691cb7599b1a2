// In-memory repositories for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::repository::{CitationRepository, FindingRepository};
use crate::types::{Citation, CitationFilter, NewFinding, Snapshot, SourceMetadata};

/// A never-checked citation with the given URL and DOI.
pub fn sample_citation(url: Option<&str>, doi: Option<&str>) -> Citation {
    Citation {
        id: Uuid::new_v4(),
        article_title: "Photosynthesis".to_string(),
        article_language: "en".to_string(),
        ordinal: 1,
        source_url: url.map(str::to_string),
        source_doi: doi.map(str::to_string),
        source: SourceMetadata {
            title: Some("Light reactions revisited".to_string()),
            ..SourceMetadata::default()
        },
        snapshot_url: None,
        snapshot_date: None,
        last_checked: None,
        created_at: Utc::now(),
    }
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

#[derive(Default)]
pub struct InMemoryCitationRepository {
    citations: Mutex<Vec<Citation>>,
    stamped: Mutex<Vec<Uuid>>,
    unavailable: AtomicBool,
}

impl InMemoryCitationRepository {
    pub fn new(citations: Vec<Citation>) -> Self {
        Self {
            citations: Mutex::new(citations),
            ..Self::default()
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Citation> {
        self.citations.lock().unwrap().iter().find(|c| c.id == id).cloned()
    }

    /// Ids passed to `mark_checked`, in call order.
    pub fn stamped(&self) -> Vec<Uuid> {
        self.stamped.lock().unwrap().clone()
    }

    /// Make every subsequent call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl CitationRepository for InMemoryCitationRepository {
    async fn citations_due(
        &self,
        filter: CitationFilter,
        staleness: Duration,
        limit: u32,
    ) -> Result<Vec<Citation>, StoreError> {
        self.check_available()?;
        let cutoff = Utc::now() - staleness;
        let mut due: Vec<Citation> = self
            .citations
            .lock()
            .unwrap()
            .iter()
            .filter(|c| filter.matches(c))
            .filter(|c| c.last_checked.is_none_or(|at| at < cutoff))
            .cloned()
            .collect();
        due.sort_by_key(|c| (c.last_checked.is_some(), c.last_checked, c.created_at));
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn citations_with_doi(&self) -> Result<Vec<Citation>, StoreError> {
        self.check_available()?;
        Ok(self
            .citations
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.source_doi.is_some())
            .cloned()
            .collect())
    }

    async fn snapshot_for(&self, citation_id: Uuid) -> Result<Option<Snapshot>, StoreError> {
        self.check_available()?;
        Ok(self.get(citation_id).and_then(|c| c.snapshot()))
    }

    async fn attach_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.check_available()?;
        let mut citations = self.citations.lock().unwrap();
        if let Some(c) = citations.iter_mut().find(|c| c.id == snapshot.citation_id) {
            c.snapshot_url = Some(snapshot.archive_url.clone());
            c.snapshot_date = snapshot.captured_at;
        }
        Ok(())
    }

    async fn mark_checked(&self, citation_id: Uuid) -> Result<(), StoreError> {
        self.check_available()?;
        let mut citations = self.citations.lock().unwrap();
        if let Some(c) = citations.iter_mut().find(|c| c.id == citation_id) {
            c.last_checked = Some(Utc::now());
        }
        self.stamped.lock().unwrap().push(citation_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryFindingRepository {
    findings: Mutex<Vec<NewFinding>>,
    unavailable: AtomicBool,
}

impl InMemoryFindingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn findings(&self) -> Vec<NewFinding> {
        self.findings.lock().unwrap().clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl FindingRepository for InMemoryFindingRepository {
    async fn insert(&self, finding: &NewFinding) -> Result<Uuid, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.findings.lock().unwrap().push(finding.clone());
        Ok(Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn due_citations_put_never_checked_first() {
        let mut old = sample_citation(Some("https://a.org/1"), None);
        old.last_checked = Some(Utc::now() - Duration::days(30));
        let mut older = sample_citation(Some("https://a.org/2"), None);
        older.last_checked = Some(Utc::now() - Duration::days(60));
        let fresh_never = sample_citation(Some("https://a.org/3"), None);
        let mut recent = sample_citation(Some("https://a.org/4"), None);
        recent.last_checked = Some(Utc::now() - Duration::days(1));
        let no_url = sample_citation(None, Some("10.1234/x"));

        let ids = (fresh_never.id, older.id, old.id);
        let repo = InMemoryCitationRepository::new(vec![old, older, fresh_never, recent, no_url]);
        let due = repo
            .citations_due(CitationFilter::HasUrl, Duration::days(7), 10)
            .await
            .unwrap();

        let order: Vec<Uuid> = due.iter().map(|c| c.id).collect();
        assert_eq!(order, vec![ids.0, ids.1, ids.2]);
    }

    #[tokio::test]
    async fn due_citations_respect_limit() {
        let repo = InMemoryCitationRepository::new(
            (0..5).map(|i| sample_citation(Some(&format!("https://a.org/{i}")), None)).collect(),
        );
        let due = repo.citations_due(CitationFilter::HasUrl, Duration::days(7), 2).await.unwrap();
        assert_eq!(due.len(), 2);
    }
}
