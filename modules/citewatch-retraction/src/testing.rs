// Test doubles for the retraction cache and the remote sources.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use citewatch_common::{Doi, RetractionCache, RetractionRecord, StoreError};

use crate::error::{Result, RetractionError};
use crate::sources::{BibliographicIndex, IndexRecord, PublisherMetadata, WorkRecord};

#[derive(Default)]
pub struct InMemoryRetractionCache {
    records: Mutex<HashMap<String, RetractionRecord>>,
    lookups: AtomicUsize,
    unavailable: bool,
    failing_lookups: bool,
    failing_upserts: bool,
}

impl InMemoryRetractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, record: RetractionRecord) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(record.doi.as_str().to_string(), record);
        self
    }

    /// Every call fails as if the store could not be reached.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Lookups fail with a statement error.
    pub fn failing_lookups(mut self) -> Self {
        self.failing_lookups = true;
        self
    }

    /// Lookups work, upserts fail with a statement error.
    pub fn failing_upserts(mut self) -> Self {
        self.failing_upserts = true;
        self
    }

    pub fn records(&self) -> Vec<RetractionRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RetractionCache for InMemoryRetractionCache {
    async fn lookup(&self, doi: &Doi) -> std::result::Result<Option<RetractionRecord>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(StoreError::Unavailable("pool closed".to_string()));
        }
        if self.failing_lookups {
            return Err(StoreError::Database("relation does not exist".to_string()));
        }
        Ok(self.records.lock().unwrap().get(doi.as_str()).cloned())
    }

    async fn upsert(&self, record: &RetractionRecord) -> std::result::Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("pool closed".to_string()));
        }
        if self.failing_upserts {
            return Err(StoreError::Database("constraint violation".to_string()));
        }
        self.records
            .lock()
            .unwrap()
            .insert(record.doi.as_str().to_string(), record.clone());
        Ok(())
    }
}

enum Canned<T> {
    Found(T),
    Missing,
    Failing,
}

impl<T: Clone> Canned<T> {
    fn answer(&self) -> Result<Option<T>> {
        match self {
            Canned::Found(value) => Ok(Some(value.clone())),
            Canned::Missing => Ok(None),
            Canned::Failing => Err(RetractionError::Http("connection reset".to_string())),
        }
    }
}

pub struct StubIndex {
    canned: Canned<IndexRecord>,
    calls: AtomicUsize,
}

impl StubIndex {
    pub fn returning(record: IndexRecord) -> Self {
        Self::with(Canned::Found(record))
    }

    pub fn empty() -> Self {
        Self::with(Canned::Missing)
    }

    pub fn failing() -> Self {
        Self::with(Canned::Failing)
    }

    fn with(canned: Canned<IndexRecord>) -> Self {
        Self {
            canned,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BibliographicIndex for StubIndex {
    async fn lookup_by_doi(&self, _doi: &Doi) -> Result<Option<IndexRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.canned.answer()
    }
}

pub struct StubPublisher {
    canned: Canned<WorkRecord>,
    calls: AtomicUsize,
}

impl StubPublisher {
    pub fn returning(work: WorkRecord) -> Self {
        Self::with(Canned::Found(work))
    }

    pub fn empty() -> Self {
        Self::with(Canned::Missing)
    }

    pub fn failing() -> Self {
        Self::with(Canned::Failing)
    }

    fn with(canned: Canned<WorkRecord>) -> Self {
        Self {
            canned,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PublisherMetadata for StubPublisher {
    async fn lookup_by_doi(&self, _doi: &Doi) -> Result<Option<WorkRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.canned.answer()
    }
}
