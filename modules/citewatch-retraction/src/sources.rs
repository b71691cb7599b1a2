// Remote bibliographic sources consulted after the local cache.

use async_trait::async_trait;
use chrono::NaiveDate;
use citewatch_common::Doi;

use crate::error::Result;

/// What a bibliographic index knows about a DOI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexRecord {
    pub title: Option<String>,
    pub publication_types: Vec<String>,
}

/// A typed relation between a work and a later update (retraction, correction, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRelation {
    pub relation_type: String,
    pub date: Option<NaiveDate>,
}

/// Publisher-deposited metadata for a DOI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkRecord {
    pub title: Option<String>,
    pub work_type: Option<String>,
    pub updates: Vec<UpdateRelation>,
}

#[async_trait]
pub trait BibliographicIndex: Send + Sync {
    /// `Ok(None)` when the index has no entry for the DOI.
    async fn lookup_by_doi(&self, doi: &Doi) -> Result<Option<IndexRecord>>;
}

#[async_trait]
pub trait PublisherMetadata: Send + Sync {
    /// `Ok(None)` when the DOI is unknown to the registrar.
    async fn lookup_by_doi(&self, doi: &Doi) -> Result<Option<WorkRecord>>;
}
