// Retraction resolution: local cache first, then the bibliographic index, then
// publisher metadata. The first positive answer wins.

use std::sync::Arc;

use citewatch_common::{Doi, ResolverConfig, RetractionCache, RetractionRecord, RetractionSource};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::sources::{BibliographicIndex, IndexRecord, PublisherMetadata, WorkRecord};

const RETRACTION: &str = "retraction";
const RETRACTED_PUBLICATION: &str = "retracted publication";

pub struct RetractionResolver {
    cache: Arc<dyn RetractionCache>,
    index: Option<Arc<dyn BibliographicIndex>>,
    publisher: Option<Arc<dyn PublisherMetadata>>,
    config: ResolverConfig,
}

impl RetractionResolver {
    pub fn new(cache: Arc<dyn RetractionCache>, config: ResolverConfig) -> Self {
        Self {
            cache,
            index: None,
            publisher: None,
            config,
        }
    }

    pub fn with_bibliographic_index(mut self, index: Arc<dyn BibliographicIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_publisher_metadata(mut self, publisher: Arc<dyn PublisherMetadata>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Resolve `doi` against the chain. Remote sources are consulted only when
    /// `remote_lookups` is set; their failures count as "no answer" and the chain
    /// moves on. Cache failures are returned.
    pub async fn resolve(&self, doi: &Doi, remote_lookups: bool) -> Result<Option<RetractionRecord>> {
        if let Some(hit) = self.cache.lookup(doi).await? {
            debug!(doi = %doi, "Retraction cache hit");
            return Ok(Some(hit));
        }
        if !remote_lookups {
            return Ok(None);
        }

        if let Some(index) = &self.index {
            match index.lookup_by_doi(doi).await {
                Ok(Some(entry)) => {
                    if let Some(record) = retraction_from_index(doi, &entry) {
                        self.write_back(&record).await;
                        return Ok(Some(record));
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(doi = %doi, error = %e, "Bibliographic index lookup failed"),
            }
        }

        if let Some(publisher) = &self.publisher {
            match publisher.lookup_by_doi(doi).await {
                Ok(Some(work)) => {
                    if let Some(record) = retraction_from_work(doi, &work) {
                        self.write_back(&record).await;
                        return Ok(Some(record));
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(doi = %doi, error = %e, "Publisher metadata lookup failed"),
            }
        }

        Ok(None)
    }

    async fn write_back(&self, record: &RetractionRecord) {
        if !self.config.write_back {
            return;
        }
        match self.cache.upsert(record).await {
            Ok(()) => info!(doi = %record.doi, source = %record.source, "Cached remote retraction"),
            Err(e) => warn!(doi = %record.doi, error = %e, "Failed to cache remote retraction"),
        }
    }
}

fn mentions_retraction(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower.contains(RETRACTION) || lower.contains(RETRACTED_PUBLICATION)
}

/// An index entry signals a retraction through its publication types. The index
/// carries no usable retraction date.
pub fn retraction_from_index(doi: &Doi, entry: &IndexRecord) -> Option<RetractionRecord> {
    entry
        .publication_types
        .iter()
        .any(|t| mentions_retraction(t))
        .then(|| RetractionRecord {
            doi: doi.clone(),
            paper_title: entry.title.clone(),
            retraction_date: None,
            reason: Some("Retraction notice found in bibliographic index".to_string()),
            source: RetractionSource::BibliographicIndex,
        })
}

/// Publisher metadata signals a retraction through an update relation, or by the
/// work itself being a retraction notice.
pub fn retraction_from_work(doi: &Doi, work: &WorkRecord) -> Option<RetractionRecord> {
    let record = |reason: String, date| RetractionRecord {
        doi: doi.clone(),
        paper_title: work.title.clone(),
        retraction_date: date,
        reason: Some(reason),
        source: RetractionSource::PublisherMetadata,
    };

    if let Some(update) = work.updates.iter().find(|u| mentions_retraction(&u.relation_type)) {
        let reason = format!(
            "Retraction notice in publisher metadata (type: {})",
            update.relation_type.to_lowercase()
        );
        return Some(record(reason, update.date));
    }
    work.work_type
        .as_deref()
        .filter(|t| mentions_retraction(t))
        .map(|_| record("Retraction notice identified in publisher metadata".to_string(), None))
}

/// Finding details for a resolved retraction.
pub fn describe_retraction(record: &RetractionRecord) -> String {
    let mut details = format!("Paper with DOI {} was retracted", record.doi);
    if let Some(date) = record.retraction_date {
        details.push_str(&format!(" on {date}"));
    }
    if let Some(reason) = record.reason.as_deref().filter(|r| !r.is_empty()) {
        details.push_str(&format!(". Reason: {reason}"));
    }
    if let Some(title) = record.paper_title.as_deref().filter(|t| !t.is_empty()) {
        details.push_str(&format!(" Paper: {title}"));
    }
    details.push_str(&format!(" (Source: {})", record.source));
    details
}
