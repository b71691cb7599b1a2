// Content drift: compare the live source against its archived reference copy.

use std::sync::Arc;

use citewatch_archive::{extract_main_text, similarity, HttpTransport, SnapshotArchive};
use citewatch_common::{Citation, CitationRepository, DriftConfig, ProblemType, Severity, Snapshot};
use tracing::{debug, info};

use crate::error::DetectorError;
use crate::types::{DriftMeasurement, Signal};

pub struct DriftDetector {
    transport: Arc<dyn HttpTransport>,
    archive: Arc<dyn SnapshotArchive>,
    citations: Arc<dyn CitationRepository>,
    config: DriftConfig,
}

impl DriftDetector {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        archive: Arc<dyn SnapshotArchive>,
        citations: Arc<dyn CitationRepository>,
        config: DriftConfig,
    ) -> Self {
        Self {
            transport,
            archive,
            citations,
            config,
        }
    }

    /// The citation's reference snapshot, creating and persisting one when missing.
    /// Reuses an existing archive copy before asking for a new capture.
    /// Concurrent writers for the same citation may each create one.
    pub async fn ensure_snapshot(&self, citation: &Citation) -> Result<Option<Snapshot>, DetectorError> {
        if let Some(snapshot) = citation.snapshot() {
            return Ok(Some(snapshot));
        }
        if let Some(snapshot) = self.citations.snapshot_for(citation.id).await? {
            return Ok(Some(snapshot));
        }
        let Some(url) = citation.source_url.as_deref() else {
            return Ok(None);
        };

        let copy = match self.archive.find_existing(url).await {
            Some(copy) => Some(copy),
            None => self.archive.request_capture(url).await,
        };
        let Some(copy) = copy else {
            debug!(citation_id = %citation.id, url, "No snapshot obtainable");
            return Ok(None);
        };

        let snapshot = copy.into_snapshot(citation.id);
        self.citations.attach_snapshot(&snapshot).await?;
        info!(citation_id = %citation.id, archive_url = snapshot.archive_url.as_str(), "Attached snapshot");
        Ok(Some(snapshot))
    }

    /// Similarity between the live page and its snapshot, or `None` when either
    /// side cannot be obtained or has no extractable text.
    pub async fn measure(&self, citation: &Citation) -> Result<Option<DriftMeasurement>, DetectorError> {
        Ok(self.compare(citation).await?.map(|(measurement, _)| measurement))
    }

    pub async fn check(&self, citation: &Citation) -> Result<Option<Signal>, DetectorError> {
        let Some((m, snapshot)) = self.compare(citation).await? else {
            return Ok(None);
        };
        debug!(citation_id = %citation.id, similarity = m.similarity, "Drift measured");
        if !m.drifted() {
            return Ok(None);
        }

        let severity = if m.similarity <= self.config.high_severity_ceiling {
            Severity::High
        } else {
            Severity::Medium
        };
        let details = format!(
            "Source content has changed significantly. Similarity: {:.1}% (threshold: {:.1}%). \
             Content changed by approximately {:.1}%. Original snapshot: {}",
            m.similarity * 100.0,
            m.threshold * 100.0,
            (1.0 - m.similarity) * 100.0,
            snapshot.archive_url,
        );
        Ok(Some(Signal {
            problem_type: ProblemType::SourceChange,
            severity,
            details,
        }))
    }

    async fn compare(&self, citation: &Citation) -> Result<Option<(DriftMeasurement, Snapshot)>, DetectorError> {
        let Some(url) = citation.source_url.as_deref() else {
            return Ok(None);
        };
        let Some(snapshot) = self.ensure_snapshot(citation).await? else {
            return Ok(None);
        };

        let current_html = match self.transport.get(url).await {
            Ok(resp) if resp.is_success() => resp.body,
            Ok(resp) => {
                debug!(url, status = resp.status, "Source not retrievable, skipping drift check");
                return Ok(None);
            }
            Err(e) => {
                debug!(url, error = %e, "Source fetch failed, skipping drift check");
                return Ok(None);
            }
        };
        let Some(snapshot_html) = self.archive.fetch_content(&snapshot.archive_url).await else {
            return Ok(None);
        };

        let current = self.comparable_text(&current_html);
        let archived = self.comparable_text(&snapshot_html);
        if current.is_empty() || archived.is_empty() {
            debug!(url, "No extractable text, skipping drift check");
            return Ok(None);
        }

        let score = tokio::task::spawn_blocking(move || similarity(&current, &archived)).await?;
        let measurement = DriftMeasurement {
            similarity: score,
            threshold: self.config.similarity_threshold,
        };
        Ok(Some((measurement, snapshot)))
    }

    fn comparable_text(&self, html: &str) -> String {
        extract_main_text(html)
            .chars()
            .take(self.config.max_compare_chars)
            .collect()
    }
}
