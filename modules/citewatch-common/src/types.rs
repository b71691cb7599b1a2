use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::doi::Doi;

// --- Enums ---

/// The kind of problem a detector reports. Also the dispatch key for detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    BrokenLink,
    Retraction,
    SourceChange,
    EvidenceWeak,
}

impl ProblemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrokenLink => "broken_link",
            Self::Retraction => "retraction",
            Self::SourceChange => "source_change",
            Self::EvidenceWeak => "evidence_weak",
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProblemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "broken_link" => Ok(Self::BrokenLink),
            "retraction" => Ok(Self::Retraction),
            "source_change" => Ok(Self::SourceChange),
            "evidence_weak" => Ok(Self::EvidenceWeak),
            other => Err(format!("unknown problem type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Where a finding sits in the (external) editor-reporting workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportingStatus {
    Pending,
    Reported,
    Resolved,
    FalsePositive,
}

impl fmt::Display for ReportingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Reported => write!(f, "reported"),
            Self::Resolved => write!(f, "resolved"),
            Self::FalsePositive => write!(f, "false_positive"),
        }
    }
}

/// Provenance of a retraction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetractionSource {
    Cache,
    BibliographicIndex,
    PublisherMetadata,
}

impl RetractionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::BibliographicIndex => "bibliographic_index",
            Self::PublisherMetadata => "publisher_metadata",
        }
    }
}

impl fmt::Display for RetractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetractionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cache" => Ok(Self::Cache),
            "bibliographic_index" => Ok(Self::BibliographicIndex),
            "publisher_metadata" => Ok(Self::PublisherMetadata),
            other => Err(format!("unknown retraction source: {other}")),
        }
    }
}

/// Which citations a detector applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationFilter {
    HasUrl,
    HasDoi,
    HasSnapshot,
}

impl CitationFilter {
    pub fn matches(&self, citation: &Citation) -> bool {
        match self {
            Self::HasUrl => citation.source_url.is_some(),
            Self::HasDoi => citation.source_doi.is_some(),
            Self::HasSnapshot => citation.source_url.is_some() && citation.snapshot_url.is_some(),
        }
    }
}

// --- Citations ---

/// Bibliographic metadata carried by a citation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SourceMetadata {
    #[sqlx(rename = "source_title")]
    pub title: Option<String>,
    #[sqlx(rename = "source_authors")]
    pub authors: Option<String>,
    #[sqlx(rename = "source_journal")]
    pub journal: Option<String>,
    #[sqlx(rename = "source_year")]
    pub year: Option<i32>,
}

/// One cited source inside an encyclopedia article.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Citation {
    pub id: Uuid,
    pub article_title: String,
    pub article_language: String,
    /// 1-based position of the reference within the article.
    pub ordinal: i32,
    pub source_url: Option<String>,
    pub source_doi: Option<String>,
    #[sqlx(flatten)]
    pub source: SourceMetadata,
    pub snapshot_url: Option<String>,
    pub snapshot_date: Option<DateTime<Utc>>,
    pub last_checked: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Citation {
    /// The citation's DOI after normalization. Raw DOIs that don't normalize are absent.
    pub fn doi(&self) -> Option<Doi> {
        self.source_doi.as_deref().and_then(Doi::parse)
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.snapshot_url.as_ref().map(|url| Snapshot {
            citation_id: self.id,
            archive_url: url.clone(),
            captured_at: self.snapshot_date,
        })
    }
}

/// An archived reference copy of a citation's source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub citation_id: Uuid,
    pub archive_url: String,
    pub captured_at: Option<DateTime<Utc>>,
}

// --- Findings ---

/// A vetted problem with a citation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: Uuid,
    pub citation_id: Uuid,
    pub article_title: String,
    pub problem_type: ProblemType,
    pub severity: Severity,
    pub details: String,
    pub reporting_status: ReportingStatus,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a finding. Status and timestamps are assigned by the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFinding {
    pub citation_id: Uuid,
    pub article_title: String,
    pub problem_type: ProblemType,
    pub severity: Severity,
    pub details: String,
}

// --- Retractions ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetractionRecord {
    pub doi: Doi,
    pub paper_title: Option<String>,
    pub retraction_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub source: RetractionSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(url: Option<&str>, doi: Option<&str>, snapshot: Option<&str>) -> Citation {
        Citation {
            id: Uuid::new_v4(),
            article_title: "Photosynthesis".to_string(),
            article_language: "en".to_string(),
            ordinal: 3,
            source_url: url.map(str::to_string),
            source_doi: doi.map(str::to_string),
            source: SourceMetadata::default(),
            snapshot_url: snapshot.map(str::to_string),
            snapshot_date: None,
            last_checked: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn problem_type_round_trips_through_text() {
        for pt in [
            ProblemType::BrokenLink,
            ProblemType::Retraction,
            ProblemType::SourceChange,
            ProblemType::EvidenceWeak,
        ] {
            assert_eq!(pt.to_string().parse::<ProblemType>().unwrap(), pt);
        }
        assert!("stale".parse::<ProblemType>().is_err());
    }

    #[test]
    fn severity_orders_by_urgency() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn unparseable_doi_is_treated_as_absent() {
        let c = citation(None, Some("ISBN 978-3-16-148410-0"), None);
        assert!(c.doi().is_none());
        let c = citation(None, Some("doi:10.1234/XYZ"), None);
        assert_eq!(c.doi().unwrap().as_str(), "10.1234/xyz");
    }

    #[test]
    fn filters_match_detector_applicability() {
        let url_only = citation(Some("https://example.com/a"), None, None);
        let doi_only = citation(None, Some("10.1234/abc"), None);
        let snapshotted = citation(
            Some("https://example.com/a"),
            None,
            Some("https://web.archive.org/web/2020/https://example.com/a"),
        );

        assert!(CitationFilter::HasUrl.matches(&url_only));
        assert!(!CitationFilter::HasUrl.matches(&doi_only));
        assert!(CitationFilter::HasDoi.matches(&doi_only));
        assert!(!CitationFilter::HasSnapshot.matches(&url_only));
        assert!(CitationFilter::HasSnapshot.matches(&snapshotted));
    }

    #[test]
    fn snapshot_is_derived_from_citation_fields() {
        let c = citation(Some("https://example.com/a"), None, Some("https://archive/x"));
        let snap = c.snapshot().unwrap();
        assert_eq!(snap.citation_id, c.id);
        assert_eq!(snap.archive_url, "https://archive/x");
    }
}
