// The closed set of detectors, keyed by the problem type each one reports.

use citewatch_archive::UrlHealthChecker;
use citewatch_common::{Citation, CitationFilter, ProblemType, RunOptions};
use citewatch_retraction::RetractionResolver;

use crate::checks::{broken_link, retraction, source_change::DriftDetector};
use crate::error::DetectorError;
use crate::types::Signal;

pub enum Detector {
    BrokenLink(UrlHealthChecker),
    Retraction(RetractionResolver),
    SourceChange(DriftDetector),
}

impl Detector {
    pub fn problem_type(&self) -> ProblemType {
        match self {
            Self::BrokenLink(_) => ProblemType::BrokenLink,
            Self::Retraction(_) => ProblemType::Retraction,
            Self::SourceChange(_) => ProblemType::SourceChange,
        }
    }

    /// Which citations this detector applies to. Drift normally needs an existing
    /// snapshot; with snapshot bootstrapping it takes any citation with a URL.
    pub fn filter(&self, options: RunOptions) -> CitationFilter {
        match self {
            Self::BrokenLink(_) => CitationFilter::HasUrl,
            Self::Retraction(_) => CitationFilter::HasDoi,
            Self::SourceChange(_) if options.bootstrap_snapshots => CitationFilter::HasUrl,
            Self::SourceChange(_) => CitationFilter::HasSnapshot,
        }
    }

    pub async fn inspect(&self, citation: &Citation, options: RunOptions) -> Result<Option<Signal>, DetectorError> {
        match self {
            Self::BrokenLink(health) => Ok(broken_link::check(health, citation).await),
            Self::Retraction(resolver) => retraction::check(resolver, citation, options.remote_lookups).await,
            Self::SourceChange(drift) => drift.check(citation).await,
        }
    }
}
